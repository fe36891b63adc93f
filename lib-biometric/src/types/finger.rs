//! Finger identifiers with a fixed canonical ordering
//!
//! Key aggregation sorts contributions by this ordering, so any caller
//! presenting the same set of fingers in any order derives the same master.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BiometricError;

/// One of the ten enrollable fingers
///
/// The declaration order is the canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerId {
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
}

impl FingerId {
    /// All fingers in canonical order
    pub const ALL: [FingerId; 10] = [
        FingerId::LeftThumb,
        FingerId::LeftIndex,
        FingerId::LeftMiddle,
        FingerId::LeftRing,
        FingerId::LeftLittle,
        FingerId::RightThumb,
        FingerId::RightIndex,
        FingerId::RightMiddle,
        FingerId::RightRing,
        FingerId::RightLittle,
    ];

    /// Stable string tag, also used for domain separation in key derivation
    pub fn tag(&self) -> &'static str {
        match self {
            FingerId::LeftThumb => "left_thumb",
            FingerId::LeftIndex => "left_index",
            FingerId::LeftMiddle => "left_middle",
            FingerId::LeftRing => "left_ring",
            FingerId::LeftLittle => "left_little",
            FingerId::RightThumb => "right_thumb",
            FingerId::RightIndex => "right_index",
            FingerId::RightMiddle => "right_middle",
            FingerId::RightRing => "right_ring",
            FingerId::RightLittle => "right_little",
        }
    }

    /// Position in the canonical ordering
    pub fn canonical_index(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FingerId {
    type Err = BiometricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FingerId::ALL
            .iter()
            .copied()
            .find(|id| id.tag() == s)
            .ok_or_else(|| BiometricError::InvalidFingerId(s.to_string()))
    }
}
