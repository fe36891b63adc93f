//! Minutia - a single captured fingerprint feature point

use serde::{Deserialize, Serialize};

/// Feature class of a minutia point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinutiaKind {
    /// A ridge terminates
    RidgeEnding,
    /// A ridge splits in two
    Bifurcation,
}

impl MinutiaKind {
    /// Stable one-byte encoding used in canonicalization hashes
    pub fn as_byte(&self) -> u8 {
        match self {
            MinutiaKind::RidgeEnding => 0,
            MinutiaKind::Bifurcation => 1,
        }
    }
}

/// A located, oriented fingerprint feature as delivered by the capture layer
///
/// Coordinates are in micrometers from the sensor origin; the orientation is
/// in whole degrees. A captured finger is an ordered list of 10-150 of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minutia {
    /// Horizontal position in micrometers
    pub x_um: u32,
    /// Vertical position in micrometers
    pub y_um: u32,
    /// Ridge orientation in degrees, [0, 360)
    pub theta_deg: u16,
    /// Feature class
    pub kind: MinutiaKind,
    /// Capture confidence, 0-100
    pub quality: u8,
}

impl Minutia {
    /// True when the fields are inside their documented ranges
    pub fn in_range(&self) -> bool {
        self.theta_deg < 360 && self.quality <= 100
    }
}
