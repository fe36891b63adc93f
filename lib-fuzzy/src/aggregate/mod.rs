//! Master-key aggregation with quality-gated fallback
//!
//! Per-finger keys XOR-fold into one 32-byte master. XOR keeps per-bit
//! entropy, is order-free once contributions are canonically sorted, and
//! makes rotation and revocation O(1) local operations on the aggregate.
//! Fewer fingers than preferred are admitted only through an explicit
//! fallback tier whose quality floor every contribution must clear.

use serde::{Deserialize, Serialize};
use tracing::debug;

use lib_biometric::FingerId;

use crate::error::AggregateError;
use crate::secret::{FingerKey, MasterKey};

/// One admissible accepted-of-enrolled combination and its quality floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackTier {
    /// Fingers that must have reproduced successfully
    pub accepted: usize,
    /// Fingers the identity was enrolled with
    pub enrolled: usize,
    /// Minimum capture quality required of every accepted finger
    pub min_quality: u8,
}

/// Aggregation policy carried in the enrollment metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Hard floor on contributing fingers
    pub min_fingers: usize,
    /// Fingers a full-strength aggregation uses
    pub preferred_fingers: usize,
    /// Admissible degraded combinations, consulted when fewer than
    /// `preferred_fingers` contribute
    pub quality_fallback: Vec<FallbackTier>,
    /// Disable fallback entirely
    pub strict: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy {
            min_fingers: 2,
            preferred_fingers: 4,
            quality_fallback: vec![
                FallbackTier {
                    accepted: 4,
                    enrolled: 4,
                    min_quality: 0,
                },
                FallbackTier {
                    accepted: 3,
                    enrolled: 4,
                    min_quality: 70,
                },
                FallbackTier {
                    accepted: 2,
                    enrolled: 4,
                    min_quality: 85,
                },
            ],
            strict: false,
        }
    }
}

/// One finger's reproduced key and its capture quality
#[derive(Debug)]
pub struct Contribution {
    pub finger: FingerId,
    pub key: FingerKey,
    pub quality: u8,
}

/// Fold per-finger keys into the master key under the policy
///
/// Contributions are sorted into canonical finger order first, so any
/// permutation of the same set produces the same master.
pub fn aggregate(
    contributions: &[Contribution],
    policy: &AggregationPolicy,
) -> Result<MasterKey, AggregateError> {
    let mut sorted: Vec<&Contribution> = contributions.iter().collect();
    sorted.sort_by_key(|c| c.finger.canonical_index());
    for pair in sorted.windows(2) {
        if pair[0].finger == pair[1].finger {
            return Err(AggregateError::DuplicateFinger(
                pair[0].finger.tag().to_string(),
            ));
        }
    }

    let got = sorted.len();
    if got < policy.min_fingers {
        return Err(AggregateError::InsufficientFingers {
            got,
            need: policy.min_fingers,
        });
    }
    if got < policy.preferred_fingers {
        if policy.strict {
            return Err(AggregateError::InsufficientFingers {
                got,
                need: policy.preferred_fingers,
            });
        }
        let tier = policy
            .quality_fallback
            .iter()
            .find(|t| t.accepted == got && t.enrolled == policy.preferred_fingers)
            .ok_or(AggregateError::InsufficientFingers {
                got,
                need: policy.preferred_fingers,
            })?;
        if let Some(weak) = sorted.iter().find(|c| c.quality < tier.min_quality) {
            return Err(AggregateError::QualityBelowFallbackThreshold {
                quality: weak.quality,
                threshold: tier.min_quality,
                accepted: tier.accepted,
                enrolled: tier.enrolled,
            });
        }
        debug!(accepted = got, enrolled = tier.enrolled, "degraded aggregation admitted");
    }

    let mut master = MasterKey::zero();
    for c in &sorted {
        master.xor_in(&c.key);
    }
    Ok(master)
}

/// Replace one finger's key in an existing master
///
/// Only meaningful when the caller holds both the outgoing and incoming
/// keys, which is what authenticates the owner.
pub fn rotate(master: &MasterKey, old: &FingerKey, new: &FingerKey) -> MasterKey {
    let mut out = master.clone();
    out.xor_in(old);
    out.xor_in(new);
    out
}

/// Remove one finger's key from an existing master
///
/// `remaining_fingers` is the size of the post-revocation set, which must
/// still satisfy the policy floor.
pub fn revoke(
    master: &MasterKey,
    removed: &FingerKey,
    remaining_fingers: usize,
    policy: &AggregationPolicy,
) -> Result<MasterKey, AggregateError> {
    if remaining_fingers < policy.min_fingers {
        return Err(AggregateError::InsufficientFingers {
            got: remaining_fingers,
            need: policy.min_fingers,
        });
    }
    let mut out = master.clone();
    out.xor_in(removed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(fill: u8) -> FingerKey {
        FingerKey::from_bytes([fill; 32])
    }

    fn contribution(finger: FingerId, fill: u8, quality: u8) -> Contribution {
        Contribution {
            finger,
            key: key(fill),
            quality,
        }
    }

    fn four_fingers(qualities: [u8; 4]) -> Vec<Contribution> {
        vec![
            contribution(FingerId::LeftThumb, 0x11, qualities[0]),
            contribution(FingerId::LeftIndex, 0x22, qualities[1]),
            contribution(FingerId::RightThumb, 0x44, qualities[2]),
            contribution(FingerId::RightIndex, 0x88, qualities[3]),
        ]
    }

    #[test]
    fn full_set_aggregates_regardless_of_quality() {
        let master = aggregate(&four_fingers([10, 20, 30, 40]), &AggregationPolicy::default())
            .expect("4-of-4 admits any quality");
        assert_eq!(master.as_bytes(), &[0x11 ^ 0x22 ^ 0x44 ^ 0x88; 32]);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let policy = AggregationPolicy::default();
        let forward = aggregate(&four_fingers([90, 90, 90, 90]), &policy).expect("forward");
        let mut reversed = four_fingers([90, 90, 90, 90]);
        reversed.reverse();
        let backward = aggregate(&reversed, &policy).expect("backward");
        assert_eq!(forward, backward);
    }

    #[test]
    fn three_of_four_needs_quality_seventy() {
        let policy = AggregationPolicy::default();
        let ok = vec![
            contribution(FingerId::LeftThumb, 0x11, 70),
            contribution(FingerId::LeftIndex, 0x22, 70),
            contribution(FingerId::RightThumb, 0x44, 70),
        ];
        aggregate(&ok, &policy).expect("exactly at threshold");

        let short = vec![
            contribution(FingerId::LeftThumb, 0x11, 70),
            contribution(FingerId::LeftIndex, 0x22, 69),
            contribution(FingerId::RightThumb, 0x44, 90),
        ];
        assert_eq!(
            aggregate(&short, &policy),
            Err(AggregateError::QualityBelowFallbackThreshold {
                quality: 69,
                threshold: 70,
                accepted: 3,
                enrolled: 4,
            })
        );
    }

    #[test]
    fn two_of_four_needs_quality_eighty_five() {
        let policy = AggregationPolicy::default();
        let ok = vec![
            contribution(FingerId::LeftThumb, 0x11, 85),
            contribution(FingerId::RightThumb, 0x44, 85),
        ];
        aggregate(&ok, &policy).expect("exactly at threshold");

        let short = vec![
            contribution(FingerId::LeftThumb, 0x11, 85),
            contribution(FingerId::RightThumb, 0x44, 84),
        ];
        assert!(matches!(
            aggregate(&short, &policy),
            Err(AggregateError::QualityBelowFallbackThreshold { quality: 84, .. })
        ));
    }

    #[test]
    fn below_the_floor_is_always_rejected() {
        let policy = AggregationPolicy::default();
        let one = vec![contribution(FingerId::LeftThumb, 0x11, 100)];
        assert_eq!(
            aggregate(&one, &policy),
            Err(AggregateError::InsufficientFingers { got: 1, need: 2 })
        );
    }

    #[test]
    fn strict_mode_disables_fallback() {
        let policy = AggregationPolicy {
            strict: true,
            ..AggregationPolicy::default()
        };
        let three = vec![
            contribution(FingerId::LeftThumb, 0x11, 99),
            contribution(FingerId::LeftIndex, 0x22, 99),
            contribution(FingerId::RightThumb, 0x44, 99),
        ];
        assert_eq!(
            aggregate(&three, &policy),
            Err(AggregateError::InsufficientFingers { got: 3, need: 4 })
        );
    }

    #[test]
    fn duplicate_fingers_are_rejected() {
        let policy = AggregationPolicy::default();
        let dup = vec![
            contribution(FingerId::LeftThumb, 0x11, 90),
            contribution(FingerId::LeftThumb, 0x22, 90),
            contribution(FingerId::RightThumb, 0x44, 90),
        ];
        assert!(matches!(
            aggregate(&dup, &policy),
            Err(AggregateError::DuplicateFinger(_))
        ));
    }

    #[test]
    fn degraded_master_differs_from_full_master() {
        let policy = AggregationPolicy::default();
        let full = aggregate(&four_fingers([90, 90, 90, 90]), &policy).expect("full");
        let three = aggregate(&four_fingers([90, 90, 90, 90])[..3], &policy).expect("three");
        assert_ne!(full, three);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_permutation_yields_the_same_master(
                fills in proptest::collection::vec(any::<u8>(), 4),
                order in Just(vec![0usize, 1, 2, 3]).prop_shuffle(),
            ) {
                let fingers = [
                    FingerId::LeftThumb,
                    FingerId::LeftIndex,
                    FingerId::RightThumb,
                    FingerId::RightIndex,
                ];
                let policy = AggregationPolicy::default();
                let base: Vec<Contribution> = (0..4)
                    .map(|i| contribution(fingers[i], fills[i], 90))
                    .collect();
                let permuted: Vec<Contribution> = order
                    .iter()
                    .map(|&i| contribution(fingers[i], fills[i], 90))
                    .collect();
                let a = aggregate(&base, &policy).expect("base");
                let b = aggregate(&permuted, &policy).expect("permuted");
                prop_assert_eq!(a.as_bytes(), b.as_bytes());
            }

            #[test]
            fn rotate_then_rotate_back_restores_the_master(
                m in any::<[u8; 32]>(),
                a in any::<[u8; 32]>(),
                b in any::<[u8; 32]>(),
            ) {
                let master = MasterKey::from_bytes(m);
                let old = FingerKey::from_bytes(a);
                let new = FingerKey::from_bytes(b);
                let there = rotate(&master, &old, &new);
                let back = rotate(&there, &new, &old);
                prop_assert_eq!(back.as_bytes(), master.as_bytes());
            }
        }
    }

    #[test]
    fn rotation_is_an_involution() {
        let m = MasterKey::from_bytes([0xF0; 32]);
        let a = key(0x0F);
        let b = key(0x3C);
        let rotated = rotate(&m, &a, &b);
        assert_ne!(rotated, m);
        assert_eq!(rotate(&rotated, &b, &a), m);
    }

    #[test]
    fn revocation_respects_the_floor() {
        let policy = AggregationPolicy::default();
        let m = MasterKey::from_bytes([0xAA; 32]);
        let gone = key(0x55);
        let out = revoke(&m, &gone, 3, &policy).expect("three remain");
        assert_eq!(out.as_bytes(), &[0xAA ^ 0x55; 32]);
        assert_eq!(
            revoke(&m, &gone, 1, &policy),
            Err(AggregateError::InsufficientFingers { got: 1, need: 2 })
        );
    }
}
