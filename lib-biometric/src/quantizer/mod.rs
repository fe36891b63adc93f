//! Minutiae canonicalization pipeline
//!
//! Quality filter -> pose normalization -> grid/bin discretization ->
//! collision dedup -> hash projection onto a 512-bit template. The
//! projection hashes each canonical cell to a bit index, so no minutia
//! position is recoverable from the template, at the cost of the mapping
//! not being locality-preserving. The projection is frozen: any change to
//! it must ship as a new helper-data version, never in place.

pub mod normalize;
pub mod params;

use std::collections::BTreeMap;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use tracing::debug;

use crate::error::BiometricError;
use crate::types::finger::FingerId;
use crate::types::minutia::Minutia;
use crate::types::template::{FingerTemplate, N_BITS, N_BYTES};

pub use params::QuantizationParams;

use normalize::{
    disambiguate_direction, principal_axis_angle, rotate_by, translate_to_centroid,
    NormalizedMinutia,
};

type Blake2b256 = Blake2b<U32>;

/// Domain tag for the cell-to-bit projection hash
const PROJECTION_TAG: &[u8] = b"biodid.quantize.v1";

/// A minutia discretized onto the spatial grid and orientation bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalCell {
    xq: i64,
    yq: i64,
    tq: u8,
    kind: u8,
}

/// Canonicalize one finger's minutiae into a fixed-length bit template
///
/// Fails with `InsufficientMinutiae` when fewer than `params.min_minutiae`
/// points survive the quality filter.
pub fn quantize(
    minutiae: &[Minutia],
    finger: FingerId,
    params: &QuantizationParams,
) -> Result<FingerTemplate, BiometricError> {
    // 1. Quality filter
    let mut kept: Vec<NormalizedMinutia> = minutiae
        .iter()
        .filter(|m| m.quality >= params.quality_threshold)
        .map(NormalizedMinutia::from_capture)
        .collect();

    if kept.len() < params.min_minutiae as usize {
        return Err(BiometricError::InsufficientMinutiae {
            got: kept.len(),
            need: params.min_minutiae as usize,
        });
    }

    // 2. + 3. Pose normalization
    if params.translation_normalize {
        translate_to_centroid(&mut kept);
    }
    if params.rotation_normalize {
        let phi = principal_axis_angle(&kept);
        rotate_by(&mut kept, phi);
        disambiguate_direction(&mut kept);
    }

    // 4. + 5. Discretize, then dedup colliding cells keeping the
    // highest-quality witness
    let mut cells: BTreeMap<CanonicalCell, u8> = BTreeMap::new();
    for p in &kept {
        let cell = discretize(p, params);
        let entry = cells.entry(cell).or_insert(p.quality);
        if p.quality > *entry {
            *entry = p.quality;
        }
    }

    // 6. Project each canonical cell onto one template bit
    let mut bits = [0u8; N_BYTES];
    for cell in cells.keys() {
        let index = project_to_bit(&cell_digest_input(finger, cell));
        bits[index / 8] |= 1 << (index % 8);
    }

    let quality = mean_quality(cells.values());
    debug!(
        finger = %finger,
        kept = kept.len(),
        cells = cells.len(),
        quality,
        "quantized capture"
    );

    Ok(FingerTemplate::new(bits, finger, quality))
}

fn discretize(p: &NormalizedMinutia, params: &QuantizationParams) -> CanonicalCell {
    let grid = params.grid_um as f64;
    let bins = params.angle_bins as i64;
    let xq = (p.x / grid).floor() as i64;
    let yq = (p.y / grid).floor() as i64;
    let tq = ((p.theta_deg * bins as f64 / 360.0).floor() as i64).rem_euclid(bins) as u8;
    CanonicalCell {
        xq,
        yq,
        tq,
        kind: p.kind.as_byte(),
    }
}

fn cell_digest_input(finger: FingerId, cell: &CanonicalCell) -> Vec<u8> {
    let mut input = Vec::with_capacity(PROJECTION_TAG.len() + 32);
    input.extend_from_slice(PROJECTION_TAG);
    input.extend_from_slice(finger.tag().as_bytes());
    input.extend_from_slice(&cell.xq.to_be_bytes());
    input.extend_from_slice(&cell.yq.to_be_bytes());
    input.push(cell.tq);
    input.push(cell.kind);
    input
}

fn project_to_bit(input: &[u8]) -> usize {
    let digest = Blake2b256::digest(input);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % N_BITS as u64) as usize
}

fn mean_quality<'a>(qualities: impl Iterator<Item = &'a u8>) -> u8 {
    let mut sum: u32 = 0;
    let mut count: u32 = 0;
    for q in qualities {
        sum += *q as u32;
        count += 1;
    }
    if count == 0 {
        0
    } else {
        (sum / count) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::minutia::MinutiaKind;

    fn test_params() -> QuantizationParams {
        QuantizationParams {
            min_minutiae: 4,
            ..QuantizationParams::default()
        }
    }

    fn minutia(x: u32, y: u32, theta: u16, quality: u8) -> Minutia {
        Minutia {
            x_um: x,
            y_um: y,
            theta_deg: theta,
            kind: MinutiaKind::RidgeEnding,
            quality,
        }
    }

    /// An elongated cloud whose principal axis is exactly the x-axis
    /// (off-diagonal covariance cancels pairwise) and whose points sit
    /// mid-cell and mid-bin, so pose normalization cannot push any point
    /// across a discretization boundary.
    fn canonical_cloud() -> Vec<Minutia> {
        vec![
            minutia(4575, 5025, 5, 90),
            minutia(5425, 5025, 50, 85),
            minutia(4775, 4975, 96, 95),
            minutia(5225, 4975, 141, 80),
        ]
    }

    #[test]
    fn quantize_is_deterministic() {
        let cloud = canonical_cloud();
        let a = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        let b = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.quality(), b.quality());
    }

    #[test]
    fn different_fingers_project_differently() {
        let cloud = canonical_cloud();
        let a = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        let b = quantize(&cloud, FingerId::RightIndex, &test_params()).expect("quantize");
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn translation_of_whole_cloud_is_absorbed() {
        let cloud = canonical_cloud();
        let shifted: Vec<Minutia> = cloud
            .iter()
            .map(|m| Minutia {
                x_um: m.x_um + 730,
                y_um: m.y_um + 1210,
                ..*m
            })
            .collect();
        let a = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        let b = quantize(&shifted, FingerId::LeftIndex, &test_params()).expect("quantize");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn rotation_of_whole_cloud_is_absorbed() {
        let cloud = canonical_cloud();

        // Rotate every point (and orientation) by 30 degrees about the
        // centroid, then re-offset into sensor coordinates.
        let n = cloud.len() as f64;
        let cx = cloud.iter().map(|m| m.x_um as f64).sum::<f64>() / n;
        let cy = cloud.iter().map(|m| m.y_um as f64).sum::<f64>() / n;
        let phi = 30.0f64.to_radians();
        let (sin_p, cos_p) = phi.sin_cos();
        let rotated: Vec<Minutia> = cloud
            .iter()
            .map(|m| {
                let (dx, dy) = (m.x_um as f64 - cx, m.y_um as f64 - cy);
                let rx = dx * cos_p - dy * sin_p + cx;
                let ry = dx * sin_p + dy * cos_p + cy;
                Minutia {
                    x_um: rx.round() as u32,
                    y_um: ry.round() as u32,
                    theta_deg: ((m.theta_deg as f64 + 30.0).rem_euclid(360.0)) as u16,
                    ..*m
                }
            })
            .collect();

        let a = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        let b = quantize(&rotated, FingerId::LeftIndex, &test_params()).expect("quantize");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn low_quality_minutiae_are_dropped() {
        let mut cloud = canonical_cloud();
        // A junk point that would otherwise add a cell
        cloud.push(minutia(9025, 9025, 300, 10));
        let with_junk = quantize(&cloud, FingerId::LeftIndex, &test_params()).expect("quantize");
        let without = quantize(&canonical_cloud(), FingerId::LeftIndex, &test_params())
            .expect("quantize");
        assert_eq!(with_junk.as_bytes(), without.as_bytes());
    }

    #[test]
    fn insufficient_minutiae_is_reported() {
        let cloud = vec![minutia(5125, 5025, 45, 90), minutia(4875, 4975, 100, 85)];
        let err = quantize(&cloud, FingerId::LeftIndex, &test_params()).unwrap_err();
        assert_eq!(
            err,
            BiometricError::InsufficientMinutiae { got: 2, need: 4 }
        );
    }

    #[test]
    fn colliding_cells_keep_highest_quality() {
        // Two minutiae in the same cell and bin; only one cell results, and
        // the reported quality reflects the better witness.
        let mut params = test_params();
        params.rotation_normalize = false;
        params.translation_normalize = false;
        let cloud = vec![
            minutia(5010, 5010, 45, 71),
            minutia(5020, 5020, 46, 99),
            minutia(5125, 5025, 45, 90),
            minutia(4875, 4975, 100, 85),
        ];
        let t = quantize(&cloud, FingerId::LeftIndex, &params).expect("quantize");
        // Three distinct cells: (71|99 merged), 90, 85 -> mean of {99,90,85}
        assert_eq!(t.quality(), ((99 + 90 + 85) / 3) as u8);
    }

    #[test]
    fn template_always_has_full_length() {
        let t = quantize(&canonical_cloud(), FingerId::LeftIndex, &test_params())
            .expect("quantize");
        assert_eq!(t.as_bytes().len(), N_BYTES);
        let set_bits: u32 = t.as_bytes().iter().map(|b| b.count_ones()).sum();
        assert!(set_bits > 0);
        assert!(set_bits as usize <= canonical_cloud().len());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_minutia() -> impl Strategy<Value = Minutia> {
            (
                0u32..20_000,
                0u32..20_000,
                0u16..360,
                any::<bool>(),
                0u8..=100,
            )
                .prop_map(|(x_um, y_um, theta_deg, ending, quality)| Minutia {
                    x_um,
                    y_um,
                    theta_deg,
                    kind: if ending {
                        MinutiaKind::RidgeEnding
                    } else {
                        MinutiaKind::Bifurcation
                    },
                    quality,
                })
        }

        proptest! {
            #[test]
            fn every_accepted_capture_quantizes_to_full_length(
                minutiae in proptest::collection::vec(arb_minutia(), 0..80),
            ) {
                match quantize(&minutiae, FingerId::LeftThumb, &QuantizationParams::default()) {
                    Ok(t) => prop_assert_eq!(t.as_bytes().len(), N_BYTES),
                    Err(BiometricError::InsufficientMinutiae { got, need }) => {
                        prop_assert!(got < need);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
            }
        }
    }
}
