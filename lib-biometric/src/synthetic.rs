//! Seeded synthetic captures for test harnesses
//!
//! Deterministic minutiae generation so enrollment and verification flows
//! can be exercised without sensor hardware. Positions snap to grid-cell
//! centers and orientations to bin centers, keeping a re-capture of the
//! same synthetic finger quantization-stable.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::finger::FingerId;
use crate::types::minutia::{Minutia, MinutiaKind};
use crate::types::template::{FingerTemplate, N_BITS};

/// Sensor area the generator scatters minutiae over, in grid cells
const CELL_RANGE: std::ops::Range<u32> = 40..360;
/// Default spatial cell edge the generator aligns to
const CELL_UM: u32 = 50;
/// Default orientation bin width over 32 bins
const BIN_DEG: f64 = 360.0 / 32.0;

/// Generate `count` minutiae for one synthetic finger
///
/// Cells are sampled without replacement so no two minutiae collide, and
/// every point receives a quality in 70-100, surviving the default filter.
pub fn sample_minutiae<R: Rng>(rng: &mut R, count: usize) -> Vec<Minutia> {
    let mut cells: Vec<(u32, u32)> = Vec::with_capacity(count);
    while cells.len() < count {
        let cell = (
            rng.gen_range(CELL_RANGE.clone()),
            rng.gen_range(CELL_RANGE.clone()),
        );
        if !cells.contains(&cell) {
            cells.push(cell);
        }
    }

    cells
        .into_iter()
        .map(|(cx, cy)| {
            let bin = rng.gen_range(0u16..32);
            Minutia {
                x_um: cx * CELL_UM + CELL_UM / 2,
                y_um: cy * CELL_UM + CELL_UM / 2,
                theta_deg: (bin as f64 * BIN_DEG + BIN_DEG / 2.0) as u16,
                kind: if rng.gen_bool(0.5) {
                    MinutiaKind::RidgeEnding
                } else {
                    MinutiaKind::Bifurcation
                },
                quality: rng.gen_range(70..=100),
            }
        })
        .collect()
}

/// Generate a full hand's worth of captures in canonical finger order
pub fn sample_hand<R: Rng>(
    rng: &mut R,
    fingers: &[FingerId],
    minutiae_per_finger: usize,
) -> Vec<(FingerId, Vec<Minutia>)> {
    fingers
        .iter()
        .map(|&finger| (finger, sample_minutiae(rng, minutiae_per_finger)))
        .collect()
}

/// Flip `count` distinct bits of `template` among the first `within_bits`
///
/// Models read noise at the template level, which is where the
/// error-correcting layer absorbs it.
pub fn flip_template_bits<R: Rng>(
    template: &mut FingerTemplate,
    rng: &mut R,
    count: usize,
    within_bits: usize,
) {
    debug_assert!(within_bits <= N_BITS);
    debug_assert!(count <= within_bits);
    let mut indices: Vec<usize> = (0..within_bits).collect();
    indices.shuffle(rng);
    for &bit in indices.iter().take(count) {
        template.flip_bit(bit);
    }
}
