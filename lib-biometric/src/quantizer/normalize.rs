//! Pose normalization - removing global translation and rotation
//!
//! Two captures of one finger differ by where the finger landed on the
//! sensor and how it was turned. Both are global transforms the
//! error-correcting layer cannot absorb, so they are removed here before
//! discretization.

use crate::types::minutia::Minutia;

/// A minutia in continuous normalized coordinates
#[derive(Debug, Clone, Copy)]
pub(crate) struct NormalizedMinutia {
    pub x: f64,
    pub y: f64,
    pub theta_deg: f64,
    pub kind: crate::types::minutia::MinutiaKind,
    pub quality: u8,
}

impl NormalizedMinutia {
    pub(crate) fn from_capture(m: &Minutia) -> Self {
        NormalizedMinutia {
            x: m.x_um as f64,
            y: m.y_um as f64,
            theta_deg: m.theta_deg as f64,
            kind: m.kind,
            quality: m.quality,
        }
    }
}

/// Translate so the centroid of the set sits at the origin
pub(crate) fn translate_to_centroid(points: &mut [NormalizedMinutia]) {
    if points.is_empty() {
        return;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    for p in points.iter_mut() {
        p.x -= cx;
        p.y -= cy;
    }
}

/// Angle of the first principal component of the (centered) positions
///
/// Half-angle form of the 2x2 covariance eigenvector; returns radians in
/// (-pi/2, pi/2]. Degenerate clouds (a single cell, collinear duplicates)
/// fall back to zero, which keeps the map total.
pub(crate) fn principal_axis_angle(points: &[NormalizedMinutia]) -> f64 {
    let n = points.len() as f64;
    if points.is_empty() {
        return 0.0;
    }
    let sxx = points.iter().map(|p| p.x * p.x).sum::<f64>() / n;
    let syy = points.iter().map(|p| p.y * p.y).sum::<f64>() / n;
    let sxy = points.iter().map(|p| p.x * p.y).sum::<f64>() / n;
    if sxx == 0.0 && syy == 0.0 && sxy == 0.0 {
        return 0.0;
    }
    0.5 * (2.0 * sxy).atan2(sxx - syy)
}

/// Rotate all positions and orientations by `-phi` radians
///
/// Positions rotate about the origin; ridge orientations rotate with them
/// so the discretized angle bin stays attached to the ridge, not the sensor.
pub(crate) fn rotate_by(points: &mut [NormalizedMinutia], phi: f64) {
    let (sin_p, cos_p) = phi.sin_cos();
    let phi_deg = phi.to_degrees();
    for p in points.iter_mut() {
        let (x, y) = (p.x, p.y);
        p.x = x * cos_p + y * sin_p;
        p.y = -x * sin_p + y * cos_p;
        p.theta_deg = (p.theta_deg - phi_deg).rem_euclid(360.0);
    }
}

/// Resolve the 180-degree ambiguity of the principal axis
///
/// The PCA axis has no preferred direction. The convention: after rotation
/// the first minutia's orientation must fall in [0, 180). If it does not,
/// the whole frame is turned another half revolution.
pub(crate) fn disambiguate_direction(points: &mut [NormalizedMinutia]) {
    let needs_flip = points
        .first()
        .map(|p| p.theta_deg >= 180.0)
        .unwrap_or(false);
    if needs_flip {
        rotate_by(points, std::f64::consts::PI);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::minutia::MinutiaKind;

    fn pt(x: f64, y: f64, theta: f64) -> NormalizedMinutia {
        NormalizedMinutia {
            x,
            y,
            theta_deg: theta,
            kind: MinutiaKind::RidgeEnding,
            quality: 80,
        }
    }

    #[test]
    fn centroid_translation_zeroes_mean() {
        let mut pts = vec![pt(100.0, 200.0, 0.0), pt(300.0, 400.0, 0.0)];
        translate_to_centroid(&mut pts);
        let cx: f64 = pts.iter().map(|p| p.x).sum();
        let cy: f64 = pts.iter().map(|p| p.y).sum();
        assert!(cx.abs() < 1e-9);
        assert!(cy.abs() < 1e-9);
    }

    #[test]
    fn principal_axis_of_horizontal_cloud_is_zero() {
        let mut pts = vec![
            pt(-100.0, 1.0, 0.0),
            pt(0.0, -1.0, 0.0),
            pt(100.0, 0.5, 0.0),
        ];
        translate_to_centroid(&mut pts);
        let phi = principal_axis_angle(&pts);
        assert!(phi.abs() < 0.05, "phi = {phi}");
    }

    #[test]
    fn rotation_aligns_tilted_cloud() {
        // Points along a 45-degree line
        let mut pts = vec![pt(-100.0, -100.0, 45.0), pt(0.0, 0.0, 45.0), pt(100.0, 100.0, 45.0)];
        translate_to_centroid(&mut pts);
        let phi = principal_axis_angle(&pts);
        rotate_by(&mut pts, phi);
        for p in &pts {
            assert!(p.y.abs() < 1e-6, "y residue {}", p.y);
        }
        // Orientations rotated along with the frame
        assert!((pts[0].theta_deg - 0.0).abs() < 1e-6);
    }

    #[test]
    fn direction_flip_keeps_first_angle_in_half_turn() {
        let mut pts = vec![pt(10.0, 0.0, 270.0), pt(-10.0, 0.0, 90.0)];
        disambiguate_direction(&mut pts);
        assert!(pts[0].theta_deg < 180.0);
    }

    #[test]
    fn degenerate_cloud_falls_back_to_identity() {
        let pts = vec![pt(0.0, 0.0, 10.0)];
        assert_eq!(principal_axis_angle(&pts), 0.0);
    }
}
