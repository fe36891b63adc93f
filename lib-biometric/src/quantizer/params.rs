//! Quantization configuration

use serde::{Deserialize, Serialize};

/// Knobs controlling minutiae canonicalization
///
/// The defaults are the enrolled production configuration. Changing any of
/// them changes every downstream template, so altered parameter sets must
/// only ever be introduced together with a new helper-data version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizationParams {
    /// Spatial cell edge in micrometers
    pub grid_um: u32,
    /// Number of discrete orientation bins over 360 degrees
    pub angle_bins: u8,
    /// Minimum minutiae that must survive the quality filter
    pub min_minutiae: u8,
    /// Minutiae below this quality are dropped before canonicalization
    pub quality_threshold: u8,
    /// Align the principal axis of the point cloud with the x-axis
    pub rotation_normalize: bool,
    /// Translate the point-cloud centroid to the origin
    pub translation_normalize: bool,
}

impl Default for QuantizationParams {
    fn default() -> Self {
        QuantizationParams {
            grid_um: 50,
            angle_bins: 32,
            min_minutiae: 20,
            quality_threshold: 70,
            rotation_normalize: true,
            translation_normalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_enrolled_configuration() {
        let p = QuantizationParams::default();
        assert_eq!(p.grid_um, 50);
        assert_eq!(p.angle_bins, 32);
        assert_eq!(p.min_minutiae, 20);
        assert_eq!(p.quality_threshold, 70);
        assert!(p.rotation_normalize);
        assert!(p.translation_normalize);
    }
}
