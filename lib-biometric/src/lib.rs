//! Biometric Capture Model and Template Quantizer
//!
//! Canonicalizes noisy per-finger minutiae lists into fixed-length bit
//! templates that downstream key-extraction can consume. A template is a
//! 512-bit string: two captures of the same finger land on the same bits
//! up to a bounded number of flips, which the extractor's error-correcting
//! layer absorbs. No raw minutia positions survive quantization.

// Core modules
pub mod error;
pub mod quantizer;
pub mod types;

// Synthetic capture generation for test harnesses
#[cfg(any(test, feature = "testing"))]
pub mod synthetic;

// Re-export commonly used types and functions
pub use error::BiometricError;
pub use quantizer::{quantize, QuantizationParams};
pub use types::{
    finger::FingerId,
    minutia::{Minutia, MinutiaKind},
    template::{FingerTemplate, N_BITS, N_BYTES},
};
