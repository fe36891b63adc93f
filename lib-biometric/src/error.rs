//! Input-stage error kinds for capture and quantization

use thiserror::Error;

/// Errors produced while validating or canonicalizing captured minutiae
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    /// Too few minutiae survived the quality filter to quantize reliably
    #[error("insufficient minutiae after quality filter: kept {got}, need {need}")]
    InsufficientMinutiae { got: usize, need: usize },

    /// A finger tag that is not one of the ten recognized identifiers
    #[error("unrecognized finger identifier: {0:?}")]
    InvalidFingerId(String),
}
