//! Storage error kinds surfaced to the enrollment and verification flows

use thiserror::Error;

/// Failures of helper-blob persistence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backend cannot be reached or refused the operation
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    /// Backend refused the blob for capacity reasons
    #[error("storage quota exceeded: {used} of {limit} bytes in use")]
    QuotaExceeded { used: usize, limit: usize },

    /// Fetched bytes do not match the reference's integrity hash
    #[error("fetched blob failed integrity verification")]
    IntegrityMismatch,

    /// No blob lives at the referenced location
    #[error("no blob stored at {0}")]
    NotFound(String),
}
