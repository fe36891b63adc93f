//! Boundary error taxonomy
//!
//! Every failure the package surfaces is one of a closed set of tagged
//! kinds, each with a stable machine-readable code and a category. In
//! production mode the cryptographic kinds collapse into one opaque
//! `VerificationFailed`, so callers on the wrong side of a trust boundary
//! cannot distinguish an authentication failure from a decode failure.
//! No stack traces, biometric material or secret-dependent detail ever
//! ride along.

use thiserror::Error;

use lib_biometric::BiometricError;
use lib_fuzzy::{AggregateError, ExtractError};
use lib_storage::StorageError;

use crate::indexer::IndexError;
use crate::metadata::MetadataError;

/// How much failure detail leaves the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Collapse cryptographic kinds into `VerificationFailed`
    #[default]
    Production,
    /// Surface every kind verbatim
    Diagnostic,
}

/// Coarse recovery class of an error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller re-captures or upgrades
    Input,
    /// Fatal for the attempt; opaque in production mode
    Cryptographic,
    /// Fatal for the operation; retry with different inputs
    Policy,
    /// Transient; caller owns retry and backoff
    External,
}

/// The closed error set crossing the package boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // --- input ---
    #[error("insufficient minutiae after quality filter: kept {got}, need {need}")]
    InsufficientMinutiae { got: usize, need: usize },

    #[error("unrecognized finger identifier: {0:?}")]
    InvalidFingerId(String),

    #[error("unsupported record version: {got}")]
    VersionUnsupported { got: u8 },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    // --- cryptographic ---
    #[error("helper data authentication failed")]
    MacMismatch,

    #[error("error pattern exceeds correction capacity")]
    UncorrectableErrors,

    #[error("key reproduction failed")]
    ReproduceFailed,

    #[error("integrity verification failed")]
    IntegrityMismatch,

    /// The only cryptographic kind production mode emits
    #[error("verification failed")]
    VerificationFailed,

    // --- policy ---
    #[error("not enough finger keys: have {got}, policy requires {need}")]
    InsufficientFingers { got: usize, need: usize },

    #[error("capture quality {quality} below fallback threshold {threshold}")]
    QualityBelowFallbackThreshold { quality: u8, threshold: u8 },

    #[error("an identity already exists for this biometric: {0}")]
    DuplicateIdentity(String),

    #[error("metadata bundle is revoked")]
    RevokedBundle,

    #[error("{0:?} is not an authorized controller")]
    UnauthorizedController(String),

    #[error("metadata bundle rejected: {0}")]
    InvalidBundle(String),

    // --- external ---
    #[error("storage backend unavailable: {0}")]
    StorageUnavailable(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("duplicate-detection index unavailable: {0}")]
    IndexerUnavailable(String),
}

impl CoreError {
    /// Recovery class of this kind
    pub fn category(&self) -> ErrorCategory {
        use CoreError::*;
        match self {
            InsufficientMinutiae { .. } | InvalidFingerId(_) | VersionUnsupported { .. }
            | MalformedRecord(_) => ErrorCategory::Input,
            MacMismatch | UncorrectableErrors | ReproduceFailed | IntegrityMismatch
            | VerificationFailed => ErrorCategory::Cryptographic,
            InsufficientFingers { .. }
            | QualityBelowFallbackThreshold { .. }
            | DuplicateIdentity(_)
            | RevokedBundle
            | UnauthorizedController(_)
            | InvalidBundle(_) => ErrorCategory::Policy,
            StorageUnavailable(_) | QuotaExceeded | IndexerUnavailable(_) => {
                ErrorCategory::External
            }
        }
    }

    /// Stable machine-readable code, safe for audit logs
    pub fn code(&self) -> &'static str {
        use CoreError::*;
        match self {
            InsufficientMinutiae { .. } => "insufficient_minutiae",
            InvalidFingerId(_) => "invalid_finger_id",
            VersionUnsupported { .. } => "version_unsupported",
            MalformedRecord(_) => "malformed_record",
            MacMismatch => "mac_mismatch",
            UncorrectableErrors => "uncorrectable_errors",
            ReproduceFailed => "reproduce_failed",
            IntegrityMismatch => "integrity_mismatch",
            VerificationFailed => "verification_failed",
            InsufficientFingers { .. } => "insufficient_fingers",
            QualityBelowFallbackThreshold { .. } => "quality_below_fallback_threshold",
            DuplicateIdentity(_) => "duplicate_identity",
            RevokedBundle => "revoked_bundle",
            UnauthorizedController(_) => "unauthorized_controller",
            InvalidBundle(_) => "invalid_bundle",
            StorageUnavailable(_) => "storage_unavailable",
            QuotaExceeded => "quota_exceeded",
            IndexerUnavailable(_) => "indexer_unavailable",
        }
    }

    /// Apply the boundary's disclosure policy
    pub fn sanitized(self, mode: ErrorMode) -> CoreError {
        match (mode, self.category()) {
            (ErrorMode::Production, ErrorCategory::Cryptographic) => CoreError::VerificationFailed,
            _ => self,
        }
    }
}

impl From<BiometricError> for CoreError {
    fn from(err: BiometricError) -> Self {
        match err {
            BiometricError::InsufficientMinutiae { got, need } => {
                CoreError::InsufficientMinutiae { got, need }
            }
            BiometricError::InvalidFingerId(tag) => CoreError::InvalidFingerId(tag),
        }
    }
}

impl From<ExtractError> for CoreError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::MacMismatch => CoreError::MacMismatch,
            ExtractError::UncorrectableErrors => CoreError::UncorrectableErrors,
            ExtractError::ReproduceFailed => CoreError::ReproduceFailed,
            ExtractError::VersionUnsupported { got } => CoreError::VersionUnsupported { got },
            ExtractError::MalformedHelper => {
                CoreError::MalformedRecord("helper data record".to_string())
            }
        }
    }
}

impl From<AggregateError> for CoreError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::InsufficientFingers { got, need } => {
                CoreError::InsufficientFingers { got, need }
            }
            AggregateError::QualityBelowFallbackThreshold {
                quality, threshold, ..
            } => CoreError::QualityBelowFallbackThreshold { quality, threshold },
            AggregateError::DuplicateFinger(tag) => {
                CoreError::MalformedRecord(format!("duplicate contribution for finger {tag}"))
            }
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StorageUnavailable(why) => CoreError::StorageUnavailable(why),
            StorageError::QuotaExceeded { .. } => CoreError::QuotaExceeded,
            StorageError::IntegrityMismatch => CoreError::IntegrityMismatch,
            StorageError::NotFound(uri) => CoreError::StorageUnavailable(format!("missing: {uri}")),
        }
    }
}

impl From<IndexError> for CoreError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable(why) => CoreError::IndexerUnavailable(why),
        }
    }
}

impl From<MetadataError> for CoreError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::UnauthorizedController(addr) => CoreError::UnauthorizedController(addr),
            MetadataError::AlreadyRevoked => CoreError::RevokedBundle,
            other => CoreError::InvalidBundle(other.to_string()),
        }
    }
}
