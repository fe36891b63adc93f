//! Error kinds for extraction and aggregation

use thiserror::Error;

/// Decoder-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BchError {
    /// The received word is not within correction distance of any codeword
    #[error("uncorrectable error pattern")]
    UncorrectableErrors,
}

/// Failures of `gen`/`rep`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Helper record failed authentication; also raised when the helper
    /// belongs to a different finger, since the personalization tag is
    /// recomputed from the presented capture
    #[error("helper data authentication failed")]
    MacMismatch,

    /// Too many template bits differ from the enrolled capture
    #[error("error pattern exceeds correction capacity")]
    UncorrectableErrors,

    /// Key reproduction failed for a reason other than correction capacity
    #[error("key reproduction failed")]
    ReproduceFailed,

    /// Helper record written by an unknown format or algorithm revision
    #[error("unsupported helper data version: {got}")]
    VersionUnsupported { got: u8 },

    /// Helper record bytes do not parse under their declared version
    #[error("helper data record is malformed")]
    MalformedHelper,
}

/// Failures of master-key aggregation policy checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Fewer usable finger keys than the policy floor
    #[error("not enough finger keys: have {got}, policy requires {need}")]
    InsufficientFingers { got: usize, need: usize },

    /// A fallback tier matched the finger count but a contribution's
    /// quality sits below the tier threshold
    #[error(
        "capture quality {quality} below threshold {threshold} for {accepted}-of-{enrolled} fallback"
    )]
    QualityBelowFallbackThreshold {
        quality: u8,
        threshold: u8,
        accepted: usize,
        enrolled: usize,
    },

    /// The same finger appears twice in one aggregation
    #[error("duplicate contribution for finger {0}")]
    DuplicateFinger(String),
}
