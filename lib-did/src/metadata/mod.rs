//! Versioned enrollment metadata bundles

pub mod bundle;
pub mod codec;

use thiserror::Error;

/// Bundle construction and transition failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Bundle declares a schema revision this build does not write or read
    #[error("unsupported bundle version: {0:?}")]
    UnsupportedVersion(String),

    /// A bundle must name at least one controller
    #[error("controller set is empty")]
    NoControllers,

    /// A controller address fails the shape check for the network
    #[error("malformed controller address for {network}: {address:?}")]
    MalformedController { network: String, address: String },

    /// A finger that contributed to the master has no helper entry
    #[error("no helper entry for contributing finger {0}")]
    MissingHelper(String),

    /// Entry kinds must all match the declared storage mode
    #[error("helper entries do not match the declared storage mode")]
    MixedStorageMode,

    /// External entries must carry a non-empty locator
    #[error("external helper entry for {0} has an empty uri")]
    EmptyHelperUri(String),

    /// Inline bundles must fit the on-chain embedding budget
    #[error("serialized bundle is {size} bytes, limit {limit}")]
    BundleTooLarge { size: usize, limit: usize },

    /// `revoked` demands a revocation timestamp at or after enrollment
    #[error("revocation timestamp missing or before enrollment")]
    InvalidRevocationTimestamp,

    /// Only listed controllers may transition the bundle
    #[error("{0:?} is not an authorized controller")]
    UnauthorizedController(String),

    /// Revocation is a one-way transition
    #[error("bundle is already revoked")]
    AlreadyRevoked,

    /// Serialization failure while sizing or encoding
    #[error("bundle codec failure: {0}")]
    Codec(String),
}

pub use bundle::{
    build_bundle, HelperEntry, HelperStorage, MetadataBundle, BUNDLE_VERSION, MAX_INLINE_BYTES,
    METADATA_LABEL,
};
