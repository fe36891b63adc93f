//! Biometric DID Package
//!
//! Binds the reproducible master key to a network-scoped decentralized
//! identifier and to the versioned metadata bundle that anchors an
//! enrollment on chain. Provides the end-to-end enrollment and
//! verification flows: per-finger fan-out into the extractor, helper
//! persistence, duplicate detection, aggregation and identifier
//! comparison, with one closed machine-readable error taxonomy at the
//! boundary.

// Core modules
pub mod did;
pub mod error;
pub mod flows;
pub mod indexer;
pub mod metadata;
pub mod timing;

// Re-export commonly used types and functions
pub use did::{Did, Network};
pub use error::{CoreError, ErrorCategory, ErrorMode};
pub use flows::{
    enroll::{enroll, Enrollment, EnrollmentRequest},
    verify::{verify, VerifiedIdentity},
    FingerCapture,
};
pub use indexer::{DidIndex, IndexError, MemoryIndex};
pub use metadata::{
    bundle::{
        build_bundle, HelperEntry, HelperStorage, MetadataBundle, BUNDLE_VERSION,
        MAX_INLINE_BYTES, METADATA_LABEL,
    },
    MetadataError,
};
pub use timing::TimingFloor;
