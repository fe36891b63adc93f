//! Fuzzy Extractor Core
//!
//! Turns noise-tolerant biometric templates into bit-exact reproducible
//! keys. `gen` enrolls a template into a 32-byte finger key plus public,
//! MAC-authenticated helper data; `rep` reproduces exactly that key from a
//! noisy re-capture and the helper. Per-finger keys aggregate by XOR into a
//! master key with quality-gated fallback, O(1) rotation and revocation.
//!
//! Helper data contains no biometric features: a BCH-masked one-time seed,
//! a per-enrollment salt, a finger-scoped personalization tag, and an
//! HMAC over the record. All intermediate secrets are wiped on every exit
//! path; secret comparisons go through constant-time primitives.

// Core modules
pub mod aggregate;
pub mod bch;
pub mod error;
pub mod extractor;
pub mod random;
pub mod secret;

// Re-export commonly used types and functions
pub use aggregate::{aggregate, revoke, rotate, AggregationPolicy, Contribution, FallbackTier};
pub use error::{AggregateError, BchError, ExtractError};
pub use extractor::{
    gen, gen_with_recovery, rep, rep_with_recovery,
    helper_data::{HelperData, ALGO_BCH127_BLAKE2B_HMACSHA256, HELPER_VERSION_V1},
    recovery::RecoveryRecord,
};
pub use secret::{FingerKey, MasterKey, KEY_BYTES};
