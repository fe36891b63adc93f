//! Duplicate-detection index boundary
//!
//! Consulted once per enrollment, immediately after identifier
//! derivation: an existing non-revoked bundle under the candidate DID
//! means the biometric is already enrolled. Verification never touches
//! the index. Production deployments back this with a chain indexer; the
//! in-memory implementation serves tests and single-node setups.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;

use crate::did::Did;
use crate::metadata::bundle::MetadataBundle;

/// Index lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The indexer cannot currently answer; enrollment must not finalize
    #[error("indexer unavailable: {0}")]
    Unavailable(String),
}

/// Lookup interface over previously anchored enrollments
pub trait DidIndex {
    /// The bundle anchored under `did`, if any
    fn find_did(&self, did: &Did) -> Result<Option<MetadataBundle>, IndexError>;
}

/// In-memory index keyed by the rendered identifier
#[derive(Debug, Default)]
pub struct MemoryIndex {
    bundles: RwLock<HashMap<String, MetadataBundle>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        MemoryIndex::default()
    }

    /// Anchor or replace the bundle under its identifier
    pub fn publish(&self, bundle: MetadataBundle) {
        let key = bundle.did.to_string();
        debug!(did = %key, revoked = bundle.revoked, "bundle published to index");
        if let Ok(mut map) = self.bundles.write() {
            map.insert(key, bundle);
        }
    }
}

impl DidIndex for MemoryIndex {
    fn find_did(&self, did: &Did) -> Result<Option<MetadataBundle>, IndexError> {
        let map = self
            .bundles
            .read()
            .map_err(|_| IndexError::Unavailable("index lock poisoned".into()))?;
        Ok(map.get(&did.to_string()).cloned())
    }
}

/// An index that always fails, for exercising outage handling
#[derive(Debug, Default)]
pub struct UnavailableIndex;

impl DidIndex for UnavailableIndex {
    fn find_did(&self, _did: &Did) -> Result<Option<MetadataBundle>, IndexError> {
        Err(IndexError::Unavailable("indexer offline".to_string()))
    }
}
