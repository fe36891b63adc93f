//! In-memory backend for inline embedding and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::error::StorageError;
use crate::types::{integrity_hash, BackendKind, HelperStore, StorageRef};

/// Thread-safe in-memory blob store with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store that refuses writes once `quota_bytes` are resident
    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStore {
            quota_bytes: Some(quota_bytes),
            ..MemoryStore::default()
        }
    }

    fn resident_bytes(&self, blobs: &HashMap<String, Vec<u8>>) -> usize {
        blobs.values().map(Vec::len).sum()
    }
}

impl HelperStore for MemoryStore {
    fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| StorageError::StorageUnavailable("store lock poisoned".into()))?;
        if let Some(limit) = self.quota_bytes {
            let used = self.resident_bytes(&blobs);
            if used + bytes.len() > limit {
                return Err(StorageError::QuotaExceeded { used, limit });
            }
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let uri = format!("mem://{id}");
        blobs.insert(uri.clone(), bytes.to_vec());
        debug!(%uri, len = bytes.len(), "stored helper blob");
        Ok(StorageRef {
            backend: BackendKind::Inline,
            uri,
            integrity_hash: integrity_hash(bytes),
        })
    }

    fn fetch(&self, reference: &StorageRef) -> Result<Vec<u8>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| StorageError::StorageUnavailable("store lock poisoned".into()))?;
        let bytes = blobs
            .get(&reference.uri)
            .ok_or_else(|| StorageError::NotFound(reference.uri.clone()))?;
        if integrity_hash(bytes) != reference.integrity_hash {
            return Err(StorageError::IntegrityMismatch);
        }
        Ok(bytes.clone())
    }

    fn health_check(&self) -> bool {
        self.blobs.read().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_fetch_round_trips() {
        let store = MemoryStore::new();
        let r = store.store(b"helper bytes").expect("store");
        assert_eq!(store.fetch(&r).expect("fetch"), b"helper bytes");
        assert!(store.health_check());
    }

    #[test]
    fn fetch_of_unknown_uri_is_not_found() {
        let store = MemoryStore::new();
        let r = store.store(b"x").expect("store");
        let missing = StorageRef {
            uri: "mem://9999".to_string(),
            ..r
        };
        assert_eq!(
            store.fetch(&missing),
            Err(StorageError::NotFound("mem://9999".to_string()))
        );
    }

    #[test]
    fn corrupted_reference_fails_integrity() {
        let store = MemoryStore::new();
        let mut r = store.store(b"helper bytes").expect("store");
        r.integrity_hash[0] ^= 1;
        assert_eq!(store.fetch(&r), Err(StorageError::IntegrityMismatch));
    }

    #[test]
    fn quota_is_enforced() {
        let store = MemoryStore::with_quota(10);
        store.store(b"12345").expect("under quota");
        assert!(matches!(
            store.store(b"123456789"),
            Err(StorageError::QuotaExceeded { used: 5, limit: 10 })
        ));
    }
}
