//! Storage trait and reference types

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

type Blake2b256 = Blake2b<U32>;

/// Which class of backend a reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Blob travels inline with the metadata
    Inline,
    /// Local filesystem path
    Filesystem,
    /// Content-addressed network store
    Network,
}

/// Opaque, integrity-hashed reference to a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef {
    /// Backend class the URI is meaningful to
    pub backend: BackendKind,
    /// Backend-scoped locator
    pub uri: String,
    /// BLAKE2b-256 of the stored bytes
    #[serde(with = "hex_bytes")]
    pub integrity_hash: [u8; 32],
}

/// BLAKE2b-256 digest used to pin stored helper bytes
pub fn integrity_hash(bytes: &[u8]) -> [u8; 32] {
    Blake2b256::digest(bytes).into()
}

/// Persistence operations every backend provides
///
/// `store` pins the bytes under a fresh reference; `fetch` returns them
/// and must verify the integrity hash before handing bytes back;
/// `health_check` reports whether the backend can currently serve.
pub trait HelperStore {
    fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError>;
    fn fetch(&self, reference: &StorageRef) -> Result<Vec<u8>, StorageError>;
    fn health_check(&self) -> bool;
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("integrity hash must be 32 bytes"))
    }
}
