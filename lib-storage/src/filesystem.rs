//! Filesystem backend with atomic writes
//!
//! Blobs are content-addressed by their integrity hash. Writes go to a
//! temporary sibling first and land via rename, so a crash never leaves a
//! half-written helper visible. An optional `.bak` copy of the previous
//! content survives overwrites.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StorageError;
use crate::types::{integrity_hash, BackendKind, HelperStore, StorageRef};

/// Helper store rooted at a local directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    keep_backup: bool,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StorageError::StorageUnavailable(e.to_string()))?;
        Ok(FileStore {
            root,
            keep_backup: false,
        })
    }

    /// Keep a `.bak` copy of previous content when a blob is overwritten
    pub fn with_backup(mut self) -> Self {
        self.keep_backup = true;
        self
    }

    fn blob_path(&self, hash: &[u8; 32]) -> PathBuf {
        self.root.join(hex::encode(hash))
    }

    fn unavailable(err: std::io::Error) -> StorageError {
        StorageError::StorageUnavailable(err.to_string())
    }
}

impl HelperStore for FileStore {
    fn store(&self, bytes: &[u8]) -> Result<StorageRef, StorageError> {
        let hash = integrity_hash(bytes);
        let path = self.blob_path(&hash);

        if self.keep_backup && path.exists() {
            let backup = path.with_extension("bak");
            if let Err(e) = fs::copy(&path, &backup) {
                warn!(path = %path.display(), error = %e, "backup copy failed");
            }
        }

        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(Self::unavailable)?;
        file.write_all(bytes).map_err(Self::unavailable)?;
        file.sync_all().map_err(Self::unavailable)?;
        drop(file);
        fs::rename(&tmp, &path).map_err(Self::unavailable)?;

        debug!(path = %path.display(), len = bytes.len(), "stored helper blob");
        Ok(StorageRef {
            backend: BackendKind::Filesystem,
            uri: format!("file://{}", path.display()),
            integrity_hash: hash,
        })
    }

    fn fetch(&self, reference: &StorageRef) -> Result<Vec<u8>, StorageError> {
        let path = reference
            .uri
            .strip_prefix("file://")
            .map(Path::new)
            .ok_or_else(|| StorageError::NotFound(reference.uri.clone()))?;
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(reference.uri.clone()))
            }
            Err(e) => return Err(Self::unavailable(e)),
        };
        if integrity_hash(&bytes) != reference.integrity_hash {
            return Err(StorageError::IntegrityMismatch);
        }
        Ok(bytes)
    }

    fn health_check(&self) -> bool {
        self.root.is_dir()
            && fs::metadata(&self.root)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false)
    }
}
