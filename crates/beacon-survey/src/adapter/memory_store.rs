//! In-memory blob store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::StorageError;
use crate::port::BlobStore;

/// Thread-safe in-memory [`BlobStore`].
///
/// Keys are kept in a `BTreeMap` so [`BlobStore::list`] is a range scan and
/// comes out sorted.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether the store holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.blobs.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn write_new(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self.blobs.write();
        if blobs.contains_key(key) {
            return Err(StorageError::AlreadyExists {
                key: key.to_string(),
            });
        }
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .blobs
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.write().remove(key).is_some())
    }
}
