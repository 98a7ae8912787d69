//! The driven port for blob persistence.

use crate::error::StorageError;

/// Key/value blob storage.
///
/// Keys are `/`-separated paths such as
/// `locations/home/survey-points.v1.json`. Implementations include:
/// - [`crate::adapter::MemoryBlobStore`] -- in-process map, for tests and
///   ephemeral sessions.
/// - [`crate::adapter::FileBlobStore`] -- one file per key under a root
///   directory.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, or `None` if there is none.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `bytes` under `key`, replacing any existing blob.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Store `bytes` under `key` only if no blob exists there yet.
    ///
    /// Fails with [`StorageError::AlreadyExists`] otherwise.
    fn write_new(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, sorted ascending.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Delete the blob under `key`; returns whether one existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(key, bytes)
    }

    fn write_new(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write_new(key, bytes)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list(prefix)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }
}
