//! File-backed blob store.
//!
//! Each key maps to a file below the store root: `locations/home/a.json`
//! becomes `<root>/locations/home/a.json`.
//!
//! # Security
//!
//! Every key segment is validated before it touches the filesystem so a key
//! can never escape the root. Only ASCII alphanumerics, `-`, `_` and `.` are
//! allowed, and no segment may start with a dot.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StorageError;
use crate::port::BlobStore;

/// Maximum allowed length of one key segment.
const MAX_SEGMENT_LENGTH: usize = 256;

/// Check one `/`-separated key segment.
fn validate_segment(key: &str, segment: &str) -> Result<(), StorageError> {
    if segment.is_empty() {
        return Err(StorageError::invalid_key(key, "empty path segment"));
    }
    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(StorageError::invalid_key(
            key,
            format!(
                "segment too long: {} (max: {})",
                segment.len(),
                MAX_SEGMENT_LENGTH
            ),
        ));
    }
    // Also rejects "." and "..".
    if segment.starts_with('.') {
        return Err(StorageError::invalid_key(key, "segments cannot start with '.'"));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(StorageError::invalid_key(
            key,
            format!("invalid character '{c}'"),
        ));
    }
    Ok(())
}

/// [`BlobStore`] that keeps one file per key.
///
/// Replacing writes go through a hidden temporary sibling that is renamed
/// into place, so readers never see a half-written blob.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            validate_segment(key, segment)?;
            path.push(segment);
        }
        Ok(path)
    }

    /// Write `bytes` to a fresh hidden file next to `dest`.
    ///
    /// The file is deleted when the returned handle drops, so a failed write
    /// or publish never leaves it behind.
    fn stage(&self, key: &str, dest: &Path, bytes: &[u8]) -> Result<NamedTempFile, StorageError> {
        let io_err = |source: io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };
        let parent = dest
            .parent()
            .ok_or_else(|| StorageError::invalid_key(key, "key has no parent directory"))?;
        fs::create_dir_all(parent).map_err(io_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        Ok(tmp)
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            let key = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };
            if entry.file_type()?.is_dir() {
                self.collect_keys(&entry.path(), &key, out)?;
            } else {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let dest = self.path_for(key)?;
        self.stage(key, &dest, bytes)?
            .persist(&dest)
            .map_err(|e| StorageError::Io {
                key: key.to_string(),
                source: e.error,
            })?;
        debug!(key, bytes = bytes.len(), "blob written");
        Ok(())
    }

    fn write_new(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let dest = self.path_for(key)?;
        // Fails if the destination exists, making the publish atomic.
        match self.stage(key, &dest, bytes)?.persist_noclobber(&dest) {
            Ok(_) => {
                debug!(key, bytes = bytes.len(), "blob created");
                Ok(())
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists {
                    key: key.to_string(),
                })
            }
            Err(e) => Err(StorageError::Io {
                key: key.to_string(),
                source: e.error,
            }),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        self.collect_keys(&self.root, "", &mut keys)
            .map_err(|source| StorageError::Io {
                key: prefix.to_string(),
                source,
            })?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.write("locations/home/points.json", b"{}").unwrap();
        assert_eq!(
            store.read("locations/home/points.json").unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(dir.path().join("locations/home/points.json").is_file());
        assert_eq!(store.read("locations/home/missing.json").unwrap(), None);
    }

    #[test]
    fn rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        for key in ["../evil", "a/../../b", "a//b", ".hidden", "a/b c", "", "a\\b"] {
            let err = store.write(key, b"x").unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidKey { .. }),
                "{key:?} should be rejected"
            );
        }
        let long = "a".repeat(MAX_SEGMENT_LENGTH + 1);
        assert!(store.read(&long).is_err());
    }

    #[test]
    fn write_new_is_create_once() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.write_new("scans/r1.json", b"one").unwrap();
        let err = store.write_new("scans/r1.json", b"two").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert_eq!(store.read("scans/r1.json").unwrap(), Some(b"one".to_vec()));
        // No temporaries left behind.
        assert_eq!(store.list("").unwrap(), vec!["scans/r1.json".to_string()]);
    }

    fn hidden_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with('.'))
            .collect()
    }

    #[test]
    fn failed_publish_leaves_no_temporaries() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        // A non-empty directory where the blob should go makes the publish fail.
        let blocked = dir.path().join("a/blob.json");
        fs::create_dir_all(blocked.join("inner")).unwrap();

        let err = store.write("a/blob.json", b"data").unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }), "{err:?}");
        assert!(store.write_new("a/blob.json", b"data").is_err());

        assert!(hidden_entries(&dir.path().join("a")).is_empty());
        assert!(blocked.is_dir());
    }

    #[test]
    fn replacing_write_leaves_no_temporaries() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.write("a/blob.json", b"one").unwrap();
        store.write("a/blob.json", b"two").unwrap();
        assert_eq!(store.read("a/blob.json").unwrap(), Some(b"two".to_vec()));
        assert!(hidden_entries(&dir.path().join("a")).is_empty());
    }

    #[test]
    fn list_and_remove() {
        let dir = tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.write("locations/a/scans/2026-01/x.json", b"").unwrap();
        store.write("locations/a/scans/2026-02/y.json", b"").unwrap();
        store.write("locations/b/scans/2026-01/z.json", b"").unwrap();
        assert_eq!(
            store.list("locations/a/").unwrap(),
            vec![
                "locations/a/scans/2026-01/x.json".to_string(),
                "locations/a/scans/2026-02/y.json".to_string(),
            ]
        );
        assert!(store.remove("locations/a/scans/2026-01/x.json").unwrap());
        assert!(!store.remove("locations/a/scans/2026-01/x.json").unwrap());
    }
}
