//! Adapter implementations for the [`BlobStore`](crate::port::BlobStore) port.
//!
//! - [`MemoryBlobStore`]: process-local map; nothing survives a drop.
//! - [`FileBlobStore`]: one file per key below a root directory.

mod file_store;
mod memory_store;

pub use file_store::FileBlobStore;
pub use memory_store::MemoryBlobStore;
