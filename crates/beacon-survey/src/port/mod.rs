//! Port definitions for the survey engine.
//!
//! Hexagonal-architecture ports at the two boundaries the engine reads from
//! or writes to: blob persistence and beacon geometry lookup.

mod blob_store;
mod geometry;

pub use blob_store::BlobStore;
pub use geometry::GeometrySource;
