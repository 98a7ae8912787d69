//! # beacon-survey
//!
//! Statistical fingerprinting and distance engine for indoor beacon surveys,
//! plus the coordinate-keyed store that aggregates survey sessions.
//!
//! At a known point on the map a device records a burst of signal-strength
//! samples from several fixed beacons. This crate provides:
//!
//! - **Domain types**: [`SampleBuffer`], [`Statistics`], [`Histogram`],
//!   [`DistanceResult`], [`SurveyRecord`], [`SurveyPoint`]
//! - **Assembler**: [`RecordAssembler`] -- turns a [`CollectionWindow`] into
//!   an immutable [`SurveyRecord`]
//! - **Store**: [`SurveyPointStore`] -- sessions keyed by `"X.XX,Y.XX"`,
//!   persisted per location
//! - **Archive**: [`ScanArchive`] -- write-once record storage
//! - **Ports**: [`BlobStore`], [`GeometrySource`]
//! - **Adapters**: [`MemoryBlobStore`], [`FileBlobStore`]
//!
//! ## Example
//!
//! ```rust
//! use beacon_survey::prelude::*;
//!
//! let mut buffer = SampleBuffer::new();
//! for (i, dbm) in [-70, -72, -69, 0, -71].into_iter().enumerate() {
//!     buffer.push(i as u64 * 100, dbm);
//! }
//! let stats = Statistics::from_buffer(&buffer, EvenMedianRule::AverageHalfUp).unwrap();
//! assert_eq!(stats.sample_count, 4);
//! assert_eq!(stats.median_dbm, -70);
//! ```

#![forbid(unsafe_code)]

pub mod adapter;
pub mod archive;
pub mod assembler;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
pub mod store;

// Re-export key types at the crate root for convenience.
pub use adapter::{FileBlobStore, MemoryBlobStore};
pub use archive::ScanArchive;
pub use assembler::{BeaconCapture, CollectionWindow, RecordAssembler};
pub use config::{QualityThresholds, SurveyConfig};
pub use domain::distance::{BeaconGeometry, DistanceResult, Point2};
pub use domain::histogram::{EdgePolicy, Histogram, HistogramSpec};
pub use domain::location::LocationId;
pub use domain::pose::{DevicePose, PoseSample, SpatialPose};
pub use domain::quality::{AngularCoverage, DataQualityTier, SurveyPointQuality};
pub use domain::record::{BeaconMeta, BeaconObservation, ScanSummary, SurveyRecord, SurveySession};
pub use domain::sample::{Sample, SampleBuffer};
pub use domain::stats::{EvenMedianRule, Statistics};
pub use domain::survey_point::{make_key, parse_key, SurveyPoint};
pub use error::{ConfigError, StorageError, SurveyError, SurveyResult};
pub use port::{BlobStore, GeometrySource};
pub use store::{ImportSummary, SurveyPointStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
///
/// ```rust
/// use beacon_survey::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{FileBlobStore, MemoryBlobStore};
    pub use crate::archive::ScanArchive;
    pub use crate::assembler::{BeaconCapture, CollectionWindow, RecordAssembler};
    pub use crate::config::SurveyConfig;
    pub use crate::domain::{
        make_key, BeaconGeometry, DevicePose, DistanceResult, EvenMedianRule, Histogram,
        HistogramSpec, LocationId, Point2, SampleBuffer, Statistics, SurveyPoint, SurveyRecord,
    };
    pub use crate::error::{SurveyError, SurveyResult};
    pub use crate::port::{BlobStore, GeometrySource};
    pub use crate::store::SurveyPointStore;
}
