//! Domain types for beacon surveys.
//!
//! Value objects and pure reducers. Nothing here performs I/O.

pub mod distance;
pub mod histogram;
pub mod location;
pub mod pose;
pub mod quality;
pub mod record;
pub mod rounding;
pub mod sample;
pub mod stats;
pub mod survey_point;

pub use distance::{BeaconGeometry, DistanceResult, Point2};
pub use histogram::{EdgePolicy, Histogram, HistogramSpec};
pub use location::LocationId;
pub use pose::{DevicePose, PoseSample, SpatialPose};
pub use quality::{AngularCoverage, DataQualityTier, SurveyPointQuality};
pub use record::{
    BeaconMeta, BeaconObservation, PointPosition, ScanSummary, SurveyRecord, SurveySession,
    Timing, TopBeacon,
};
pub use sample::{Sample, SampleBuffer};
pub use stats::{EvenMedianRule, Statistics};
pub use survey_point::{make_key, parse_key, SurveyPoint};
