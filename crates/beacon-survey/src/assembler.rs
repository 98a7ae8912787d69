//! Scan/survey record assembler.
//!
//! Turns one completed collection window into an immutable [`SurveyRecord`]:
//! statistics and histogram per detected beacon, distance where geometry and
//! scale allow, rounded timing and position.
//!
//! Beacons are reduced in parallel on the rayon pool. The results are joined
//! before the record is composed and then sorted, so the output does not
//! depend on completion order.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SurveyConfig;
use crate::domain::distance::{DistanceResult, Point2};
use crate::domain::histogram::Histogram;
use crate::domain::pose::{DevicePose, PoseSample};
use crate::domain::record::{
    BeaconMeta, BeaconObservation, PointPosition, SurveyRecord, Timing, RECORD_SCHEMA,
};
use crate::domain::rounding::{round_half_up, round_pair, DISTANCE_PLACES, DURATION_PLACES};
use crate::domain::sample::SampleBuffer;
use crate::domain::stats::Statistics;
use crate::error::{SurveyError, SurveyResult};
use crate::port::GeometrySource;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything the scanner captured for one beacon during a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconCapture {
    /// Time-ordered samples, gap markers included.
    pub buffer: SampleBuffer,
    /// Metadata discovered by the scanner.
    pub meta: Option<BeaconMeta>,
}

impl BeaconCapture {
    /// Capture without metadata.
    pub fn new(buffer: SampleBuffer) -> Self {
        Self { buffer, meta: None }
    }

    /// Attach scanner metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: BeaconMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A completed collection window, as handed over by the scanning side.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionWindow {
    /// Location the survey belongs to.
    pub location_id: String,
    /// Map point the device stood on.
    pub point_id: String,
    /// Collection session identifier.
    pub session_id: String,
    /// Window start.
    pub started_at: DateTime<Utc>,
    /// Window end.
    pub ended_at: DateTime<Utc>,
    /// Device position in map pixels.
    pub point_px: Point2,
    /// Device position in meters, when the map is calibrated.
    pub point_m: Option<Point2>,
    /// Device pose at window start.
    pub pose: DevicePose,
    /// Compass heading at window start.
    pub compass_heading_deg: Option<f64>,
    /// Spatial poses sampled during the window.
    pub pose_track: Vec<PoseSample>,
    /// Per-beacon captures keyed by beacon ID.
    pub beacons: BTreeMap<String, BeaconCapture>,
}

impl CollectionWindow {
    /// Window with no beacons and a default pose.
    pub fn new(
        location_id: impl Into<String>,
        point_id: impl Into<String>,
        session_id: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        point_px: Point2,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            point_id: point_id.into(),
            session_id: session_id.into(),
            started_at,
            ended_at,
            point_px,
            point_m: None,
            pose: DevicePose::default(),
            compass_heading_deg: None,
            pose_track: Vec::new(),
            beacons: BTreeMap::new(),
        }
    }

    /// Add or replace a beacon capture.
    pub fn insert_beacon(&mut self, beacon_id: impl Into<String>, capture: BeaconCapture) {
        self.beacons.insert(beacon_id.into(), capture);
    }
}

/// Render a timestamp as ISO-8601 with milliseconds and a `Z` suffix.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// RecordAssembler
// ---------------------------------------------------------------------------

/// Pure transform from a [`CollectionWindow`] to a [`SurveyRecord`].
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    config: SurveyConfig,
}

impl RecordAssembler {
    /// Create an assembler; the configuration is validated first.
    pub fn new(config: SurveyConfig) -> SurveyResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Build the record for `window`.
    ///
    /// Beacons without a single non-gap reading are left out. Distance is
    /// attached only when the beacon has geometry and `pixels_per_meter` is
    /// usable.
    ///
    /// # Errors
    ///
    /// [`SurveyError::InvalidWindow`] if the window ends before it starts or
    /// its position is NaN or infinite.
    pub fn assemble<G>(
        &self,
        window: &CollectionWindow,
        geometry: &G,
        pixels_per_meter: Option<f64>,
    ) -> SurveyResult<SurveyRecord>
    where
        G: GeometrySource + ?Sized,
    {
        let elapsed = window.ended_at - window.started_at;
        if elapsed < chrono::Duration::zero() {
            return Err(SurveyError::invalid_window(format!(
                "ends at {} before it starts at {}",
                iso_timestamp(&window.ended_at),
                iso_timestamp(&window.started_at)
            )));
        }
        if !(window.point_px.x.is_finite() && window.point_px.y.is_finite()) {
            return Err(SurveyError::invalid_window(format!(
                "pixel position ({}, {}) is not finite",
                window.point_px.x, window.point_px.y
            )));
        }
        if let Some(p) = window.point_m {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(SurveyError::invalid_window(format!(
                    "metric position ({}, {}) is not finite",
                    p.x, p.y
                )));
            }
        }
        let duration_s = round_half_up(elapsed.num_milliseconds() as f64 / 1000.0, DURATION_PLACES);

        let device_height_m = window.pose.height_m();
        let observed: Vec<Option<BeaconObservation>> = window
            .beacons
            .par_iter()
            .map(|(beacon_id, capture)| {
                self.observe(
                    beacon_id,
                    capture,
                    window.point_px,
                    device_height_m,
                    geometry,
                    pixels_per_meter,
                )
            })
            .collect::<SurveyResult<_>>()?;

        let omitted = observed.iter().filter(|o| o.is_none()).count();
        let mut beacons: Vec<BeaconObservation> = observed.into_iter().flatten().collect();
        beacons.sort_by(|a, b| {
            b.stats
                .median_dbm
                .cmp(&a.stats.median_dbm)
                .then_with(|| a.beacon_id.cmp(&b.beacon_id))
        });

        let record = SurveyRecord {
            schema: RECORD_SCHEMA.to_string(),
            record_id: Uuid::new_v4().to_string(),
            location_id: window.location_id.clone(),
            point_id: window.point_id.clone(),
            session_id: window.session_id.clone(),
            timing: Timing {
                start_iso: iso_timestamp(&window.started_at),
                end_iso: iso_timestamp(&window.ended_at),
                duration_s,
            },
            pose: window.pose,
            compass_heading_deg: window.compass_heading_deg,
            point: PointPosition {
                xy_px: round_pair(window.point_px.x, window.point_px.y, DISTANCE_PLACES),
                xy_m: window
                    .point_m
                    .map(|p| round_pair(p.x, p.y, DISTANCE_PLACES)),
            },
            pose_track: window.pose_track.clone(),
            beacons,
        };

        info!(
            record_id = %record.record_id,
            point_id = %record.point_id,
            beacons = record.beacons.len(),
            omitted,
            duration_s,
            "survey record assembled"
        );
        Ok(record)
    }

    /// Reduce one beacon's capture.
    ///
    /// Returns `Ok(None)` when the beacon was never detected.
    pub fn observe<G>(
        &self,
        beacon_id: &str,
        capture: &BeaconCapture,
        device_px: Point2,
        device_height_m: Option<f64>,
        geometry: &G,
        pixels_per_meter: Option<f64>,
    ) -> SurveyResult<Option<BeaconObservation>>
    where
        G: GeometrySource + ?Sized,
    {
        let stats = match Statistics::from_buffer(&capture.buffer, self.config.even_median) {
            Ok(stats) => stats,
            Err(SurveyError::InsufficientSamples) => {
                debug!(beacon_id, "beacon not detected, omitted from record");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let histogram = match &self.config.histogram {
            Some(spec) => {
                let readings: Vec<i32> = capture.buffer.readings().collect();
                Some(Histogram::build(&readings, spec)?)
            }
            None => None,
        };

        let distance = match geometry.geometry(beacon_id) {
            None => {
                debug!(beacon_id, "no beacon geometry, distance omitted");
                None
            }
            Some(geom) => {
                match DistanceResult::between(device_px, device_height_m, &geom, pixels_per_meter)
                {
                    Ok(d) => Some(d),
                    Err(SurveyError::DegenerateScale { pixels_per_meter }) => {
                        debug!(beacon_id, ?pixels_per_meter, "unusable map scale, distance omitted");
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(Some(BeaconObservation {
            beacon_id: beacon_id.to_string(),
            meta: capture.meta.clone(),
            stats,
            histogram,
            distance,
            samples: capture.buffer.samples().to_vec(),
        }))
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self {
            config: SurveyConfig::default(),
        }
    }
}
