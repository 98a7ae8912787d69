//! Immutable survey records and their per-beacon observations.
//!
//! A [`SurveyRecord`] is produced once per collection window by the
//! [`RecordAssembler`](crate::assembler::RecordAssembler) and never modified
//! afterwards. Survey points accumulate records as their sessions.

use serde::{Deserialize, Serialize};

use crate::config::QualityThresholds;
use crate::domain::distance::DistanceResult;
use crate::domain::histogram::Histogram;
use crate::domain::pose::{DevicePose, PoseSample};
use crate::domain::sample::Sample;
use crate::domain::stats::Statistics;

/// Schema tag written into every record.
pub const RECORD_SCHEMA: &str = "beacon-survey.scan.v1";

/// A survey session is one record stored under a survey point.
pub type SurveySession = SurveyRecord;

// ---------------------------------------------------------------------------
// BeaconMeta
// ---------------------------------------------------------------------------

/// Beacon metadata reported by the scanning subsystem at survey time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeaconMeta {
    /// Human-readable beacon name.
    pub name: String,
    /// Hardware model.
    pub model: String,
    /// Configured transmit power (dBm).
    pub tx_power_dbm: Option<i32>,
    /// Advertising interval (ms).
    pub advertising_interval_ms: Option<u32>,
}

// ---------------------------------------------------------------------------
// BeaconObservation
// ---------------------------------------------------------------------------

/// Everything recorded about one detected beacon in one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconObservation {
    /// Beacon identifier.
    pub beacon_id: String,
    /// Scanner-reported metadata, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BeaconMeta>,
    /// Robust statistics over non-gap readings.
    pub stats: Statistics,
    /// Binned readings, when histogram parameters were configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    /// Distances, when geometry and a usable scale were both available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceResult>,
    /// Raw timeline including gap markers.
    pub samples: Vec<Sample>,
}

// ---------------------------------------------------------------------------
// Timing / PointPosition
// ---------------------------------------------------------------------------

/// Collection window timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Window start, ISO-8601.
    pub start_iso: String,
    /// Window end, ISO-8601.
    pub end_iso: String,
    /// Duration in seconds, three decimals.
    pub duration_s: f64,
}

/// Where the device stood, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPosition {
    /// Map pixel position `[x, y]`.
    pub xy_px: [f64; 2],
    /// Metric map position `[x, y]`, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy_m: Option<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// SurveyRecord -- Value Object
// ---------------------------------------------------------------------------

/// One collection window's complete multi-beacon result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyRecord {
    /// Schema tag, [`RECORD_SCHEMA`].
    pub schema: String,
    /// Generated identifier of this record.
    pub record_id: String,
    /// Location the record belongs to.
    pub location_id: String,
    /// Map point the device stood on.
    pub point_id: String,
    /// Collection session identifier; identity for session dedup.
    pub session_id: String,
    /// Window timing.
    pub timing: Timing,
    /// Device pose at window start.
    pub pose: DevicePose,
    /// Compass heading at window start, when captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compass_heading_deg: Option<f64>,
    /// Device position.
    pub point: PointPosition,
    /// Pose track sampled during the window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pose_track: Vec<PoseSample>,
    /// Detected beacons, strongest median first.
    pub beacons: Vec<BeaconObservation>,
}

impl SurveyRecord {
    /// Look up the observation for a beacon.
    ///
    /// `None` means the beacon was not detected in this window.
    pub fn beacon(&self, beacon_id: &str) -> Option<&BeaconObservation> {
        self.beacons.iter().find(|b| b.beacon_id == beacon_id)
    }

    /// Total non-gap readings across all beacons.
    pub fn total_readings(&self) -> usize {
        self.beacons.iter().map(|b| b.stats.sample_count).sum()
    }
}

// ---------------------------------------------------------------------------
// ScanSummary
// ---------------------------------------------------------------------------

/// A beacon line in a [`ScanSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopBeacon {
    /// Beacon identifier.
    pub beacon_id: String,
    /// Beacon name, when known.
    pub name: Option<String>,
    /// Median signal strength (dBm).
    pub median_dbm: i32,
    /// Non-gap readings.
    pub samples: usize,
}

/// Compact digest of a record: the strongest beacons with enough data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Source record.
    pub record_id: String,
    /// Map point.
    pub point_id: String,
    /// Window duration (s).
    pub duration_s: f64,
    /// Qualifying beacons, strongest first.
    pub top_beacons: Vec<TopBeacon>,
}

impl ScanSummary {
    /// Build the summary, keeping beacons that meet both the sample-count and
    /// packet-rate thresholds.
    pub fn from_record(record: &SurveyRecord, thresholds: &QualityThresholds) -> Self {
        let duration = record.timing.duration_s;
        let mut qualifying: Vec<&BeaconObservation> = record
            .beacons
            .iter()
            .filter(|b| {
                let samples = b.stats.sample_count;
                let pps = if duration > 0.0 {
                    samples as f64 / duration
                } else {
                    0.0
                };
                samples >= thresholds.min_samples && pps >= thresholds.min_packets_per_second
            })
            .collect();
        qualifying.sort_by(|a, b| {
            b.stats
                .median_dbm
                .cmp(&a.stats.median_dbm)
                .then_with(|| a.beacon_id.cmp(&b.beacon_id))
        });

        Self {
            record_id: record.record_id.clone(),
            point_id: record.point_id.clone(),
            duration_s: duration,
            top_beacons: qualifying
                .into_iter()
                .take(thresholds.top_beacons)
                .map(|b| TopBeacon {
                    beacon_id: b.beacon_id.clone(),
                    name: b.meta.as_ref().map(|m| m.name.clone()),
                    median_dbm: b.stats.median_dbm,
                    samples: b.stats.sample_count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, median: i32, count: usize) -> BeaconObservation {
        BeaconObservation {
            beacon_id: id.to_string(),
            meta: None,
            stats: Statistics {
                median_dbm: median,
                mad_db: 1,
                p10_dbm: median - 2,
                p90_dbm: median + 2,
                sample_count: count,
            },
            histogram: None,
            distance: None,
            samples: Vec::new(),
        }
    }

    fn record(beacons: Vec<BeaconObservation>, duration_s: f64) -> SurveyRecord {
        SurveyRecord {
            schema: RECORD_SCHEMA.to_string(),
            record_id: "r1".into(),
            location_id: "home".into(),
            point_id: "p1".into(),
            session_id: "s1".into(),
            timing: Timing {
                start_iso: "2026-01-01T00:00:00.000Z".into(),
                end_iso: "2026-01-01T00:00:10.000Z".into(),
                duration_s,
            },
            pose: DevicePose::default(),
            compass_heading_deg: None,
            point: PointPosition {
                xy_px: [0.0, 0.0],
                xy_m: None,
            },
            pose_track: Vec::new(),
            beacons,
        }
    }

    #[test]
    fn summary_filters_and_ranks() {
        let rec = record(
            vec![
                obs("weak", -85, 40),
                obs("sparse", -50, 5),
                obs("strong", -60, 40),
                obs("slow", -55, 10),
            ],
            20.0,
        );
        let summary = ScanSummary::from_record(&rec, &QualityThresholds::default());
        // "slow": 10 samples / 20 s = 0.5 pkt/s < 0.8
        let ids: Vec<_> = summary.top_beacons.iter().map(|b| b.beacon_id.as_str()).collect();
        assert_eq!(ids, vec!["strong", "weak"]);
    }

    #[test]
    fn absent_beacon_is_none() {
        let rec = record(vec![obs("a", -70, 12)], 10.0);
        assert!(rec.beacon("a").is_some());
        assert!(rec.beacon("b").is_none());
        assert_eq!(rec.total_readings(), 12);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let rec = record(vec![obs("a", -70, 12)], 10.0);
        let json = serde_json::to_value(&rec).unwrap();
        let beacon = &json["beacons"][0];
        assert!(beacon.get("distance").is_none());
        assert!(beacon.get("histogram").is_none());
        assert!(json.get("pose_track").is_none());
    }
}
