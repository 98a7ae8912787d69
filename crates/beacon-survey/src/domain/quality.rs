//! Survey point data quality: dwell time and compass coverage.

use serde::{Deserialize, Serialize};

use crate::config::QualityThresholds;
use crate::domain::pose::normalize_heading_deg;
use crate::domain::record::SurveySession;

/// Number of compass sectors tracked.
pub const SECTOR_COUNT: usize = 8;

/// Width of one sector (degrees).
pub const SECTOR_WIDTH_DEG: f64 = 360.0 / SECTOR_COUNT as f64;

/// Headings closer than this to a sector boundary are shared with the
/// neighbouring sector.
pub const BOUNDARY_BLUR_DEG: f64 = 10.0;

/// Dwell time a sector needs before it counts as covered (seconds).
pub const SECTOR_COVERED_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// AngularCoverage
// ---------------------------------------------------------------------------

/// Dwell time accumulated per compass sector.
///
/// Sector 0 is centred on north and spans `[337.5, 22.5)`; sectors advance
/// clockwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularCoverage {
    /// Seconds per sector.
    pub sector_time_s: [f64; SECTOR_COUNT],
}

impl AngularCoverage {
    /// Credit `seconds` of dwell facing `heading_deg`.
    ///
    /// Inside the blur band the primary sector keeps between half (on the
    /// boundary) and all (at the band's inner edge) of the time; the rest goes
    /// to the neighbour on the heading's side.
    pub fn add_time(&mut self, seconds: f64, heading_deg: f64) {
        let heading = normalize_heading_deg(heading_deg);
        let half = SECTOR_WIDTH_DEG / 2.0;
        let primary = ((heading + half) / SECTOR_WIDTH_DEG) as usize % SECTOR_COUNT;

        // Signed offset from the primary sector's centre, in (-half, half].
        let centre = primary as f64 * SECTOR_WIDTH_DEG;
        let mut offset = heading - centre;
        if offset > 180.0 {
            offset -= 360.0;
        }

        let to_boundary = half - offset.abs();
        if (0.0..BOUNDARY_BLUR_DEG).contains(&to_boundary) {
            let primary_weight = 0.5 + 0.5 * (to_boundary / BOUNDARY_BLUR_DEG);
            let neighbour = if offset >= 0.0 {
                (primary + 1) % SECTOR_COUNT
            } else {
                (primary + SECTOR_COUNT - 1) % SECTOR_COUNT
            };
            self.sector_time_s[primary] += seconds * primary_weight;
            self.sector_time_s[neighbour] += seconds * (1.0 - primary_weight);
        } else {
            self.sector_time_s[primary] += seconds;
        }
    }

    /// Sectors holding at least [`SECTOR_COVERED_S`].
    pub fn covered_sector_count(&self) -> usize {
        self.sector_time_s
            .iter()
            .filter(|&&t| t >= SECTOR_COVERED_S)
            .count()
    }

    /// Total time over all sectors.
    pub fn total_s(&self) -> f64 {
        self.sector_time_s.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// DataQualityTier
// ---------------------------------------------------------------------------

/// Coarse quality grade for a survey point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataQualityTier {
    /// Little or no dwell time.
    Red,
    /// Some dwell time, not yet enough.
    Yellow,
    /// Enough dwell time from too few directions.
    Green,
    /// Enough dwell time from enough directions.
    Blue,
}

// ---------------------------------------------------------------------------
// SurveyPointQuality
// ---------------------------------------------------------------------------

/// Quality metrics derived from a point's sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyPointQuality {
    /// Sum of session durations (seconds).
    pub total_dwell_s: f64,
    /// Dwell time per compass sector, from sessions with a known heading.
    pub coverage: AngularCoverage,
    /// Number of sessions.
    pub session_count: usize,
}

impl SurveyPointQuality {
    /// Fold a point's sessions into quality metrics.
    ///
    /// The heading of a session is its pose facing, falling back to the
    /// compass heading. Sessions with neither still count toward dwell time.
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a SurveySession>) -> Self {
        let mut quality = Self::default();
        for session in sessions {
            let seconds = session.timing.duration_s;
            quality.total_dwell_s += seconds;
            quality.session_count += 1;
            if let Some(heading) = session.pose.facing_deg().or(session.compass_heading_deg) {
                quality.coverage.add_time(seconds, heading);
            }
        }
        quality
    }

    /// Grade against the configured thresholds.
    pub fn tier(&self, thresholds: &QualityThresholds) -> DataQualityTier {
        if self.total_dwell_s < thresholds.yellow_dwell_s {
            DataQualityTier::Red
        } else if self.total_dwell_s < thresholds.green_dwell_s {
            DataQualityTier::Yellow
        } else if self.coverage.covered_sector_count() >= thresholds.min_covered_sectors {
            DataQualityTier::Blue
        } else {
            DataQualityTier::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn centre_heading_fills_one_sector() {
        let mut cov = AngularCoverage::default();
        cov.add_time(4.0, 90.0);
        assert_eq!(cov.sector_time_s[2], 4.0);
        assert_eq!(cov.covered_sector_count(), 1);
    }

    #[test]
    fn north_wraps_into_sector_zero() {
        let mut cov = AngularCoverage::default();
        cov.add_time(1.0, 350.0);
        cov.add_time(1.0, 5.0);
        assert!(approx(cov.sector_time_s[0], 2.0));
    }

    #[test]
    fn boundary_splits_evenly() {
        let mut cov = AngularCoverage::default();
        // 22.5 sits on the boundary between sectors 0 and 1.
        cov.add_time(2.0, 22.5);
        assert!(approx(cov.sector_time_s[0], 1.0));
        assert!(approx(cov.sector_time_s[1], 1.0));

        let mut cov = AngularCoverage::default();
        // 337.5 is the boundary between sectors 7 and 0.
        cov.add_time(2.0, 337.5);
        assert!(approx(cov.sector_time_s[7], 1.0));
        assert!(approx(cov.sector_time_s[0], 1.0));

        let mut cov = AngularCoverage::default();
        // 5 degrees inside sector 1 from its lower boundary.
        cov.add_time(2.0, 27.5);
        assert!(approx(cov.sector_time_s[1], 2.0 * 0.75));
        assert!(approx(cov.sector_time_s[0], 2.0 * 0.25));
        assert!(approx(cov.total_s(), 2.0));
    }

    #[test]
    fn blur_goes_clockwise_above_centre() {
        let mut cov = AngularCoverage::default();
        // 2.5 degrees below the 67.5 boundary.
        cov.add_time(4.0, 65.0);
        assert!(cov.sector_time_s[1] > cov.sector_time_s[2]);
        assert!(cov.sector_time_s[2] > 0.0);
        assert_eq!(cov.sector_time_s[0], 0.0);
    }

    #[test]
    fn tiers() {
        let thresholds = QualityThresholds::default();
        let mut q = SurveyPointQuality::default();
        assert_eq!(q.tier(&thresholds), DataQualityTier::Red);
        q.total_dwell_s = 5.0;
        assert_eq!(q.tier(&thresholds), DataQualityTier::Yellow);
        q.total_dwell_s = 12.0;
        q.coverage.add_time(12.0, 0.0);
        assert_eq!(q.tier(&thresholds), DataQualityTier::Green);
        q.coverage.add_time(2.0, 90.0);
        q.coverage.add_time(2.0, 180.0);
        assert_eq!(q.tier(&thresholds), DataQualityTier::Blue);
    }
}
