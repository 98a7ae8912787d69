//! Robust statistics reducer.
//!
//! Reduces the non-gap readings of one beacon to a median / MAD / p10 / p90
//! fingerprint. Everything is integer arithmetic on dBm values so results are
//! reproducible across platforms.

use serde::{Deserialize, Serialize};

use crate::domain::rounding::midpoint_half_up;
use crate::domain::sample::SampleBuffer;
use crate::error::{SurveyError, SurveyResult};

// ---------------------------------------------------------------------------
// EvenMedianRule
// ---------------------------------------------------------------------------

/// How the median of an even-length sequence is resolved to an integer.
///
/// Applies to both the median and the MAD pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvenMedianRule {
    /// Average the two middle elements, halves toward positive infinity.
    #[default]
    AverageHalfUp,
    /// Take the lower of the two middle elements.
    LowerMiddle,
}

impl EvenMedianRule {
    /// Median of an ascending-sorted, non-empty slice.
    fn median_of_sorted(self, sorted: &[i32]) -> i32 {
        let n = sorted.len();
        let upper = sorted[n / 2];
        if n % 2 == 1 {
            return upper;
        }
        let lower = sorted[n / 2 - 1];
        match self {
            Self::AverageHalfUp => midpoint_half_up(lower, upper),
            Self::LowerMiddle => lower,
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics -- Value Object
// ---------------------------------------------------------------------------

/// Robust summary of one beacon's readings within a collection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statistics {
    /// Median signal strength (dBm).
    pub median_dbm: i32,
    /// Median absolute deviation from the median (dB).
    pub mad_db: i32,
    /// 10th percentile, nearest-rank (dBm).
    pub p10_dbm: i32,
    /// 90th percentile, nearest-rank (dBm).
    pub p90_dbm: i32,
    /// Number of non-gap readings the statistics were computed from.
    pub sample_count: usize,
}

impl Statistics {
    /// Reduce readings under the default [`EvenMedianRule`].
    ///
    /// Gap markers must already be removed. Fails with
    /// [`SurveyError::InsufficientSamples`] on empty input.
    pub fn from_readings(readings: &[i32]) -> SurveyResult<Self> {
        Self::from_readings_with(readings, EvenMedianRule::default())
    }

    /// Reduce readings with an explicit even-median rule.
    pub fn from_readings_with(readings: &[i32], rule: EvenMedianRule) -> SurveyResult<Self> {
        if readings.is_empty() {
            return Err(SurveyError::InsufficientSamples);
        }

        let mut sorted = readings.to_vec();
        sorted.sort_unstable();

        let median = rule.median_of_sorted(&sorted);

        // Deviations can exceed i32::MAX on extreme input; they saturate.
        let mut deviations: Vec<i32> = sorted
            .iter()
            .map(|&v| i32::try_from(v.abs_diff(median)).unwrap_or(i32::MAX))
            .collect();
        deviations.sort_unstable();
        let mad = rule.median_of_sorted(&deviations);

        Ok(Self {
            median_dbm: median,
            mad_db: mad,
            p10_dbm: nearest_rank(&sorted, 10),
            p90_dbm: nearest_rank(&sorted, 90),
            sample_count: sorted.len(),
        })
    }

    /// Reduce the non-gap readings of a sample buffer.
    pub fn from_buffer(buffer: &SampleBuffer, rule: EvenMedianRule) -> SurveyResult<Self> {
        let readings: Vec<i32> = buffer.readings().collect();
        Self::from_readings_with(&readings, rule)
    }

    /// Inter-decile spread, `p90 - p10`, in dB.
    pub fn spread_db(&self) -> i32 {
        self.p90_dbm.saturating_sub(self.p10_dbm)
    }
}

/// Nearest-rank percentile: 1-based rank `ceil(pct * n / 100)` clamped to
/// `[1, n]`, indexed into an ascending-sorted, non-empty slice.
fn nearest_rank(sorted: &[i32], pct: usize) -> i32 {
    let n = sorted.len();
    let rank = (pct * n).div_ceil(100).clamp(1, n);
    sorted[rank - 1]
}
