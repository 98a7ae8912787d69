//! Fixed-bin-width dBm histogram with explicit underflow and overflow.
//!
//! Bin indices are computed with integer arithmetic so a histogram is
//! reproducible bit-for-bit from the same readings and bin parameters.

use serde::{Deserialize, Serialize};

use crate::error::{SurveyError, SurveyResult};

// ---------------------------------------------------------------------------
// EdgePolicy
// ---------------------------------------------------------------------------

/// Which bin a reading exactly on a bin boundary belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgePolicy {
    /// Bins are `[lo, hi)`: a value on a lower edge belongs to that bin.
    #[default]
    LeftInclusive,
    /// Bins are `(lo, hi]`: a value on an upper edge belongs to that bin.
    RightInclusive,
}

// ---------------------------------------------------------------------------
// HistogramSpec
// ---------------------------------------------------------------------------

/// Bin parameters for a [`Histogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistogramSpec {
    /// Lower edge of the first bin (dBm).
    pub bin_min_dbm: i32,
    /// Upper edge of the last bin (dBm).
    pub bin_max_dbm: i32,
    /// Width of every bin (dB).
    pub bin_size_db: i32,
    /// Boundary inclusion policy.
    #[serde(default)]
    pub edge_policy: EdgePolicy,
}

impl Default for HistogramSpec {
    fn default() -> Self {
        Self {
            bin_min_dbm: -100,
            bin_max_dbm: -30,
            bin_size_db: 1,
            edge_policy: EdgePolicy::LeftInclusive,
        }
    }
}

impl HistogramSpec {
    /// Create a left-inclusive spec.
    pub fn new(bin_min_dbm: i32, bin_max_dbm: i32, bin_size_db: i32) -> Self {
        Self {
            bin_min_dbm,
            bin_max_dbm,
            bin_size_db,
            edge_policy: EdgePolicy::LeftInclusive,
        }
    }

    /// Replace the edge policy.
    #[must_use]
    pub fn with_edge_policy(mut self, edge_policy: EdgePolicy) -> Self {
        self.edge_policy = edge_policy;
        self
    }

    /// Check that the range splits into a whole, positive number of bins.
    pub fn validate(&self) -> SurveyResult<()> {
        if self.bin_size_db <= 0 {
            return Err(SurveyError::invalid_histogram(format!(
                "bin size must be > 0, got {}",
                self.bin_size_db
            )));
        }
        if self.bin_max_dbm <= self.bin_min_dbm {
            return Err(SurveyError::invalid_histogram(format!(
                "bin max {} must exceed bin min {}",
                self.bin_max_dbm, self.bin_min_dbm
            )));
        }
        let range = i64::from(self.bin_max_dbm) - i64::from(self.bin_min_dbm);
        if range % i64::from(self.bin_size_db) != 0 {
            return Err(SurveyError::invalid_histogram(format!(
                "range {range} dB is not a multiple of bin size {}",
                self.bin_size_db
            )));
        }
        Ok(())
    }

    /// Number of bins, `(max - min) / size`. Assumes a validated spec.
    pub fn bin_count(&self) -> usize {
        let range = i64::from(self.bin_max_dbm) - i64::from(self.bin_min_dbm);
        (range / i64::from(self.bin_size_db)) as usize
    }

    /// Classify a reading.
    fn classify(&self, value: i32) -> Slot {
        let v = i64::from(value);
        let min = i64::from(self.bin_min_dbm);
        let max = i64::from(self.bin_max_dbm);
        let size = i64::from(self.bin_size_db);
        match self.edge_policy {
            EdgePolicy::LeftInclusive => {
                if v < min {
                    Slot::Underflow
                } else if v >= max {
                    Slot::Overflow
                } else {
                    Slot::Bin(((v - min) / size) as usize)
                }
            }
            EdgePolicy::RightInclusive => {
                if v <= min {
                    Slot::Underflow
                } else if v > max {
                    Slot::Overflow
                } else {
                    Slot::Bin(((v - min + size - 1) / size - 1) as usize)
                }
            }
        }
    }
}

enum Slot {
    Underflow,
    Bin(usize),
    Overflow,
}

// ---------------------------------------------------------------------------
// Histogram -- Value Object
// ---------------------------------------------------------------------------

/// Histogram of non-gap readings over a fixed dBm range.
///
/// `counts.len()` always equals [`HistogramSpec::bin_count`], and every
/// reading lands in exactly one of: one bin, underflow, or overflow.
/// Decoding rejects data that breaks the first rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "HistogramFields")]
pub struct Histogram {
    /// Lower edge of the first bin (dBm).
    pub bin_min_dbm: i32,
    /// Upper edge of the last bin (dBm).
    pub bin_max_dbm: i32,
    /// Bin width (dB).
    pub bin_size_db: i32,
    /// Per-bin counts; empty bins are explicit zeros.
    pub counts: Vec<u32>,
    /// Readings below the first bin.
    pub underflow_count: u32,
    /// Readings beyond the last bin.
    pub overflow_count: u32,
    /// Boundary inclusion policy used to build the counts.
    pub edge_policy: EdgePolicy,
}

/// Wire shape of [`Histogram`], checked before it becomes one.
#[derive(Deserialize)]
struct HistogramFields {
    bin_min_dbm: i32,
    bin_max_dbm: i32,
    bin_size_db: i32,
    counts: Vec<u32>,
    underflow_count: u32,
    overflow_count: u32,
    #[serde(default)]
    edge_policy: EdgePolicy,
}

impl TryFrom<HistogramFields> for Histogram {
    type Error = SurveyError;

    fn try_from(fields: HistogramFields) -> SurveyResult<Self> {
        let hist = Self {
            bin_min_dbm: fields.bin_min_dbm,
            bin_max_dbm: fields.bin_max_dbm,
            bin_size_db: fields.bin_size_db,
            counts: fields.counts,
            underflow_count: fields.underflow_count,
            overflow_count: fields.overflow_count,
            edge_policy: fields.edge_policy,
        };
        hist.check_shape()?;
        Ok(hist)
    }
}

impl Histogram {
    /// An all-zero histogram for `spec`.
    pub fn empty(spec: &HistogramSpec) -> SurveyResult<Self> {
        spec.validate()?;
        Ok(Self {
            bin_min_dbm: spec.bin_min_dbm,
            bin_max_dbm: spec.bin_max_dbm,
            bin_size_db: spec.bin_size_db,
            counts: vec![0; spec.bin_count()],
            underflow_count: 0,
            overflow_count: 0,
            edge_policy: spec.edge_policy,
        })
    }

    /// Build a histogram from non-gap readings.
    pub fn build(readings: &[i32], spec: &HistogramSpec) -> SurveyResult<Self> {
        let mut hist = Self::empty(spec)?;
        for &v in readings {
            hist.add(v)?;
        }
        Ok(hist)
    }

    /// Fail unless the bin parameters are valid and `counts` has exactly
    /// one entry per bin.
    pub fn check_shape(&self) -> SurveyResult<()> {
        let spec = self.spec();
        spec.validate()?;
        if self.counts.len() != spec.bin_count() {
            return Err(SurveyError::invalid_histogram(format!(
                "{} counts for {} bins",
                self.counts.len(),
                spec.bin_count()
            )));
        }
        Ok(())
    }

    /// The bin parameters of this histogram.
    pub fn spec(&self) -> HistogramSpec {
        HistogramSpec {
            bin_min_dbm: self.bin_min_dbm,
            bin_max_dbm: self.bin_max_dbm,
            bin_size_db: self.bin_size_db,
            edge_policy: self.edge_policy,
        }
    }

    /// Classify one more reading.
    ///
    /// Fails without counting anything if `counts` no longer matches the
    /// bin parameters.
    pub fn add(&mut self, value: i32) -> SurveyResult<()> {
        match self.spec().classify(value) {
            Slot::Underflow => self.underflow_count += 1,
            Slot::Overflow => self.overflow_count += 1,
            Slot::Bin(idx) => {
                let bins = self.counts.len();
                let count = self.counts.get_mut(idx).ok_or_else(|| {
                    SurveyError::invalid_histogram(format!("bin {idx} missing from {bins} counts"))
                })?;
                *count += 1;
            }
        }
        Ok(())
    }

    /// Total number of classified readings, including under/overflow.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum::<u64>()
            + u64::from(self.underflow_count)
            + u64::from(self.overflow_count)
    }

    /// Lower edge of bin `idx` in dBm.
    pub fn bin_lower_edge(&self, idx: usize) -> i32 {
        self.bin_min_dbm + idx as i32 * self.bin_size_db
    }

    /// Accumulate another histogram with identical binning.
    pub fn merge(&mut self, other: &Histogram) -> SurveyResult<()> {
        if self.spec() != other.spec() {
            return Err(SurveyError::invalid_histogram(
                "cannot merge histograms with different binning",
            ));
        }
        self.check_shape()?;
        other.check_shape()?;
        for (dst, src) in self.counts.iter_mut().zip(&other.counts) {
            *dst += src;
        }
        self.underflow_count += other.underflow_count;
        self.overflow_count += other.overflow_count;
        Ok(())
    }

    /// Approximate quantile from binned data only, as a bin lower edge.
    ///
    /// Underflow and overflow are ignored. Returns `None` when no bin holds a
    /// reading.
    pub fn quantile_dbm(&self, q: f64) -> Option<i32> {
        let in_range: u64 = self.counts.iter().map(|&c| u64::from(c)).sum();
        if in_range == 0 {
            return None;
        }
        let target = ((in_range - 1) as f64 * q.clamp(0.0, 1.0)) as u64;
        let mut cumulative = 0u64;
        for (idx, &c) in self.counts.iter().enumerate() {
            cumulative += u64::from(c);
            if cumulative > target {
                return Some(self.bin_lower_edge(idx));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_readings_land_in_own_bins() {
        let hist = Histogram::build(&[-72, -71, -70, -69], &HistogramSpec::default()).unwrap();
        assert_eq!(hist.counts.len(), 70);
        assert_eq!(hist.underflow_count, 0);
        assert_eq!(hist.overflow_count, 0);
        for v in [-72, -71, -70, -69] {
            assert_eq!(hist.counts[(v + 100) as usize], 1, "bin for {v}");
        }
        assert_eq!(hist.counts.iter().sum::<u32>(), 4);
    }

    #[test]
    fn left_inclusive_edges() {
        let spec = HistogramSpec::new(-100, -30, 5);
        let hist = Histogram::build(&[-100, -95, -31, -30, -101], &spec).unwrap();
        assert_eq!(hist.counts.len(), 14);
        assert_eq!(hist.counts[0], 1); // -100
        assert_eq!(hist.counts[1], 1); // -95 on lower edge of bin 1
        assert_eq!(hist.counts[13], 1); // -31
        assert_eq!(hist.overflow_count, 1); // -30 == max
        assert_eq!(hist.underflow_count, 1); // -101
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn right_inclusive_edges() {
        let spec = HistogramSpec::new(-100, -30, 5).with_edge_policy(EdgePolicy::RightInclusive);
        let hist = Histogram::build(&[-100, -95, -94, -30, -29], &spec).unwrap();
        assert_eq!(hist.underflow_count, 1); // -100 == min
        assert_eq!(hist.counts[0], 1); // -95 on upper edge of bin 0
        assert_eq!(hist.counts[1], 1); // -94
        assert_eq!(hist.counts[13], 1); // -30 == max
        assert_eq!(hist.overflow_count, 1); // -29
    }

    #[test]
    fn rejects_bad_params() {
        assert!(HistogramSpec::new(-100, -30, 0).validate().is_err());
        assert!(HistogramSpec::new(-30, -100, 1).validate().is_err());
        assert!(HistogramSpec::new(-100, -30, 3).validate().is_err());
        assert!(Histogram::build(&[-50], &HistogramSpec::new(-100, -30, 3)).is_err());
    }

    #[test]
    fn merge_requires_same_binning() {
        let spec = HistogramSpec::default();
        let mut a = Histogram::build(&[-70, -120], &spec).unwrap();
        let b = Histogram::build(&[-70, -10], &spec).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.counts[30], 2);
        assert_eq!(a.underflow_count, 1);
        assert_eq!(a.overflow_count, 1);

        let other = Histogram::build(&[-70], &HistogramSpec::new(-100, -30, 2)).unwrap();
        assert!(a.merge(&other).is_err());
    }

    #[test]
    fn decoding_rejects_wrong_bin_count() {
        let full = Histogram::build(&[-70], &HistogramSpec::default()).unwrap();
        let mut value = serde_json::to_value(&full).unwrap();
        value["counts"] = serde_json::json!([0, 0]);
        let err = serde_json::from_value::<Histogram>(value).unwrap_err();
        assert!(err.to_string().contains("2 counts for 70 bins"), "{err}");

        let decoded: Histogram =
            serde_json::from_value(serde_json::to_value(&full).unwrap()).unwrap();
        assert_eq!(decoded, full);

        let mut bad_spec = serde_json::to_value(&full).unwrap();
        bad_spec["bin_size_db"] = serde_json::json!(0);
        assert!(serde_json::from_value::<Histogram>(bad_spec).is_err());
    }

    #[test]
    fn truncated_counts_fail_instead_of_panicking() {
        let full = Histogram::build(&[-70], &HistogramSpec::default()).unwrap();
        let mut short = Histogram::empty(&HistogramSpec::default()).unwrap();
        short.counts.truncate(2);

        assert!(matches!(short.add(-70), Err(SurveyError::InvalidHistogram { .. })));
        assert_eq!(short.total(), 0);
        assert!(matches!(short.merge(&full), Err(SurveyError::InvalidHistogram { .. })));
        assert_eq!(short.total(), 0);

        let mut whole = full.clone();
        assert!(whole.merge(&short).is_err());
        assert_eq!(whole, full);
    }

    #[test]
    fn binned_quantiles() {
        let hist =
            Histogram::build(&[-80, -70, -70, -60, -50], &HistogramSpec::default()).unwrap();
        assert_eq!(hist.quantile_dbm(0.5), Some(-70));
        assert_eq!(hist.quantile_dbm(0.0), Some(-80));
        assert_eq!(hist.quantile_dbm(1.0), Some(-50));
        let empty = Histogram::empty(&HistogramSpec::default()).unwrap();
        assert_eq!(empty.quantile_dbm(0.5), None);
    }
}
