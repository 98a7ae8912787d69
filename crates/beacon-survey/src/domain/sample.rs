//! Per-beacon sample buffer for one collection window.
//!
//! A signal value of `0` dBm is a gap marker ("no detection during this
//! interval"), not a reading. Gap markers stay in the stored sequence so the
//! timeline keeps its shape, but are excluded from every statistic.

use serde::{Deserialize, Serialize};

/// Signal value reserved for gap markers.
pub const GAP_DBM: i32 = 0;

// ---------------------------------------------------------------------------
// Sample -- Value Object
// ---------------------------------------------------------------------------

/// One timestamped signal-strength reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the start of the collection window.
    pub offset_ms: u64,
    /// Received signal strength in dBm, or [`GAP_DBM`] for a gap marker.
    pub signal_dbm: i32,
}

impl Sample {
    /// A real reading.
    pub fn new(offset_ms: u64, signal_dbm: i32) -> Self {
        Self {
            offset_ms,
            signal_dbm,
        }
    }

    /// A gap marker at `offset_ms`.
    pub fn gap(offset_ms: u64) -> Self {
        Self::new(offset_ms, GAP_DBM)
    }

    /// Whether this sample is a gap marker.
    pub fn is_gap(&self) -> bool {
        self.signal_dbm == GAP_DBM
    }
}

// ---------------------------------------------------------------------------
// SampleBuffer -- Entity
// ---------------------------------------------------------------------------

/// Time-ordered samples of a single beacon during one collection window.
///
/// Readings may arrive out of order from the scanning side; [`push`] inserts
/// each one after every sample with an offset less than or equal to its own,
/// so the buffer is always sorted by offset and equal offsets keep arrival
/// order.
///
/// [`push`]: SampleBuffer::push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that starts with a gap marker at 0 ms.
    pub fn with_opening_marker() -> Self {
        Self {
            samples: vec![Sample::gap(0)],
        }
    }

    /// Build a buffer from arbitrary samples, sorting them by offset.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut samples: Vec<Sample> = samples.into_iter().collect();
        samples.sort_by_key(|s| s.offset_ms);
        Self { samples }
    }

    /// Record a reading (or a gap, if `signal_dbm` is 0).
    pub fn push(&mut self, offset_ms: u64, signal_dbm: i32) {
        self.insert(Sample::new(offset_ms, signal_dbm));
    }

    /// Record a gap marker.
    pub fn push_gap(&mut self, offset_ms: u64) {
        self.insert(Sample::gap(offset_ms));
    }

    /// Append the closing gap marker of the window.
    pub fn close(&mut self, offset_ms: u64) {
        self.push_gap(offset_ms);
    }

    fn insert(&mut self, sample: Sample) {
        let idx = self
            .samples
            .partition_point(|s| s.offset_ms <= sample.offset_ms);
        self.samples.insert(idx, sample);
    }

    /// All samples including gap markers, in time order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Non-gap signal values in time order.
    pub fn readings(&self) -> impl Iterator<Item = i32> + '_ {
        self.samples
            .iter()
            .filter(|s| !s.is_gap())
            .map(|s| s.signal_dbm)
    }

    /// Number of non-gap samples.
    pub fn non_gap_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_gap()).count()
    }

    /// Whether the beacon was seen at least once.
    pub fn is_detected(&self) -> bool {
        self.samples.iter().any(|s| !s.is_gap())
    }

    /// Time between the first and last sample, gaps included.
    pub fn span_ms(&self) -> u64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.offset_ms - first.offset_ms,
            _ => 0,
        }
    }

    /// Total number of samples including gap markers.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the buffer, returning the stored sequence.
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
