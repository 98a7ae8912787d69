//! Survey engine configuration.
//!
//! [`SurveyConfig`] carries every tunable of the record assembler and the
//! quality grading. It is plain data: build it in code, or load it from a JSON
//! file with [`SurveyConfig::from_json`].
//!
//! ```rust
//! use beacon_survey::config::SurveyConfig;
//!
//! let cfg = SurveyConfig::default();
//! cfg.validate().expect("default config is valid");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::histogram::HistogramSpec;
use crate::domain::stats::EvenMedianRule;
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// QualityThresholds
// ---------------------------------------------------------------------------

/// Thresholds for scan summaries and survey point grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum non-gap readings for a beacon to enter a scan summary.
    pub min_samples: usize,
    /// Minimum readings per second for a beacon to enter a scan summary.
    pub min_packets_per_second: f64,
    /// Maximum number of beacons listed in a scan summary.
    pub top_beacons: usize,
    /// Dwell time at which a point leaves the red tier (seconds).
    pub yellow_dwell_s: f64,
    /// Dwell time at which a point reaches green or blue (seconds).
    pub green_dwell_s: f64,
    /// Covered compass sectors needed for the blue tier.
    pub min_covered_sectors: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_samples: 10,
            min_packets_per_second: 0.8,
            top_beacons: 6,
            yellow_dwell_s: 3.0,
            green_dwell_s: 9.0,
            min_covered_sectors: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// SurveyConfig
// ---------------------------------------------------------------------------

/// Complete configuration for record assembly and quality grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Histogram bins; `None` skips histograms entirely.
    pub histogram: Option<HistogramSpec>,
    /// Even-count median rule for the statistics reducer.
    pub even_median: EvenMedianRule,
    /// Summary and tier thresholds.
    pub quality: QualityThresholds,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            histogram: Some(HistogramSpec::default()),
            even_median: EvenMedianRule::AverageHalfUp,
            quality: QualityThresholds::default(),
        }
    }
}

impl SurveyConfig {
    /// Load configuration from a JSON file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileRead`] if the file cannot be read,
    /// [`ConfigError::InvalidValue`] if it is malformed or fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: SurveyConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::invalid_value("(file)", e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write this configuration as pretty JSON, creating parent directories.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(spec) = &self.histogram {
            spec.validate()
                .map_err(|e| ConfigError::invalid_value("histogram", e.to_string()))?;
        }

        let q = &self.quality;
        if q.top_beacons == 0 {
            return Err(ConfigError::invalid_value("quality.top_beacons", "must be > 0"));
        }
        if !q.min_packets_per_second.is_finite() || q.min_packets_per_second < 0.0 {
            return Err(ConfigError::invalid_value(
                "quality.min_packets_per_second",
                format!("must be finite and >= 0, got {}", q.min_packets_per_second),
            ));
        }
        if !(q.yellow_dwell_s.is_finite() && q.yellow_dwell_s >= 0.0) {
            return Err(ConfigError::invalid_value(
                "quality.yellow_dwell_s",
                "must be finite and >= 0",
            ));
        }
        if !(q.green_dwell_s.is_finite() && q.green_dwell_s >= q.yellow_dwell_s) {
            return Err(ConfigError::invalid_value(
                "quality.green_dwell_s",
                format!(
                    "must be finite and >= yellow_dwell_s ({}), got {}",
                    q.yellow_dwell_s, q.green_dwell_s
                ),
            ));
        }
        if q.min_covered_sectors > crate::domain::quality::SECTOR_COUNT {
            return Err(ConfigError::invalid_value(
                "quality.min_covered_sectors",
                format!(
                    "must be <= {}, got {}",
                    crate::domain::quality::SECTOR_COUNT,
                    q.min_covered_sectors
                ),
            ));
        }
        Ok(())
    }
}
