//! Error types for the beacon survey engine.
//!
//! All fallible operations in the crate return [`SurveyResult`]. Lower-level
//! concerns carry their own types ([`StorageError`] for the blob-store
//! boundary, [`ConfigError`] for configuration loading) which convert into
//! [`SurveyError`] via [`From`].
//!
//! ## Hierarchy
//!
//! ```text
//! SurveyError (top-level)
//! ├── StorageError  (blob read / write / list at the persistence boundary)
//! └── ConfigError   (config validation / file loading)
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Convenient `Result` alias used throughout the crate.
pub type SurveyResult<T> = Result<T, SurveyError>;

// ---------------------------------------------------------------------------
// SurveyError
// ---------------------------------------------------------------------------

/// Top-level error type for fingerprinting, assembly and aggregation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurveyError {
    /// A beacon had no non-gap readings in the collection window.
    ///
    /// The assembler recovers from this locally by omitting the beacon.
    #[error("insufficient samples: no non-gap readings")]
    InsufficientSamples,

    /// Pixels-per-meter is zero, negative, non-finite or absent.
    ///
    /// The assembler recovers from this locally by omitting distances.
    #[error("degenerate map scale: {pixels_per_meter:?} px/m")]
    DegenerateScale {
        /// The offending scale, `None` when no scale was supplied.
        pixels_per_meter: Option<f64>,
    },

    /// Histogram bin parameters do not describe a whole number of bins.
    #[error("invalid histogram parameters: {reason}")]
    InvalidHistogram {
        /// Why the parameters were rejected.
        reason: String,
    },

    /// The collection window timing is inconsistent.
    #[error("invalid collection window: {reason}")]
    InvalidWindow {
        /// Why the window was rejected.
        reason: String,
    },

    /// A map coordinate is NaN or infinite and cannot be keyed or persisted.
    #[error("invalid coordinate ({x_m}, {y_m}): components must be finite")]
    InvalidCoordinate {
        /// X component (meters).
        x_m: f64,
        /// Y component (meters).
        y_m: f64,
    },

    /// A loaded or imported point's stored key disagrees with the key derived
    /// from its coordinates.
    #[error("coordinate key mismatch: stored '{stored}', derived '{derived}'")]
    CoordinateKeyMismatch {
        /// Key carried by the data.
        stored: String,
        /// Key recomputed from `(map_x_m, map_y_m)`.
        derived: String,
    },

    /// A store operation was attempted while no location is loaded.
    #[error("no active location loaded")]
    NoActiveLocation,

    /// A location identifier cannot be used as a storage namespace.
    #[error("invalid location id '{id}': {reason}")]
    InvalidLocationId {
        /// The rejected identifier.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The persistence boundary could not be read or written.
    ///
    /// When `applied_in_memory` is `true` the in-memory mapping already
    /// reflects the mutation and only the write failed.
    #[error("persistence unavailable for '{key}' (applied in memory: {applied_in_memory}): {source}")]
    PersistenceUnavailable {
        /// Blob key being read or written.
        key: String,
        /// Whether the triggering mutation was applied in memory.
        applied_in_memory: bool,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// JSON encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SurveyError {
    /// Construct a [`SurveyError::InvalidHistogram`].
    pub fn invalid_histogram(reason: impl Into<String>) -> Self {
        Self::InvalidHistogram {
            reason: reason.into(),
        }
    }

    /// Fail with [`SurveyError::InvalidCoordinate`] unless both components
    /// are finite.
    pub fn check_coordinate(x_m: f64, y_m: f64) -> SurveyResult<()> {
        if x_m.is_finite() && y_m.is_finite() {
            Ok(())
        } else {
            Err(Self::InvalidCoordinate { x_m, y_m })
        }
    }

    /// Construct a [`SurveyError::InvalidWindow`].
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            reason: reason.into(),
        }
    }

    /// Wrap a storage failure that happened while loading.
    pub fn load_failed(key: impl Into<String>, source: StorageError) -> Self {
        Self::not_applied(key, source)
    }

    /// Wrap a storage failure of an operation with no in-memory effect.
    pub fn not_applied(key: impl Into<String>, source: StorageError) -> Self {
        Self::PersistenceUnavailable {
            key: key.into(),
            applied_in_memory: false,
            source,
        }
    }

    /// Wrap a storage failure that happened after an in-memory mutation.
    pub fn save_failed(key: impl Into<String>, source: StorageError) -> Self {
        Self::PersistenceUnavailable {
            key: key.into(),
            applied_in_memory: true,
            source,
        }
    }

    /// Returns `true` when the in-memory state reflects the failed operation.
    #[must_use]
    pub fn applied_in_memory(&self) -> bool {
        matches!(
            self,
            Self::PersistenceUnavailable {
                applied_in_memory: true,
                ..
            }
        )
    }

    /// Returns `true` if retrying or degrading gracefully is reasonable.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientSamples | Self::DegenerateScale { .. } => true,
            Self::PersistenceUnavailable { source, .. } => source.is_recoverable(),
            Self::InvalidHistogram { .. }
            | Self::InvalidWindow { .. }
            | Self::InvalidCoordinate { .. }
            | Self::CoordinateKeyMismatch { .. }
            | Self::NoActiveLocation
            | Self::InvalidLocationId { .. }
            | Self::Codec(_)
            | Self::Config(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors raised by [`BlobStore`](crate::port::BlobStore) adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("I/O error on '{key}': {source}")]
    Io {
        /// Blob key being accessed.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be mapped onto the backing store.
    #[error("invalid blob key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A create-once write found an existing blob.
    #[error("blob '{key}' already exists")]
    AlreadyExists {
        /// The occupied key.
        key: String,
    },
}

impl StorageError {
    /// Construct a [`StorageError::InvalidKey`].
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is transient.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. } => true,
            Self::InvalidKey { .. } | Self::AlreadyExists { .. } => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a
/// [`SurveyConfig`](crate::config::SurveyConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has a value outside its allowed range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Why the value is invalid.
        reason: String,
    },

    /// The config file could not be read or written.
    #[error("failed to access config file {path:?}: {source}")]
    FileRead {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
