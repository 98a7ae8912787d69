//! Location identifiers and the blob keys namespaced under them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SurveyError, SurveyResult};

/// Maximum length of a location identifier.
const MAX_LOCATION_ID_LENGTH: usize = 256;

/// File name of a location's survey point mapping.
pub const SURVEY_POINTS_BLOB: &str = "survey-points.v1.json";

// ---------------------------------------------------------------------------
// LocationId -- Value Object
// ---------------------------------------------------------------------------

/// Identifier of a mapped location, usable as a storage namespace.
///
/// Restricted to ASCII alphanumerics, `-`, `_` and `.`, not starting with a
/// dot and at most 256 characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationId(String);

impl LocationId {
    /// Validate and wrap a location identifier.
    pub fn new(id: impl Into<String>) -> SurveyResult<Self> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("must not be empty".to_string())
        } else if id.len() > MAX_LOCATION_ID_LENGTH {
            Some(format!("longer than {MAX_LOCATION_ID_LENGTH} characters"))
        } else if id.starts_with('.') {
            Some("must not start with '.'".to_string())
        } else {
            id.chars()
                .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
                .map(|c| format!("invalid character '{c}'"))
        };
        match reason {
            Some(reason) => Err(SurveyError::InvalidLocationId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blob key prefix for everything stored under this location.
    pub fn prefix(&self) -> String {
        format!("locations/{}/", self.0)
    }

    /// Blob key of the survey point mapping.
    pub fn survey_points_key(&self) -> String {
        format!("{}{SURVEY_POINTS_BLOB}", self.prefix())
    }

    /// Blob key prefix of the scan record archive.
    pub fn scans_prefix(&self) -> String {
        format!("{}scans/", self.prefix())
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LocationId {
    type Error = SurveyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocationId> for String {
    fn from(id: LocationId) -> Self {
        id.0
    }
}

impl AsRef<str> for LocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
