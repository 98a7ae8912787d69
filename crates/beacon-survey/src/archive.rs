//! Per-location archive of immutable survey records.
//!
//! Records are written exactly once, under
//! `locations/<location>/scans/<YYYY-MM>/<record_id>.json`, where the month
//! is taken from the record's start time.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::codec;
use crate::domain::location::LocationId;
use crate::domain::record::SurveyRecord;
use crate::error::{SurveyError, SurveyResult};
use crate::port::BlobStore;

/// Month bucket used when a record's start time cannot be parsed.
const UNDATED_BUCKET: &str = "undated";

/// Write-once storage of [`SurveyRecord`]s.
#[derive(Debug)]
pub struct ScanArchive<S: BlobStore> {
    blobs: S,
}

impl<S: BlobStore> ScanArchive<S> {
    /// Archive on top of `blobs`.
    pub fn new(blobs: S) -> Self {
        Self { blobs }
    }

    /// Blob key a record is archived under.
    pub fn key_for(record: &SurveyRecord) -> SurveyResult<String> {
        let location = LocationId::new(record.location_id.clone())?;
        let bucket = DateTime::parse_from_rfc3339(&record.timing.start_iso)
            .map(|t| t.with_timezone(&Utc).format("%Y-%m").to_string())
            .unwrap_or_else(|_| UNDATED_BUCKET.to_string());
        Ok(format!(
            "{}{bucket}/{}.json",
            location.scans_prefix(),
            record.record_id
        ))
    }

    /// Store `record` and return the key written.
    ///
    /// A second write of the same record fails with
    /// [`SurveyError::PersistenceUnavailable`] wrapping
    /// [`StorageError::AlreadyExists`](crate::error::StorageError::AlreadyExists).
    pub fn write(&self, record: &SurveyRecord) -> SurveyResult<String> {
        let key = Self::key_for(record)?;
        let bytes = codec::encode(record)?;
        self.blobs
            .write_new(&key, &bytes)
            .map_err(|e| SurveyError::not_applied(key.clone(), e))?;
        info!(
            key = %key,
            point_id = %record.point_id,
            beacons = record.beacons.len(),
            "survey record archived"
        );
        Ok(key)
    }

    /// Read one archived record.
    pub fn read(&self, key: &str) -> SurveyResult<Option<SurveyRecord>> {
        match self.blobs.read(key) {
            Ok(Some(bytes)) => Ok(Some(codec::decode(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(SurveyError::load_failed(key, e)),
        }
    }

    /// Keys of every record archived for `location`, oldest month first.
    pub fn list(&self, location: &LocationId) -> SurveyResult<Vec<String>> {
        let prefix = location.scans_prefix();
        let mut keys = self
            .blobs
            .list(&prefix)
            .map_err(|e| SurveyError::load_failed(prefix.clone(), e))?;
        keys.retain(|k| k.ends_with(".json"));
        Ok(keys)
    }

    /// All records taken at `point_id`, sorted by start time ascending.
    pub fn history(&self, location: &LocationId, point_id: &str) -> SurveyResult<Vec<SurveyRecord>> {
        let mut records = Vec::new();
        for key in self.list(location)? {
            if let Some(record) = self.read(&key)? {
                if record.point_id == point_id {
                    records.push(record);
                }
            }
        }
        records.sort_by(|a, b| start_time(a).cmp(&start_time(b)));
        debug!(%location, point_id, records = records.len(), "point history loaded");
        Ok(records)
    }
}

/// Parsed start time; unparsable timestamps sort first.
fn start_time(record: &SurveyRecord) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&record.timing.start_iso)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
