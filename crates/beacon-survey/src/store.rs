//! Survey point aggregation store.
//!
//! Indexes survey sessions by coordinate key for the active location and
//! persists the whole mapping after every mutation.
//!
//! # State machine
//!
//! ```text
//! Unloaded --set_active_location--> Loaded(mapping) --deactivate--> Unloaded
//!                                    |      ^
//!                                    +------+  set_active_location(other)
//! ```
//!
//! Switching locations never saves the outgoing mapping; every mutation has
//! already been written. A failed load leaves the store unloaded.
//!
//! # Concurrency
//!
//! A single mutex guards `{location, mapping}` and is held across
//! mutate-then-persist, so two mutations can never interleave with each
//! other or with a load.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec;
use crate::domain::location::LocationId;
use crate::domain::record::SurveySession;
use crate::domain::survey_point::{make_key, SurveyPoint};
use crate::error::{SurveyError, SurveyResult};
use crate::port::BlobStore;

/// Schema tag of the persisted mapping document.
pub const POINTS_SCHEMA: &str = "beacon-survey.points.v1";

/// Persisted form of a location's mapping: points sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPointsDocument {
    /// Always [`POINTS_SCHEMA`].
    pub schema: String,
    /// Points in ascending key order.
    pub points: Vec<SurveyPoint>,
}

/// Outcome of [`SurveyPointStore::import_merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Points that did not exist locally before the import.
    pub points_added: usize,
    /// Sessions appended, including those of new points.
    pub sessions_added: usize,
}

#[derive(Debug, Default)]
struct StoreState {
    location: Option<LocationId>,
    points: BTreeMap<String, SurveyPoint>,
}

impl StoreState {
    fn loaded(&mut self) -> SurveyResult<(&LocationId, &mut BTreeMap<String, SurveyPoint>)> {
        match &self.location {
            Some(location) => Ok((location, &mut self.points)),
            None => Err(SurveyError::NoActiveLocation),
        }
    }

    fn unload(&mut self) {
        self.location = None;
        self.points.clear();
    }
}

/// Verify every point's key and index them, failing on the first mismatch.
fn index_points(points: Vec<SurveyPoint>) -> SurveyResult<BTreeMap<String, SurveyPoint>> {
    let mut index: BTreeMap<String, SurveyPoint> = BTreeMap::new();
    for point in points {
        point.verify_key()?;
        match index.get_mut(&point.coordinate_key) {
            Some(existing) => {
                existing.merge_sessions(point.sessions);
            }
            None => {
                index.insert(point.coordinate_key.clone(), point);
            }
        }
    }
    Ok(index)
}

// ---------------------------------------------------------------------------
// SurveyPointStore
// ---------------------------------------------------------------------------

/// Coordinate-keyed survey aggregation for one active location at a time.
#[derive(Debug)]
pub struct SurveyPointStore<S: BlobStore> {
    blobs: S,
    state: Mutex<StoreState>,
}

impl<S: BlobStore> SurveyPointStore<S> {
    /// Create an unloaded store on top of `blobs`.
    pub fn new(blobs: S) -> Self {
        Self {
            blobs,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// The underlying blob store.
    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    /// Currently loaded location, if any.
    pub fn active_location(&self) -> Option<LocationId> {
        self.state.lock().location.clone()
    }

    /// Replace the in-memory mapping with the persisted state of `location`.
    ///
    /// A location with nothing persisted loads as an empty mapping. Returns
    /// the number of points loaded.
    ///
    /// # Errors
    ///
    /// - [`SurveyError::PersistenceUnavailable`] if the blob cannot be read.
    /// - [`SurveyError::Codec`] if it cannot be decoded.
    /// - [`SurveyError::CoordinateKeyMismatch`] if a stored point's key does
    ///   not match its coordinates.
    ///
    /// On error the store is left unloaded.
    pub fn set_active_location(&self, location: LocationId) -> SurveyResult<usize> {
        let mut state = self.state.lock();
        state.unload();

        let key = location.survey_points_key();
        let points = match self.blobs.read(&key) {
            Ok(Some(bytes)) => {
                let doc: SurveyPointsDocument = codec::decode(&bytes)?;
                index_points(doc.points)?
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(%location, error = %e, "failed to load survey points");
                return Err(SurveyError::load_failed(key, e));
            }
        };

        let count = points.len();
        info!(%location, points = count, "survey point location loaded");
        state.location = Some(location);
        state.points = points;
        Ok(count)
    }

    /// Drop the in-memory mapping without saving. Returns the location that
    /// was loaded.
    pub fn deactivate(&self) -> Option<LocationId> {
        let mut state = self.state.lock();
        let previous = state.location.take();
        state.points.clear();
        if let Some(location) = &previous {
            debug!(%location, "survey point location unloaded");
        }
        previous
    }

    /// Append `session` to the point at `(x_m, y_m)`, creating the point on
    /// first use. Returns the coordinate key.
    ///
    /// # Errors
    ///
    /// [`SurveyError::InvalidCoordinate`] if either component is NaN or
    /// infinite; nothing is changed.
    pub fn add_session(&self, session: SurveySession, x_m: f64, y_m: f64) -> SurveyResult<String> {
        let mut state = self.state.lock();
        let (location, points) = state.loaded()?;
        SurveyError::check_coordinate(x_m, y_m)?;

        let key = make_key(x_m, y_m);
        let session_id = session.session_id.clone();
        let sessions = match points.get_mut(&key) {
            Some(point) => {
                point.push_session(session);
                point.sessions.len()
            }
            None => {
                points.insert(key.clone(), SurveyPoint::new(x_m, y_m, session));
                1
            }
        };
        info!(%location, key = %key, session_id = %session_id, sessions, "survey session added");

        self.persist(&state)?;
        Ok(key)
    }

    /// Remove a session from the point at `key`; the point goes with its last
    /// session. Returns whether anything was removed.
    pub fn remove_session(&self, key: &str, session_id: &str) -> SurveyResult<bool> {
        let mut state = self.state.lock();
        let (location, points) = state.loaded()?;

        let Some(point) = points.get_mut(key) else {
            debug!(%location, key, "remove_session: no such point");
            return Ok(false);
        };
        if !point.remove_session(session_id) {
            debug!(%location, key, session_id, "remove_session: no such session");
            return Ok(false);
        }
        if point.sessions.is_empty() {
            points.remove(key);
            info!(%location, key, session_id, "last session removed, point dropped");
        } else {
            info!(%location, key, session_id, "survey session removed");
        }

        self.persist(&state)?;
        Ok(true)
    }

    /// Remove the point at `key` with all its sessions.
    pub fn remove_point(&self, key: &str) -> SurveyResult<bool> {
        let mut state = self.state.lock();
        let (location, points) = state.loaded()?;

        if points.remove(key).is_none() {
            return Ok(false);
        }
        info!(%location, key, "survey point removed");

        self.persist(&state)?;
        Ok(true)
    }

    /// Import points.
    ///
    /// With `merge`, incoming sessions are appended to existing points unless
    /// a session with the same ID is already there, and unknown points are
    /// inserted wholesale. Without `merge`, the mapping is replaced.
    ///
    /// Every incoming key is verified before anything changes, so a
    /// [`SurveyError::CoordinateKeyMismatch`] leaves the store untouched.
    pub fn import_merge(&self, incoming: Vec<SurveyPoint>, merge: bool) -> SurveyResult<ImportSummary> {
        let mut state = self.state.lock();
        let (location, points) = state.loaded()?;

        let incoming = index_points(incoming)?;
        let mut summary = ImportSummary::default();

        if merge {
            for (key, point) in incoming {
                match points.get_mut(&key) {
                    Some(local) => summary.sessions_added += local.merge_sessions(point.sessions),
                    None => {
                        summary.points_added += 1;
                        summary.sessions_added += point.sessions.len();
                        points.insert(key, point);
                    }
                }
            }
        } else {
            summary.points_added = incoming.len();
            summary.sessions_added = incoming.values().map(|p| p.sessions.len()).sum();
            *points = incoming;
        }
        info!(
            %location,
            merge,
            points_added = summary.points_added,
            sessions_added = summary.sessions_added,
            "survey points imported"
        );

        self.persist(&state)?;
        Ok(summary)
    }

    /// Decode a mapping document and import it.
    pub fn import_blob(&self, bytes: &[u8], merge: bool) -> SurveyResult<ImportSummary> {
        let doc: SurveyPointsDocument = codec::decode(bytes)?;
        self.import_merge(doc.points, merge)
    }

    /// All points in ascending key order.
    pub fn export_all(&self) -> SurveyResult<Vec<SurveyPoint>> {
        let mut state = self.state.lock();
        let (_, points) = state.loaded()?;
        Ok(points.values().cloned().collect())
    }

    /// Encoded mapping document, as written to persistence.
    pub fn export_blob(&self) -> SurveyResult<Vec<u8>> {
        let points = self.export_all()?;
        codec::encode(&SurveyPointsDocument {
            schema: POINTS_SCHEMA.to_string(),
            points,
        })
    }

    /// Remove every point of the active location.
    pub fn clear_all(&self) -> SurveyResult<()> {
        let mut state = self.state.lock();
        let (location, points) = state.loaded()?;
        let removed = points.len();
        points.clear();
        info!(%location, removed, "survey points cleared");
        self.persist(&state)
    }

    /// Point stored under `key`.
    pub fn point(&self, key: &str) -> Option<SurveyPoint> {
        self.state.lock().points.get(key).cloned()
    }

    /// Point whose key `(x_m, y_m)` rounds to.
    pub fn point_at(&self, x_m: f64, y_m: f64) -> Option<SurveyPoint> {
        self.point(&make_key(x_m, y_m))
    }

    /// Number of points loaded.
    pub fn point_count(&self) -> usize {
        self.state.lock().points.len()
    }

    /// Number of sessions across all points.
    pub fn total_session_count(&self) -> usize {
        self.state
            .lock()
            .points
            .values()
            .map(|p| p.sessions.len())
            .sum()
    }

    /// Dwell time near `(x_m, y_m)`, each point weighted by
    /// `1 - distance / radius_m`. Points at or beyond the radius contribute
    /// nothing.
    pub fn weighted_dwell_near(&self, x_m: f64, y_m: f64, radius_m: f64) -> f64 {
        if radius_m.is_nan() || radius_m <= 0.0 {
            return 0.0;
        }
        self.state
            .lock()
            .points
            .values()
            .filter_map(|point| {
                let distance = point.distance_to(x_m, y_m);
                (distance < radius_m)
                    .then(|| (1.0 - distance / radius_m) * point.quality().total_dwell_s)
            })
            .sum()
    }

    /// Write the full mapping of the loaded location.
    fn persist(&self, state: &StoreState) -> SurveyResult<()> {
        let Some(location) = &state.location else {
            return Err(SurveyError::NoActiveLocation);
        };
        let key = location.survey_points_key();
        let bytes = codec::encode(&SurveyPointsDocument {
            schema: POINTS_SCHEMA.to_string(),
            points: state.points.values().cloned().collect(),
        })?;
        self.blobs.write(&key, &bytes).map_err(|e| {
            warn!(%location, key = %key, error = %e, "survey points not persisted");
            SurveyError::save_failed(key.clone(), e)
        })
    }
}
