//! Coordinate keys and the survey point aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::quality::SurveyPointQuality;
use crate::domain::record::SurveySession;
use crate::domain::rounding::{round_half_up, DISTANCE_PLACES};
use crate::error::{SurveyError, SurveyResult};

// ---------------------------------------------------------------------------
// Coordinate keys
// ---------------------------------------------------------------------------

/// Derive the coordinate key `"X.XX,Y.XX"` for a map coordinate (meters).
///
/// Both components are rounded half-up to two decimals, so every coordinate
/// that rounds to the same pair yields the same string. Non-finite input gives
/// a string [`parse_key`] rejects; callers check with
/// [`SurveyError::check_coordinate`] first.
pub fn make_key(x_m: f64, y_m: f64) -> String {
    // Adding 0.0 turns -0.0 into 0.0 so "-0.00" never appears.
    let x = round_half_up(x_m, DISTANCE_PLACES) + 0.0;
    let y = round_half_up(y_m, DISTANCE_PLACES) + 0.0;
    format!("{x:.2},{y:.2}")
}

/// Split a coordinate key back into its components.
pub fn parse_key(key: &str) -> Option<(f64, f64)> {
    let (x, y) = key.split_once(',')?;
    let x: f64 = x.trim().parse().ok()?;
    let y: f64 = y.trim().parse().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

// ---------------------------------------------------------------------------
// SurveyPoint -- Aggregate Root
// ---------------------------------------------------------------------------

/// All sessions recorded at one coordinate key.
///
/// `coordinate_key` always equals `make_key(map_x_m, map_y_m)`; sessions are
/// kept in append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPoint {
    /// Deterministic key derived from the coordinates.
    pub coordinate_key: String,
    /// Map X (meters), two decimals.
    pub map_x_m: f64,
    /// Map Y (meters), two decimals.
    pub map_y_m: f64,
    /// Start time of the first session, ISO-8601.
    pub created_iso: String,
    /// Sessions in append order.
    pub sessions: Vec<SurveySession>,
}

impl SurveyPoint {
    /// Create a point from its first session.
    pub fn new(x_m: f64, y_m: f64, first: SurveySession) -> Self {
        let map_x_m = round_half_up(x_m, DISTANCE_PLACES) + 0.0;
        let map_y_m = round_half_up(y_m, DISTANCE_PLACES) + 0.0;
        Self {
            coordinate_key: make_key(map_x_m, map_y_m),
            map_x_m,
            map_y_m,
            created_iso: first.timing.start_iso.clone(),
            sessions: vec![first],
        }
    }

    /// Key recomputed from the stored coordinates.
    pub fn derived_key(&self) -> String {
        make_key(self.map_x_m, self.map_y_m)
    }

    /// Fail with [`SurveyError::CoordinateKeyMismatch`] if the stored key
    /// disagrees with the coordinates, or with
    /// [`SurveyError::InvalidCoordinate`] if they are not finite.
    pub fn verify_key(&self) -> SurveyResult<()> {
        SurveyError::check_coordinate(self.map_x_m, self.map_y_m)?;
        let derived = self.derived_key();
        if derived == self.coordinate_key {
            Ok(())
        } else {
            Err(SurveyError::CoordinateKeyMismatch {
                stored: self.coordinate_key.clone(),
                derived,
            })
        }
    }

    /// Whether a session with this ID is present.
    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|s| s.session_id == session_id)
    }

    /// Append a session at the end.
    pub fn push_session(&mut self, session: SurveySession) {
        self.sessions.push(session);
    }

    /// Remove every session with this ID; returns whether any was removed.
    pub fn remove_session(&mut self, session_id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.session_id != session_id);
        self.sessions.len() != before
    }

    /// Append the incoming sessions whose IDs are not present yet.
    ///
    /// Returns the number of sessions added.
    pub fn merge_sessions(&mut self, incoming: Vec<SurveySession>) -> usize {
        let mut added = 0;
        for session in incoming {
            if !self.has_session(&session.session_id) {
                self.sessions.push(session);
                added += 1;
            }
        }
        added
    }

    /// Dwell time and compass coverage over all sessions.
    pub fn quality(&self) -> SurveyPointQuality {
        SurveyPointQuality::from_sessions(&self.sessions)
    }

    /// Distance from `(x_m, y_m)` to this point.
    pub fn distance_to(&self, x_m: f64, y_m: f64) -> f64 {
        (self.map_x_m - x_m).hypot(self.map_y_m - y_m)
    }
}
