//! Device pose captured at record-build time.
//!
//! A pose is either the simple height/facing pair used for 2D map surveys or
//! a full position + quaternion from the tracking subsystem.

use serde::{Deserialize, Serialize};

/// Full 6-DOF pose in tracking-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialPose {
    /// Position X (meters).
    pub x: f32,
    /// Position Y (meters).
    pub y: f32,
    /// Position Z (meters).
    pub z: f32,
    /// Quaternion X.
    pub qx: f32,
    /// Quaternion Y.
    pub qy: f32,
    /// Quaternion Z.
    pub qz: f32,
    /// Quaternion W.
    pub qw: f32,
}

impl SpatialPose {
    /// No translation, no rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        qx: 0.0,
        qy: 0.0,
        qz: 0.0,
        qw: 1.0,
    };
}

/// A spatial pose stamped with its offset into the collection window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Milliseconds since the start of the window.
    pub offset_ms: u64,
    /// The pose at that instant.
    pub pose: SpatialPose,
}

/// Device pose attached to a survey record. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DevicePose {
    /// 2D map context.
    Planar {
        /// Device height above the floor (meters).
        height_m: Option<f64>,
        /// Facing, 0-360 degrees clockwise from north.
        facing_deg: Option<f64>,
    },
    /// 3D survey context.
    Spatial(SpatialPose),
}

impl DevicePose {
    /// Planar pose from optional height and facing; facing is normalised.
    pub fn planar(height_m: Option<f64>, facing_deg: Option<f64>) -> Self {
        Self::Planar {
            height_m,
            facing_deg: facing_deg.map(normalize_heading_deg),
        }
    }

    /// Device height used for vertical deltas, when known.
    pub fn height_m(&self) -> Option<f64> {
        match self {
            Self::Planar { height_m, .. } => *height_m,
            Self::Spatial(_) => None,
        }
    }

    /// Facing in degrees, when known.
    pub fn facing_deg(&self) -> Option<f64> {
        match self {
            Self::Planar { facing_deg, .. } => *facing_deg,
            Self::Spatial(_) => None,
        }
    }
}

impl Default for DevicePose {
    fn default() -> Self {
        Self::Planar {
            height_m: None,
            facing_deg: None,
        }
    }
}

/// Wrap a heading into `[0, 360)`.
pub fn normalize_heading_deg(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Facing captured at scan start: fused compass heading plus the location's
/// north offset and fine-tune, wrapped into `[0, 360)`.
pub fn capture_facing_deg(fused_heading_deg: f64, north_offset_deg: f64, fine_tune_deg: f64) -> f64 {
    normalize_heading_deg(fused_heading_deg + north_offset_deg + fine_tune_deg)
}
