//! Distance kit: pixel/metric planar distance and elevation-aware 3D distance.
//!
//! Every function here returns full precision. Rounding to two decimals is
//! done once, by the record assembler, when a [`DistanceResult`] is built.

use serde::{Deserialize, Serialize};

use crate::domain::rounding::{round_half_up, DISTANCE_PLACES};
use crate::error::{SurveyError, SurveyResult};

/// Floor applied to pixels-per-meter before dividing.
pub const MIN_PIXELS_PER_METER: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Point2 -- Value Object
// ---------------------------------------------------------------------------

/// A point in map pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    /// Horizontal pixel coordinate.
    pub x: f64,
    /// Vertical pixel coordinate.
    pub y: f64,
}

impl Point2 {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// BeaconGeometry -- Value Object
// ---------------------------------------------------------------------------

/// Where a beacon sits on the map, as owned by the calibration subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BeaconGeometry {
    /// Beacon position in map pixels.
    pub position_px: Point2,
    /// Mounting height above the floor (meters), when surveyed.
    pub elevation_m: Option<f64>,
}

impl BeaconGeometry {
    /// Create geometry from a pixel position and optional elevation.
    pub fn new(position_px: Point2, elevation_m: Option<f64>) -> Self {
        Self {
            position_px,
            elevation_m,
        }
    }
}

// ---------------------------------------------------------------------------
// Pure functions
// ---------------------------------------------------------------------------

/// Euclidean distance between two pixel points.
pub fn planar_pixel_distance(a: Point2, b: Point2) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Planar distance in meters; the scale is floored at
/// [`MIN_PIXELS_PER_METER`].
pub fn planar_metric_distance(a: Point2, b: Point2, pixels_per_meter: f64) -> f64 {
    planar_pixel_distance(a, b) / pixels_per_meter.max(MIN_PIXELS_PER_METER)
}

/// 3D distance in pixels: the vertical delta is converted with the map scale.
pub fn combined_distance_pixels(planar_px: f64, vertical_delta_m: f64, pixels_per_meter: f64) -> f64 {
    planar_px.hypot(vertical_delta_m * pixels_per_meter)
}

/// 3D distance in meters.
pub fn combined_distance_metric(planar_m: f64, vertical_delta_m: f64) -> f64 {
    planar_m.hypot(vertical_delta_m)
}

/// `beacon_elevation - device_height`; positive when the beacon is above.
pub fn vertical_delta(beacon_elevation_m: f64, device_height_m: f64) -> f64 {
    beacon_elevation_m - device_height_m
}

/// Returns the scale when it can be divided by, or
/// [`SurveyError::DegenerateScale`] otherwise.
pub fn usable_scale(pixels_per_meter: Option<f64>) -> SurveyResult<f64> {
    match pixels_per_meter {
        Some(ppm) if ppm.is_finite() && ppm > 0.0 => Ok(ppm),
        other => Err(SurveyError::DegenerateScale {
            pixels_per_meter: other,
        }),
    }
}

// ---------------------------------------------------------------------------
// DistanceResult -- Value Object
// ---------------------------------------------------------------------------

/// Device-to-beacon distances, rounded to two decimals when created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    /// Planar distance in pixels.
    pub planar_px: f64,
    /// Planar distance in meters.
    pub planar_m: f64,
    /// 3D distance in pixels.
    pub xyz_px: f64,
    /// 3D distance in meters.
    pub xyz_m: f64,
}

impl DistanceResult {
    /// Compute and round the distances between a device and a beacon.
    ///
    /// A missing beacon elevation or device height counts as 0 m. Fails with
    /// [`SurveyError::DegenerateScale`] when the scale is unusable.
    pub fn between(
        device_px: Point2,
        device_height_m: Option<f64>,
        beacon: &BeaconGeometry,
        pixels_per_meter: Option<f64>,
    ) -> SurveyResult<Self> {
        let ppm = usable_scale(pixels_per_meter)?;

        let planar_px = planar_pixel_distance(device_px, beacon.position_px);
        let planar_m = planar_metric_distance(device_px, beacon.position_px, ppm);
        let dz_m = vertical_delta(
            beacon.elevation_m.unwrap_or(0.0),
            device_height_m.unwrap_or(0.0),
        );

        Ok(Self {
            planar_px: round_half_up(planar_px, DISTANCE_PLACES),
            planar_m: round_half_up(planar_m, DISTANCE_PLACES),
            xyz_px: round_half_up(combined_distance_pixels(planar_px, dz_m, ppm), DISTANCE_PLACES),
            xyz_m: round_half_up(combined_distance_metric(planar_m, dz_m), DISTANCE_PLACES),
        })
    }
}
