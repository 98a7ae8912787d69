//! Fixed-precision rounding used at record and key boundaries.
//!
//! Every rounding in the crate is half-up toward positive infinity. The scaled
//! fraction is compared against one half with a small tolerance so that a
//! decimal literal such as `3.005`, whose binary value sits just below the
//! midpoint, rounds the way it is written.

/// Tolerance applied to the scaled fraction before the half-way comparison.
const HALF_TOLERANCE: f64 = 1e-9;

/// Decimal places used for distances and map coordinates.
pub const DISTANCE_PLACES: i32 = 2;

/// Decimal places used for collection-window durations.
pub const DURATION_PLACES: i32 = 3;

/// Round `value` to `places` decimals, halves toward positive infinity.
///
/// Non-finite values are returned unchanged.
#[must_use]
pub fn round_half_up(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    let floor = scaled.floor();
    let rounded = if scaled - floor + HALF_TOLERANCE >= 0.5 {
        floor + 1.0
    } else {
        floor
    };
    rounded / factor
}

/// Round both components of a point to `places` decimals.
#[must_use]
pub fn round_pair(x: f64, y: f64, places: i32) -> [f64; 2] {
    [round_half_up(x, places), round_half_up(y, places)]
}

/// Integer midpoint of two dBm values, halves toward positive infinity.
///
/// `midpoint_half_up(-71, -70) == -70`, `midpoint_half_up(70, 71) == 71`.
#[must_use]
pub fn midpoint_half_up(a: i32, b: i32) -> i32 {
    (i64::from(a) + i64::from(b) + 1).div_euclid(2) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_round_up() {
        assert_eq!(round_half_up(3.005, 2), 3.01);
        assert_eq!(round_half_up(1.005, 2), 1.01);
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(-2.5, 0), -2.0);
    }

    #[test]
    fn non_halves_round_to_nearest() {
        assert_eq!(round_half_up(1.004, 2), 1.0);
        assert_eq!(round_half_up(2.006, 2), 2.01);
        assert_eq!(round_half_up(4.123_06, 2), 4.12);
        assert_eq!(round_half_up(0.123_449, 3), 0.123);
    }

    #[test]
    fn non_finite_passes_through() {
        assert!(round_half_up(f64::NAN, 2).is_nan());
        assert_eq!(round_half_up(f64::INFINITY, 2), f64::INFINITY);
    }

    #[test]
    fn integer_midpoint() {
        assert_eq!(midpoint_half_up(-71, -70), -70);
        assert_eq!(midpoint_half_up(70, 71), 71);
        assert_eq!(midpoint_half_up(-72, -70), -71);
        assert_eq!(midpoint_half_up(i32::MIN, i32::MIN), i32::MIN);
    }
}
