//! Launch velocity solver
//!
//! Pure functions: no ECS access. Gravity is a signed vertical acceleration
//! (negative is down) applied along Y.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::ARC_EPSILON;

/// How a pass travels once released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Free ballistic flight from an apex-constrained launch velocity
    Ballistic,
    /// Position-driven curve that tracks the receiver's live catch point
    #[default]
    Guided,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid solver parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

fn check_gravity(gravity: f32) -> Result<(), SolveError> {
    if gravity >= 0.0 || !gravity.is_finite() {
        return Err(SolveError::InvalidParameter {
            name: "gravity",
            value: gravity,
        });
    }
    Ok(())
}

/// Launch velocity that lands on `destination` after exactly `flight_time` seconds.
///
/// Horizontal velocity is the horizontal delta over time; vertical velocity
/// compensates for the height change and the gravity drop over the flight.
pub fn solve_constant_time(
    origin: Vec3,
    destination: Vec3,
    flight_time: f32,
    gravity: f32,
) -> Result<Vec3, SolveError> {
    if flight_time <= 0.0 || !flight_time.is_finite() {
        return Err(SolveError::InvalidParameter {
            name: "flight_time",
            value: flight_time,
        });
    }
    check_gravity(gravity)?;

    let delta = destination - origin;
    let vx = delta.x / flight_time;
    let vz = delta.z / flight_time;
    let vy = delta.y / flight_time - 0.5 * gravity * flight_time;
    Ok(Vec3::new(vx, vy, vz))
}

/// Rise and fall times of an apex-constrained arc
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcTiming {
    pub time_up: f32,
    pub time_down: f32,
}

impl ArcTiming {
    pub fn total(&self) -> f32 {
        self.time_up + self.time_down
    }
}

/// Timing of an arc whose apex sits `arc_height` above the higher endpoint
pub fn arc_timing(
    origin: Vec3,
    destination: Vec3,
    arc_height: f32,
    gravity: f32,
) -> Result<ArcTiming, SolveError> {
    if arc_height <= 0.0 || !arc_height.is_finite() {
        return Err(SolveError::InvalidParameter {
            name: "arc_height",
            value: arc_height,
        });
    }
    check_gravity(gravity)?;

    let apex = origin.y.max(destination.y) + arc_height.max(ARC_EPSILON);
    let g = -gravity;
    Ok(ArcTiming {
        time_up: (2.0 * (apex - origin.y) / g).sqrt(),
        time_down: (2.0 * (apex - destination.y) / g).sqrt(),
    })
}

/// Launch velocity for an arc that peaks `arc_height` above the higher endpoint
pub fn solve_arc_apex(
    origin: Vec3,
    destination: Vec3,
    arc_height: f32,
    gravity: f32,
) -> Result<Vec3, SolveError> {
    let timing = arc_timing(origin, destination, arc_height, gravity)?;
    let delta = destination - origin;
    let total = timing.total();
    Ok(Vec3::new(
        delta.x / total,
        -gravity * timing.time_up,
        delta.z / total,
    ))
}

/// Point on a guided pass curve.
///
/// Quadratic Bézier from `start` to `end` with the control point lifted
/// `arc_height` above the midpoint. `end` is the receiver's current catch point,
/// so callers re-sample it every step.
pub fn guided_position(start: Vec3, end: Vec3, arc_height: f32, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    let control = (start + end) * 0.5 + Vec3::Y * arc_height;
    let u = 1.0 - t;
    start * (u * u) + control * (2.0 * u * t) + end * (t * t)
}

/// Derivative of [`guided_position`] with respect to `t`
pub fn guided_tangent(start: Vec3, end: Vec3, arc_height: f32, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    let control = (start + end) * 0.5 + Vec3::Y * arc_height;
    (control - start) * (2.0 * (1.0 - t)) + (end - control) * (2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GRAVITY;
    use proptest::prelude::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    /// Position after `t` seconds of free flight
    fn integrate(origin: Vec3, velocity: Vec3, gravity: f32, t: f32) -> Vec3 {
        origin + velocity * t + Vec3::Y * (0.5 * gravity * t * t)
    }

    #[test]
    fn test_constant_time_level_throw() {
        let v = solve_constant_time(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), 1.0, GRAVITY).unwrap();
        assert!(approx(v, Vec3::new(0.0, 4.905, 10.0)), "got {:?}", v);
    }

    #[test]
    fn test_constant_time_rejects_non_positive_time() {
        assert!(matches!(
            solve_constant_time(Vec3::ZERO, Vec3::X, 0.0, GRAVITY),
            Err(SolveError::InvalidParameter { name: "flight_time", .. })
        ));
        assert!(solve_constant_time(Vec3::ZERO, Vec3::X, -1.0, GRAVITY).is_err());
    }

    #[test]
    fn test_arc_apex_same_point() {
        let timing = arc_timing(Vec3::ZERO, Vec3::ZERO, 2.0, GRAVITY).unwrap();
        assert!((timing.time_up - timing.time_down).abs() < 1e-6);

        let v = solve_arc_apex(Vec3::ZERO, Vec3::ZERO, 2.0, GRAVITY).unwrap();
        let expected_vy = (2.0_f32 * 2.0 * 9.81).sqrt();
        assert!((v.y - expected_vy).abs() < 1e-3);
        assert_eq!(v.x, 0.0);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_arc_apex_rejects_flat_arc() {
        assert!(solve_arc_apex(Vec3::ZERO, Vec3::Z, 0.0, GRAVITY).is_err());
        assert!(solve_arc_apex(Vec3::ZERO, Vec3::Z, 1.0, 9.81).is_err());
    }

    #[test]
    fn test_arc_apex_reaches_requested_height() {
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let dest = Vec3::new(4.0, 2.0, 6.0);
        let v = solve_arc_apex(origin, dest, 1.5, GRAVITY).unwrap();
        // Apex height = origin + vy² / 2g
        let apex = origin.y + v.y * v.y / (2.0 * 9.81);
        assert!((apex - 3.5).abs() < 1e-3);
    }

    #[test]
    fn test_guided_endpoints_and_lift() {
        let start = Vec3::new(0.0, 1.0, 0.0);
        let end = Vec3::new(0.0, 1.0, 10.0);
        assert!(approx(guided_position(start, end, 1.5, 0.0), start));
        assert!(approx(guided_position(start, end, 1.5, 1.0), end));
        // Quadratic Bézier midpoint sits halfway to the control point
        let mid = guided_position(start, end, 1.5, 0.5);
        assert!(approx(mid, Vec3::new(0.0, 1.75, 5.0)));
    }

    proptest! {
        #[test]
        fn prop_constant_time_lands_on_destination(
            ox in -20.0f32..20.0, oz in -20.0f32..20.0, oy in 0.0f32..3.0,
            dx in -20.0f32..20.0, dz in -20.0f32..20.0, dy in 0.0f32..3.0,
            t in 0.05f32..3.0,
        ) {
            let origin = Vec3::new(ox, oy, oz);
            let dest = Vec3::new(dx, dy, dz);
            let v = solve_constant_time(origin, dest, t, GRAVITY).unwrap();
            let landed = integrate(origin, v, GRAVITY, t);
            prop_assert!((landed - dest).length() < 1e-2);
        }

        #[test]
        fn prop_arc_apex_lands_on_destination(
            dx in -20.0f32..20.0, dz in -20.0f32..20.0, dy in -1.0f32..3.0,
            arc in 0.1f32..5.0,
        ) {
            let origin = Vec3::new(0.0, 1.0, 0.0);
            let dest = Vec3::new(dx, dy, dz);
            let timing = arc_timing(origin, dest, arc, GRAVITY).unwrap();
            let v = solve_arc_apex(origin, dest, arc, GRAVITY).unwrap();
            let landed = integrate(origin, v, GRAVITY, timing.total());
            prop_assert!((landed - dest).length() < 1e-2);
        }
    }
}
