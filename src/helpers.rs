//! Utility functions for catchball

use bevy::prelude::*;

/// Linear interpolation without clamping
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp to [0, 1]
pub fn clamp01(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Move a value toward a target by a maximum delta
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Drop the vertical component
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Horizontal distance between two points
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar(b - a).length()
}

/// Horizontal angle in degrees between two directions.
/// Zero-length inputs count as perfectly aligned.
pub fn planar_angle_deg(a: Vec3, b: Vec3) -> f32 {
    let a = planar(a);
    let b = planar(b);
    if a.length_squared() < f32::EPSILON || b.length_squared() < f32::EPSILON {
        return 0.0;
    }
    a.angle_between(b).to_degrees()
}

/// Unit horizontal direction, or `fallback` when degenerate
pub fn planar_direction(v: Vec3, fallback: Vec3) -> Vec3 {
    planar(v).try_normalize().unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_angle_ignores_height() {
        let angle = planar_angle_deg(Vec3::Z, Vec3::new(0.0, 5.0, 3.0));
        assert!(angle.abs() < 0.01);
        let side = planar_angle_deg(Vec3::Z, Vec3::X);
        assert!((side - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_move_toward_stops_at_target() {
        assert_eq!(move_toward(0.0, 1.0, 5.0), 1.0);
        assert_eq!(move_toward(0.0, 10.0, 2.0), 2.0);
        assert_eq!(move_toward(0.0, -10.0, 2.0), -2.0);
    }
}
