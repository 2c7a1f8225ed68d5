//! Global gameplay tuning settings
//!
//! Loaded from `config/gameplay_tuning.json` at startup. Every field falls back
//! to its constant when missing, so older config files keep loading.

use bevy::log::warn;
use bevy::prelude::{ResMut, Resource};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::shooting::{ChargeCurve, FlightMode};

/// Path to global gameplay tuning config
pub const GAMEPLAY_TUNING_FILE: &str = "config/gameplay_tuning.json";

fn default_gravity() -> f32 {
    GRAVITY
}
fn default_throw_cooldown() -> f32 {
    THROW_COOLDOWN
}
fn default_reservation_timeout() -> f32 {
    RESERVATION_TIMEOUT
}
fn default_release_watchdog() -> f32 {
    RELEASE_WATCHDOG
}
fn default_min_hold_power() -> f32 {
    MIN_HOLD_POWER
}
fn default_max_hold_power() -> f32 {
    MAX_HOLD_POWER
}
fn default_full_charge_time() -> f32 {
    FULL_CHARGE_TIME
}
fn default_tap_threshold() -> f32 {
    TAP_THRESHOLD
}
fn default_tap_power() -> f32 {
    TAP_POWER
}
fn default_slow_flight_time() -> f32 {
    SLOW_FLIGHT_TIME
}
fn default_fast_flight_time() -> f32 {
    FAST_FLIGHT_TIME
}
fn default_forward_min_dist() -> f32 {
    FORWARD_MIN_DIST
}
fn default_forward_max_dist() -> f32 {
    FORWARD_MAX_DIST
}
fn default_forward_height_offset() -> f32 {
    FORWARD_HEIGHT_OFFSET
}
fn default_pass_max_angle() -> f32 {
    PASS_MAX_ANGLE
}
fn default_pass_max_distance() -> f32 {
    PASS_MAX_DISTANCE
}
fn default_tap_max_pass_distance() -> f32 {
    TAP_MAX_PASS_DISTANCE
}
fn default_hold_max_pass_distance() -> f32 {
    HOLD_MAX_PASS_DISTANCE
}
fn default_fallback_min_dist() -> f32 {
    FALLBACK_MIN_DIST
}
fn default_fallback_max_fraction() -> f32 {
    FALLBACK_MAX_FRACTION
}
fn default_auto_select_pass_target() -> bool {
    true
}
fn default_pass_arc_height() -> f32 {
    GUIDED_ARC_HEIGHT
}
fn default_guided_seconds_per_meter() -> f32 {
    GUIDED_SECONDS_PER_METER
}
fn default_pre_catch_timeout() -> f32 {
    PRE_CATCH_TIMEOUT
}
fn default_pass_ready_timeout() -> f32 {
    PASS_READY_TIMEOUT
}
fn default_spawn_input_delay() -> f32 {
    SPAWN_INPUT_DELAY
}

/// Tuning values for possession, charging, aiming and catching
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct GameplayTuning {
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_throw_cooldown")]
    pub throw_cooldown: f32,
    #[serde(default = "default_reservation_timeout")]
    pub reservation_timeout: f32,
    #[serde(default = "default_release_watchdog")]
    pub release_watchdog: f32,

    // Charge
    #[serde(default = "default_min_hold_power")]
    pub min_hold_power: f32,
    #[serde(default = "default_max_hold_power")]
    pub max_hold_power: f32,
    #[serde(default = "default_full_charge_time")]
    pub full_charge_time: f32,
    #[serde(default = "default_tap_threshold")]
    pub tap_threshold: f32,
    #[serde(default = "default_tap_power")]
    pub tap_power: f32,
    #[serde(default = "default_slow_flight_time")]
    pub slow_flight_time: f32,
    #[serde(default = "default_fast_flight_time")]
    pub fast_flight_time: f32,
    #[serde(default)]
    pub charge_curve: ChargeCurve,

    // Destination selection
    #[serde(default = "default_forward_min_dist")]
    pub forward_min_dist: f32,
    #[serde(default = "default_forward_max_dist")]
    pub forward_max_dist: f32,
    #[serde(default = "default_forward_height_offset")]
    pub forward_height_offset: f32,
    #[serde(default = "default_pass_max_angle")]
    pub pass_max_angle: f32,
    #[serde(default = "default_pass_max_distance")]
    pub pass_max_distance: f32,
    #[serde(default = "default_tap_max_pass_distance")]
    pub tap_max_pass_distance: f32,
    #[serde(default = "default_hold_max_pass_distance")]
    pub hold_max_pass_distance: f32,
    #[serde(default = "default_fallback_min_dist")]
    pub fallback_min_dist: f32,
    #[serde(default = "default_fallback_max_fraction")]
    pub fallback_max_fraction: f32,
    #[serde(default)]
    pub require_line_of_sight: bool,
    #[serde(default = "default_auto_select_pass_target")]
    pub auto_select_pass_target: bool,

    // Pass flight
    #[serde(default)]
    pub pass_flight_mode: FlightMode,
    #[serde(default = "default_pass_arc_height")]
    pub pass_arc_height: f32,
    #[serde(default = "default_guided_seconds_per_meter")]
    pub guided_seconds_per_meter: f32,

    // Catching
    #[serde(default = "default_pre_catch_timeout")]
    pub pre_catch_timeout: f32,
    #[serde(default = "default_pass_ready_timeout")]
    pub pass_ready_timeout: f32,

    #[serde(default = "default_spawn_input_delay")]
    pub spawn_input_delay: f32,
}

impl Default for GameplayTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            throw_cooldown: THROW_COOLDOWN,
            reservation_timeout: RESERVATION_TIMEOUT,
            release_watchdog: RELEASE_WATCHDOG,
            min_hold_power: MIN_HOLD_POWER,
            max_hold_power: MAX_HOLD_POWER,
            full_charge_time: FULL_CHARGE_TIME,
            tap_threshold: TAP_THRESHOLD,
            tap_power: TAP_POWER,
            slow_flight_time: SLOW_FLIGHT_TIME,
            fast_flight_time: FAST_FLIGHT_TIME,
            charge_curve: ChargeCurve::default(),
            forward_min_dist: FORWARD_MIN_DIST,
            forward_max_dist: FORWARD_MAX_DIST,
            forward_height_offset: FORWARD_HEIGHT_OFFSET,
            pass_max_angle: PASS_MAX_ANGLE,
            pass_max_distance: PASS_MAX_DISTANCE,
            tap_max_pass_distance: TAP_MAX_PASS_DISTANCE,
            hold_max_pass_distance: HOLD_MAX_PASS_DISTANCE,
            fallback_min_dist: FALLBACK_MIN_DIST,
            fallback_max_fraction: FALLBACK_MAX_FRACTION,
            require_line_of_sight: false,
            auto_select_pass_target: true,
            pass_flight_mode: FlightMode::default(),
            pass_arc_height: GUIDED_ARC_HEIGHT,
            guided_seconds_per_meter: GUIDED_SECONDS_PER_METER,
            pre_catch_timeout: PRE_CATCH_TIMEOUT,
            pass_ready_timeout: PASS_READY_TIMEOUT,
            spawn_input_delay: SPAWN_INPUT_DELAY,
        }
    }
}

impl GameplayTuning {
    /// Largest pass distance a full charge may reach
    pub fn hold_pass_limit(&self) -> f32 {
        self.hold_max_pass_distance.min(self.pass_max_distance)
    }

    /// Guided pass duration for a given pass length, before the minimum floor
    pub fn guided_duration(&self, distance: f32) -> f32 {
        GUIDED_DEFAULT_DURATION + distance * self.guided_seconds_per_meter
    }
}

pub fn load_gameplay_tuning_from_file(path: &str) -> Result<GameplayTuning, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
    serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
}

pub fn apply_global_tuning(tuning: &mut GameplayTuning) -> Result<(), String> {
    match load_gameplay_tuning_from_file(GAMEPLAY_TUNING_FILE) {
        Ok(loaded) => {
            *tuning = loaded;
            Ok(())
        }
        Err(err) => {
            *tuning = GameplayTuning::default();
            Err(err)
        }
    }
}

pub fn load_global_tuning_system(mut tuning: ResMut<GameplayTuning>) {
    if let Err(err) = apply_global_tuning(&mut tuning) {
        warn!("{} (using built-in tuning)", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let tuning: GameplayTuning =
            serde_json::from_str(r#"{ "tap_power": 0.5, "pass_flight_mode": "Ballistic" }"#)
                .unwrap();
        assert_eq!(tuning.tap_power, 0.5);
        assert_eq!(tuning.pass_flight_mode, FlightMode::Ballistic);
        assert_eq!(tuning.throw_cooldown, THROW_COOLDOWN);
        assert_eq!(tuning.charge_curve, ChargeCurve::SmoothStep);
        assert!(tuning.auto_select_pass_target);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_gameplay_tuning_from_file("config/does_not_exist.json").unwrap_err();
        assert!(err.contains("Failed to read"));
    }

    #[test]
    fn test_hold_pass_limit_respects_pass_max() {
        let mut tuning = GameplayTuning::default();
        assert_eq!(tuning.hold_pass_limit(), HOLD_MAX_PASS_DISTANCE);
        tuning.pass_max_distance = 20.0;
        assert_eq!(tuning.hold_pass_limit(), 20.0);
    }

    #[test]
    fn test_shipped_config_parses() {
        let tuning = load_gameplay_tuning_from_file(GAMEPLAY_TUNING_FILE).unwrap();
        assert!(tuning.gravity < 0.0);
        assert!(tuning.tap_threshold > 0.0);
    }
}
