//! TOML scenario file parsing

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::tuning::GameplayTuning;

/// Complete scenario definition from a TOML file
#[derive(Debug, Deserialize)]
pub struct TestDefinition {
    pub name: String,
    pub description: Option<String>,
    pub setup: TestSetup,
    #[serde(default)]
    pub input: Vec<FrameInput>,
    #[serde(default)]
    pub expect: TestExpectations,
}

/// Scene setup. Players get ids `P0, P1, ...` and objects `O0, O1, ...` in
/// the order they are listed; the first player starts in control.
#[derive(Debug, Deserialize)]
pub struct TestSetup {
    #[serde(default)]
    pub players: Vec<PlayerDef>,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
    /// Tuning overrides; missing fields keep their defaults
    pub tuning: Option<GameplayTuning>,
    /// Seconds of post-spawn input gating
    #[serde(default)]
    pub input_delay: f32,
    /// Frames to run when no input or check names a later one
    pub frames: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerDef {
    pub id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub z: f32,
    /// Facing direction on the ground plane as `[x, z]`
    #[serde(default = "default_facing")]
    pub facing: [f32; 2],
    /// Object id placed in this player's hand at spawn
    pub holding: Option<String>,
    /// Preferred pass receiver
    pub pass_target: Option<String>,
}

fn default_facing() -> [f32; 2] {
    [0.0, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectDef {
    pub id: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default = "default_object_height")]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

fn default_object_height() -> f32 {
    crate::constants::OBJECT_RADIUS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDef {
    Down,
    Up,
    /// Down this frame, up the next
    Tap,
}

/// Human input applied at a specific frame. Movement persists until changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameInput {
    pub frame: u64,
    pub pass: Option<EdgeDef>,
    pub attack: Option<EdgeDef>,
    pub switch: Option<EdgeDef>,
    pub move_x: Option<f32>,
    pub move_z: Option<f32>,
}

/// Expected scenario outcomes
#[derive(Debug, Default, Deserialize)]
pub struct TestExpectations {
    #[serde(default)]
    pub sequence: Vec<ExpectedEvent>,
    /// Events that must not appear at all, by line prefix
    #[serde(default)]
    pub absent: Vec<String>,
    /// State assertions at different frames (`[[expect.state]]`)
    #[serde(default)]
    pub state: Vec<StateAssertion>,
}

/// Expected event in sequence, matched by prefix against the event line
/// without its timestamp, e.g. `"RS|O0|P0"` or `"PG|P0|P1|1"`
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedEvent {
    pub event: String,
    pub frame_min: Option<u64>,
    pub frame_max: Option<u64>,
}

/// State checks run right after the given frame
#[derive(Debug, Clone, Deserialize)]
pub struct StateAssertion {
    pub after_frame: u64,
    #[serde(default)]
    pub checks: Vec<String>,
}

impl TestDefinition {
    /// Last frame the scenario needs to simulate
    pub fn last_frame(&self) -> u64 {
        let inputs = self.input.iter().map(|i| i.frame + 1);
        let checks = self.expect.state.iter().map(|s| s.after_frame);
        let windows = self.expect.sequence.iter().filter_map(|e| e.frame_max);
        inputs
            .chain(checks)
            .chain(windows)
            .chain(self.setup.frames)
            .max()
            .unwrap_or(60)
    }
}

/// Parse a scenario file from path
pub fn parse_test_file(path: &Path) -> Result<TestDefinition, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let toml = r#"
name = "Pass"
[setup]
input_delay = 0.2
[setup.tuning]
pass_max_angle = 30.0
[[setup.players]]
id = "a"
holding = "ball"
[[setup.players]]
id = "b"
z = 8.0
facing = [0.0, -1.0]
[[setup.objects]]
id = "ball"

[[input]]
frame = 5
pass = "down"
[[input]]
frame = 40
pass = "up"
move_x = 1.0

[[expect.sequence]]
event = "PG|P0|P1|1"
[[expect.state]]
after_frame = 45
checks = ["active == b"]
"#;
        let def: TestDefinition = toml::from_str(toml).unwrap();
        assert_eq!(def.name, "Pass");
        assert_eq!(def.setup.players.len(), 2);
        assert_eq!(def.setup.players[0].facing, [0.0, 1.0]);
        assert_eq!(def.setup.players[1].facing, [0.0, -1.0]);
        assert_eq!(def.setup.objects[0].y, crate::constants::OBJECT_RADIUS);
        let tuning = def.setup.tuning.as_ref().unwrap();
        assert_eq!(tuning.pass_max_angle, 30.0);
        assert_eq!(tuning.throw_cooldown, crate::constants::THROW_COOLDOWN);
        assert_eq!(def.input[1].pass, Some(EdgeDef::Up));
        assert_eq!(def.last_frame(), 45);
    }

    #[test]
    fn test_last_frame_default() {
        let def: TestDefinition = toml::from_str("name = \"Empty\"\n[setup]\n").unwrap();
        assert_eq!(def.last_frame(), 60);
    }
}
