//! Scenario execution engine

use bevy::prelude::*;

use crate::ball::{PossessionRegistry, ThrowableId};
use crate::bridge::ObjectTransforms;
use crate::catching::{CatchReadiness, CatchZone};
use crate::events::{EventBus, strip_timestamp};
use crate::gameplay::{give_object, spawn_player, spawn_throwable};
use crate::input::PlayerInput;
use crate::player::{ActivityState, InputGate, PassTargeting, PlayerBody, PlayerId};
use crate::shooting::ThrowIntent;
use crate::simulation::HeadlessAppBuilder;
use crate::team::TeamControl;

use super::assertions::{
    AssertionError, CapturedEvent, ObjectState, PlayerState, WorldState, check_absent,
    check_sequence, check_state,
};
use super::input::ScriptedInputs;
use super::parser::TestDefinition;

/// Result of running a scenario
#[derive(Debug)]
pub enum TestResult {
    Pass { frames: u64 },
    Fail { error: AssertionError },
    Error { message: String },
}

/// Scenario names to runtime ids
#[derive(Default)]
struct NameMap {
    players: Vec<(String, PlayerId)>,
    objects: Vec<(String, ThrowableId)>,
}

impl NameMap {
    fn player(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn object(&self, name: &str) -> Option<ThrowableId> {
        self.objects.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn player_name(&self, id: Option<PlayerId>) -> String {
        id.and_then(|id| self.players.iter().find(|(_, p)| *p == id))
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| "none".to_string())
    }

    fn object_name(&self, id: Option<ThrowableId>) -> String {
        id.and_then(|id| self.objects.iter().find(|(_, o)| *o == id))
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| "none".to_string())
    }
}

fn setup_scene(world: &mut World, test: &TestDefinition) -> Result<NameMap, String> {
    let mut names = NameMap::default();
    for (i, def) in test.setup.objects.iter().enumerate() {
        let id = ThrowableId(i as u32);
        spawn_throwable(world, id, Vec3::new(def.x, def.y, def.z));
        names.objects.push((def.id.clone(), id));
    }
    for (i, def) in test.setup.players.iter().enumerate() {
        let id = PlayerId(i as u32);
        let facing = Vec3::new(def.facing[0], 0.0, def.facing[1]);
        spawn_player(world, id, Vec3::new(def.x, 0.0, def.z), facing)
            .map_err(|e| format!("spawning '{}': {}", def.id, e))?;
        names.players.push((def.id.clone(), id));
    }
    for def in &test.setup.players {
        let Some(player) = names.player(&def.id) else {
            continue;
        };
        if let Some(object_name) = &def.holding {
            let object = names
                .object(object_name)
                .ok_or_else(|| format!("'{}' holds unknown object '{}'", def.id, object_name))?;
            give_object(world, object, player).map_err(|e| e.to_string())?;
        }
        if let Some(target_name) = &def.pass_target {
            let target = names
                .player(target_name)
                .ok_or_else(|| format!("'{}' targets unknown player '{}'", def.id, target_name))?;
            let entity = world.resource::<TeamControl>().entity(player);
            if let Some(mut targeting) = entity.and_then(|e| world.get_mut::<PassTargeting>(e)) {
                targeting.configured = Some(target);
            }
        }
    }
    Ok(names)
}

fn extract_world_state(world: &mut World, names: &NameMap) -> WorldState {
    let mut state = WorldState::default();
    let mut per_player: Vec<(PlayerId, PlayerState)> = Vec::new();
    {
        let mut query = world.query::<(
            &crate::player::Player,
            &PlayerBody,
            &ActivityState,
            &CatchReadiness,
            &ThrowIntent,
            &InputGate,
        )>();
        for (player, body, activity, readiness, intent, gate) in query.iter(world) {
            per_player.push((
                player.id,
                PlayerState {
                    x: body.position.x,
                    z: body.position.z,
                    activity: format!("{:?}", activity.current),
                    armed_upper: readiness.is_armed(CatchZone::Upper),
                    armed_lower: readiness.is_armed(CatchZone::Lower),
                    charging: intent.charging_channel().is_some(),
                    input_enabled: gate.enabled,
                    ..Default::default()
                },
            ));
        }
    }

    let team = world.resource::<TeamControl>();
    let registry = world.resource::<PossessionRegistry>();
    let transforms = world.resource::<ObjectTransforms>();
    state.active = team.active().map(|id| names.player_name(Some(id)));
    for (id, mut player_state) in per_player {
        player_state.pickup = team.pickup_enabled(id);
        player_state.holding = names.object_name(registry.held_by(id));
        state.players.insert(names.player_name(Some(id)), player_state);
    }
    for (id, record) in registry.objects() {
        let position = transforms.position(id).unwrap_or(Vec3::ZERO);
        state.objects.insert(
            names.object_name(Some(id)),
            ObjectState {
                x: position.x,
                y: position.y,
                z: position.z,
                state: record.state.name().to_string(),
                holder: names.player_name(
                    registry
                        .holder_of(id)
                        .or_else(|| match record.state {
                            crate::ball::PossessionState::Reserved { by } => Some(by),
                            _ => None,
                        }),
                ),
                target: names.player_name(record.intended_target),
            },
        );
    }
    state
}

/// Run a single scenario and return the result
pub fn run_test(test: &TestDefinition) -> TestResult {
    let mut tuning = test.setup.tuning.clone().unwrap_or_default();
    tuning.spawn_input_delay = test.setup.input_delay;

    let mut app = HeadlessAppBuilder::new().with_tuning(tuning).build();
    app.update();

    let names = match setup_scene(app.world_mut(), test) {
        Ok(names) => names,
        Err(message) => return TestResult::Error { message },
    };

    let mut scripted = ScriptedInputs::from_inputs(&test.input);
    let mut checks: Vec<_> = test.expect.state.iter().collect();
    checks.sort_by_key(|c| c.after_frame);
    let mut next_check = 0;
    let mut captured = Vec::new();
    let last_frame = test.last_frame();

    for frame in 0..=last_frame {
        scripted.apply(frame, &mut app.world_mut().resource_mut::<PlayerInput>());
        app.update();

        let world = app.world_mut();
        {
            let mut bus = world.resource_mut::<EventBus>();
            captured.extend(bus.processed().iter().map(|e| CapturedEvent {
                frame,
                line: strip_timestamp(&e.line()).to_string(),
            }));
            bus.clear_processed();
        }

        while next_check < checks.len() && checks[next_check].after_frame == frame {
            let world_state = extract_world_state(world, &names);
            if let Err(error) = check_state(checks[next_check], &world_state) {
                return TestResult::Fail { error };
            }
            next_check += 1;
        }
    }

    if let Err(error) = check_sequence(&test.expect.sequence, &captured) {
        return TestResult::Fail { error };
    }
    if let Err(error) = check_absent(&test.expect.absent, &captured) {
        return TestResult::Fail { error };
    }
    TestResult::Pass {
        frames: last_frame + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::parser::parse_test_file;
    use crate::testing::SCENARIOS_DIR;
    use std::path::Path;

    fn run(toml: &str) -> TestResult {
        let def: TestDefinition = toml::from_str(toml).unwrap();
        run_test(&def)
    }

    #[test]
    fn test_pickup_scenario_inline() {
        let result = run(r#"
name = "Walk-free pickup"
[setup]
[[setup.players]]
id = "a"
[[setup.players]]
id = "b"
x = 6.0
[[setup.objects]]
id = "ball"
z = 0.6

[[expect.sequence]]
event = "RS|O0|P0"
[[expect.sequence]]
event = "AT|O0|P0"
[[expect.state]]
after_frame = 90
checks = ["ball.state == Held", "ball.holder == a", "a.activity == Idle", "a.pickup == true", "b.pickup == false"]
"#);
        assert!(matches!(result, TestResult::Pass { .. }), "{:?}", result);
    }

    #[test]
    fn test_unknown_holder_object_is_error() {
        let result = run(r#"
name = "Bad"
[setup]
[[setup.players]]
id = "a"
holding = "nothing"
"#);
        assert!(matches!(result, TestResult::Error { .. }));
    }

    #[test]
    fn test_all_scenario_files_pass() {
        let dir = Path::new(SCENARIOS_DIR);
        let mut stack = vec![dir.to_path_buf()];
        let mut count = 0;
        while let Some(path) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&path) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().is_some_and(|e| e == "toml") {
                    let def = parse_test_file(&path).unwrap();
                    let result = run_test(&def);
                    assert!(
                        matches!(result, TestResult::Pass { .. }),
                        "{}: {:?}",
                        path.display(),
                        result
                    );
                    count += 1;
                }
            }
        }
        assert!(count > 0, "no scenarios under {}", SCENARIOS_DIR);
    }
}
