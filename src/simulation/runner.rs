//! Headless match runner
//!
//! Drives the gameplay core with seeded random human input against the
//! headless collaborators and checks the cross-module invariants after every
//! tick.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::ball::{PossessionRegistry, ThrowableId};
use crate::bridge::ObjectTransforms;
use crate::catching::CatchReadiness;
use crate::events::{EventBus, EventLog, GameEvent, session_timestamp};
use crate::gameplay::{spawn_player, spawn_throwable};
use crate::input::{Button, PlayerInput};
use crate::player::{ActivityState, Player, PlayerBody, PlayerId};
use crate::team::TeamControl;
use crate::tuning::GameplayTuning;

use super::app_builder::HeadlessAppBuilder;
use super::config::SimConfig;
use super::metrics::{BatchSummary, MatchResult, SimMetrics};

/// Radius of the circle players start on
const SPAWN_RING: f32 = 6.0;
/// Violations recorded per match before the rest are dropped
const MAX_VIOLATIONS: usize = 20;

/// Seeded stand-in for a human at the controls
struct RandomDriver {
    rng: StdRng,
    held: Option<(Button, f32)>,
    move_dir: Vec2,
    next_move_change: f32,
}

impl RandomDriver {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            held: None,
            move_dir: Vec2::ZERO,
            next_move_change: 0.0,
        }
    }

    /// Queue this tick's input. `seek` points at the nearest loose object
    /// when the active player's hands are empty.
    fn drive(&mut self, input: &mut PlayerInput, now: f32, seek: Option<Vec2>) {
        match self.held {
            Some((button, release_at)) if now >= release_at => {
                input.release(button);
                self.held = None;
            }
            Some(_) => {}
            None => {
                let roll = self.rng.gen_range(0.0..1.0);
                if roll < 0.004 {
                    input.press(Button::SwitchPlayer);
                    self.held = Some((Button::SwitchPlayer, now));
                } else if roll < 0.04 {
                    let button = if self.rng.gen_range(0.0..1.0) < 0.75 {
                        Button::Pass
                    } else {
                        Button::Attack
                    };
                    let hold = self.rng.gen_range(0.02..1.4);
                    input.press(button);
                    self.held = Some((button, now + hold));
                }
            }
        }

        if let Some(toward) = seek {
            self.move_dir = toward.normalize_or_zero();
        } else if now >= self.next_move_change {
            self.move_dir = if self.rng.gen_range(0.0..1.0) < 0.4 {
                Vec2::ZERO
            } else {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                Vec2::from_angle(angle)
            };
            self.next_move_change = now + self.rng.gen_range(0.3..2.0);
        }
        input.set_move(self.move_dir);
    }
}

fn spawn_ring_position(index: u32, count: u32) -> Vec3 {
    let angle = index as f32 / count as f32 * std::f32::consts::TAU;
    Vec3::new(angle.cos(), 0.0, angle.sin()) * SPAWN_RING
}

/// Direction from the active player to the nearest loose object, if the
/// player has nothing in hand or on the way
fn seek_direction(world: &World) -> Option<Vec2> {
    let team = world.resource::<TeamControl>();
    let registry = world.resource::<PossessionRegistry>();
    let transforms = world.resource::<ObjectTransforms>();
    let active = team.active()?;
    if registry.held_by(active).is_some() || registry.incoming_for(active).is_some() {
        return None;
    }
    let body = world.get::<PlayerBody>(team.entity(active)?)?;
    registry
        .objects()
        .filter(|(id, _)| registry.can_be_picked_up_by(*id, active))
        .filter_map(|(id, _)| transforms.position(id))
        .map(|pos| pos - body.position)
        .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .map(|delta| Vec2::new(delta.x, delta.z))
}

/// Every cross-module invariant, as a list of descriptions
pub fn check_world_invariants(world: &mut World) -> Vec<String> {
    let mut violations = Vec::new();
    {
        let registry = world.resource::<PossessionRegistry>();
        if let Err(err) = registry.check_invariants() {
            violations.push(err);
        }
        if let Err(err) = world.resource::<TeamControl>().check_invariants(registry) {
            violations.push(err);
        }
    }
    let mut players = world.query::<(&Player, &ActivityState, &CatchReadiness)>();
    for (player, activity, readiness) in players.iter(world) {
        if activity.current.is_full_body() && readiness.any_armed() {
            violations.push(format!(
                "{} is ready to catch during {:?}",
                player.id, activity.current
            ));
        }
    }
    violations
}

/// Run a single match and return the result
pub fn run_match(config: &SimConfig, seed: u64) -> MatchResult {
    let mut builder = HeadlessAppBuilder::new().with_fps(config.fps);
    if config.parallel > 0 {
        builder = builder.with_minimal_threads();
    }
    if config.verbose {
        builder = builder.with_logging();
    }
    let dt = builder.tick();
    let mut app = builder.build();
    app.update();

    let players = config.players.max(2);
    let objects = config.objects.max(1);
    let mut driver = RandomDriver::new(seed);
    {
        let world = app.world_mut();
        for i in 0..players {
            let position = spawn_ring_position(i, players);
            if let Err(err) = spawn_player(world, PlayerId(i), position, -position) {
                warn!("{}", err);
            }
        }
        for i in 0..objects {
            let x = driver.rng.gen_range(-2.0..2.0);
            let z = driver.rng.gen_range(-2.0..2.0);
            spawn_throwable(world, ThrowableId(i), Vec3::new(x, 0.5, z));
        }
    }

    let mut log = config.log_events.then(|| {
        let mut log = EventLog::begin(&session_timestamp());
        let tuning = app.world().resource::<GameplayTuning>().clone();
        log.record(0, GameEvent::Config(tuning));
        log.record(
            0,
            GameEvent::MatchStart {
                seed,
                players,
                objects,
            },
        );
        log
    });

    let mut metrics = SimMetrics::new();
    let mut violations = Vec::new();
    let ticks = (config.duration / dt).round() as u32;
    for tick in 0..ticks {
        let now = app.world().resource::<Time>().elapsed_secs();
        let seek = seek_direction(app.world());
        driver.drive(&mut app.world_mut().resource_mut::<PlayerInput>(), now, seek);
        app.update();

        let world = app.world_mut();
        {
            let mut bus = world.resource_mut::<EventBus>();
            for event in bus.processed() {
                metrics.record(&event.event);
            }
            if let Some(log) = &mut log {
                log.extend(bus.processed());
            }
            bus.clear_processed();
        }
        let holders: Vec<PlayerId> = world
            .resource::<PossessionRegistry>()
            .holders()
            .map(|(_, player)| player)
            .collect();
        metrics.track_possession(holders, dt);

        if violations.len() < MAX_VIOLATIONS {
            for violation in check_world_invariants(world) {
                error!("seed {} tick {}: {}", seed, tick, violation);
                violations.push(format!("tick {}: {}", tick, violation));
            }
        }
    }

    let duration = ticks as f32 * dt;
    if let Some(log) = &mut log {
        log.record(
            (duration * 1000.0) as u32,
            GameEvent::MatchEnd {
                duration,
                passes: metrics.total_passes(),
                throws: metrics.total_throws(),
            },
        );
        if let Err(e) = log.write_to(Path::new(&config.log_dir)) {
            warn!("Failed to write event log for seed {}: {}", seed, e);
        }
    }

    MatchResult {
        seed,
        players,
        objects,
        duration,
        ticks,
        metrics,
        violations,
        events: log.map(EventLog::into_events).unwrap_or_default(),
    }
}

/// Main simulation entry point: run every match, print a summary and write
/// results when asked. Returns the results for the caller's exit status.
pub fn run_simulation(config: &SimConfig) -> Result<Vec<MatchResult>, String> {
    let base_seed = config
        .seed
        .unwrap_or_else(|| rand::thread_rng().r#gen());
    if !config.quiet {
        println!(
            "Running {} match(es): {} players, {} object(s), {:.0}s each (seed: {})",
            config.matches, config.players, config.objects, config.duration, base_seed
        );
    }

    let results = if config.parallel > 0 {
        super::parallel::init_parallel(config.parallel)?;
        super::parallel::run_matches_parallel(config, base_seed)
    } else {
        (0..config.matches)
            .map(|i| {
                if !config.quiet {
                    print!("\rMatch {}/{}...", i + 1, config.matches);
                    std::io::stdout().flush().ok();
                }
                run_match(config, base_seed.wrapping_add(i as u64))
            })
            .collect()
    };

    let summary = BatchSummary::from_results(&results);
    if !config.quiet {
        println!("\r{}", summary.format_table());
        for result in results.iter().filter(|r| !r.is_clean()) {
            println!("seed {}: {}", result.seed, result.violations.join("; "));
        }
    }

    if let Some(output_file) = &config.output_file {
        let json = serde_json::to_string_pretty(&results)
            .map_err(|e| format!("Failed to serialize results: {}", e))?;
        fs::write(output_file, json)
            .map_err(|e| format!("Failed to write {}: {}", output_file, e))?;
        if !config.quiet {
            println!("Results written to {}", output_file);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> SimConfig {
        SimConfig {
            players: 3,
            objects: 2,
            duration: 20.0,
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_random_match_keeps_invariants() {
        for seed in [1, 2, 3] {
            let result = run_match(&short_config(), seed);
            assert!(result.is_clean(), "seed {}: {:?}", seed, result.violations);
            assert_eq!(result.ticks, 1200);
        }
    }

    #[test]
    fn test_same_seed_same_match() {
        let config = SimConfig {
            log_events: false,
            ..short_config()
        };
        let a = run_match(&config, 42);
        let b = run_match(&config, 42);
        assert_eq!(a.metrics.total_passes(), b.metrics.total_passes());
        assert_eq!(a.metrics.total_catches(), b.metrics.total_catches());
        assert_eq!(a.metrics.settles, b.metrics.settles);
    }

    #[test]
    fn test_driver_releases_what_it_presses() {
        let mut driver = RandomDriver::new(5);
        let mut input = PlayerInput::default();
        let mut now = 0.0;
        for _ in 0..2000 {
            driver.drive(&mut input, now, None);
            now += 1.0 / 60.0;
        }
        driver.drive(&mut input, now + 10.0, None);
        let downs = input
            .edges
            .iter()
            .filter(|e| matches!(e, crate::input::ButtonEdge::Down(_)))
            .count();
        let ups = input.edges.len() - downs;
        assert!(downs > 0);
        assert!(downs - ups <= 1);
    }
}
