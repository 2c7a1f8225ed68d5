//! Gameplay plugin - shared system context, schedule and spawn helpers

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::ball::{PossessionError, PossessionRegistry, Throwable, ThrowableId, on_attach_frame, process_physics_events, step_guided_flights};
use crate::bridge::{
    AnimationSignal, AnimationSignals, AnimationStatus, ObjectTransforms, PhysicsCommands,
    PhysicsEvents, PresentationCommands, SightBlockers,
};
use crate::catching::{CatchReadiness, update_catch_windows};
use crate::events::{EventBus, GameEvent, flush_event_bus, update_event_bus_time};
use crate::input::{InputState, PlayerInput, route_human_input};
use crate::player::{
    ActivityState, InputGate, PassTargeting, Player, PlayerBody, PlayerId, clear_finished_actions,
};
use crate::shooting::{CatchPoints, ThrowIntent, release_throw, update_throw_intent};
use crate::team::{TeamControl, TeamError, apply_pickup_changes, handle_switch_requests};
use crate::timers::{DeferredTasks, TaskKey, TaskPurpose, fire_deferred_tasks};
use crate::tuning::{GameplayTuning, apply_global_tuning};

/// Resources every core system works against
#[derive(SystemParam)]
pub struct GameplayParams<'w> {
    pub time: Res<'w, Time>,
    pub tuning: Res<'w, GameplayTuning>,
    pub registry: ResMut<'w, PossessionRegistry>,
    pub team: ResMut<'w, TeamControl>,
    pub tasks: ResMut<'w, DeferredTasks>,
    pub physics: ResMut<'w, PhysicsCommands>,
    pub presentation: ResMut<'w, PresentationCommands>,
    pub bus: ResMut<'w, EventBus>,
}

impl GameplayParams<'_> {
    pub fn now(&self) -> f32 {
        self.time.elapsed_secs()
    }

    /// Recompute who may start pickups and forward the changes
    pub fn refresh_pickups(&mut self) {
        let changes = self.team.refresh_pickup_areas(&self.registry);
        apply_pickup_changes(&changes, &mut *self.physics, &mut self.bus);
    }

    /// Hand control to `to`
    pub fn switch_control(&mut self, to: PlayerId) -> Result<(), TeamError> {
        let from = self.team.active();
        if from == Some(to) {
            return Ok(());
        }
        let changes = self.team.switch_to(to, &self.registry)?;
        self.bus.emit(GameEvent::ControlSwitch { from, to });
        apply_pickup_changes(&changes, &mut *self.physics, &mut self.bus);
        info!("control {:?} -> {}", from, to);
        Ok(())
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameplaySet {
    /// Physics, animation and input providers
    Collaborators,
    Core,
}

/// Installs the core resources and the ordered core system chain
#[derive(Default)]
pub struct GameplayPlugin {
    /// Explicit tuning; `None` loads `config/gameplay_tuning.json`
    pub tuning: Option<GameplayTuning>,
}

impl GameplayPlugin {
    pub fn with_tuning(tuning: GameplayTuning) -> Self {
        Self {
            tuning: Some(tuning),
        }
    }
}

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        let tuning = match &self.tuning {
            Some(tuning) => tuning.clone(),
            None => {
                let mut tuning = GameplayTuning::default();
                if let Err(err) = apply_global_tuning(&mut tuning) {
                    warn!("{} (using built-in tuning)", err);
                }
                tuning
            }
        };
        if !app.world().contains_resource::<EventBus>() {
            app.insert_resource(EventBus::new());
        }
        app.insert_resource(PossessionRegistry::with_cooldown(tuning.throw_cooldown))
            .insert_resource(tuning)
            .init_resource::<TeamControl>()
            .init_resource::<DeferredTasks>()
            .init_resource::<PhysicsCommands>()
            .init_resource::<PhysicsEvents>()
            .init_resource::<ObjectTransforms>()
            .init_resource::<SightBlockers>()
            .init_resource::<PresentationCommands>()
            .init_resource::<AnimationStatus>()
            .init_resource::<AnimationSignals>()
            .init_resource::<PlayerInput>();

        app.configure_sets(
            Update,
            (GameplaySet::Collaborators, GameplaySet::Core).chain(),
        );
        app.add_systems(
            Update,
            (
                update_event_bus_time,
                route_human_input,
                handle_switch_requests,
                process_physics_events,
                update_catch_windows,
                update_throw_intent,
                process_animation_signals,
                step_guided_flights,
                fire_deferred_tasks,
                clear_finished_actions,
                flush_event_bus,
            )
                .chain()
                .in_set(GameplaySet::Core),
        );
    }
}

/// Attach and release frames reported by the presentation layer
pub fn process_animation_signals(
    mut ctx: GameplayParams,
    mut signals: ResMut<AnimationSignals>,
    mut players: Query<(
        &Player,
        &PlayerBody,
        &mut ActivityState,
        &mut CatchReadiness,
        &mut ThrowIntent,
    )>,
) {
    let pending = signals.drain();
    if pending.is_empty() {
        return;
    }
    let catch_points: CatchPoints = players
        .iter()
        .map(|(player, body, ..)| (player.id, body.catch_point()))
        .collect();

    for signal in pending {
        let id = match signal {
            AnimationSignal::AttachFrame(id) | AnimationSignal::ReleaseFrame(id) => id,
        };
        let Some(entity) = ctx.team.entity(id) else {
            continue;
        };
        let Ok((_, body, mut activity, mut readiness, mut intent)) = players.get_mut(entity) else {
            continue;
        };
        match signal {
            AnimationSignal::AttachFrame(_) => {
                on_attach_frame(&mut ctx, id, &activity, &mut readiness);
            }
            AnimationSignal::ReleaseFrame(_) => {
                release_throw(
                    &mut ctx,
                    id,
                    body,
                    &catch_points,
                    &mut activity,
                    &mut readiness,
                    &mut intent,
                );
            }
        }
    }
}

/// Spawn a player and append it to the roster. Input stays gated for the
/// configured spawn delay.
pub fn spawn_player(
    world: &mut World,
    id: PlayerId,
    position: Vec3,
    forward: Vec3,
) -> Result<Entity, TeamError> {
    let delay = world.resource::<GameplayTuning>().spawn_input_delay;
    let now = world.resource::<Time>().elapsed_secs();
    let entity = world
        .spawn((
            Player { id },
            PlayerBody::new(position, forward),
            PassTargeting::default(),
            InputGate {
                enabled: delay <= 0.0,
            },
            InputState::default(),
            ActivityState::default(),
            CatchReadiness::default(),
            ThrowIntent::default(),
        ))
        .id();

    let registered = world.resource_scope(|world, mut team: Mut<TeamControl>| {
        team.register(id, entity, world.resource::<PossessionRegistry>())
    });
    let changes = match registered {
        Ok(changes) => changes,
        Err(err) => {
            warn!("{}", err);
            world.despawn(entity);
            return Err(err);
        }
    };
    world.resource_scope(|world, mut bus: Mut<EventBus>| {
        bus.emit(GameEvent::Register { player: id });
        let mut physics = world.resource_mut::<PhysicsCommands>();
        apply_pickup_changes(&changes, &mut *physics, &mut bus);
    });
    if delay > 0.0 {
        world
            .resource_mut::<DeferredTasks>()
            .schedule(TaskKey::new(id, TaskPurpose::InputEnable), now + delay);
    }
    info!("registered {} at {:?}", id, position);
    Ok(entity)
}

/// Spawn a free throwable resting at `position`
pub fn spawn_throwable(world: &mut World, id: ThrowableId, position: Vec3) -> Entity {
    world.resource_mut::<PossessionRegistry>().register(id);
    world
        .resource_mut::<ObjectTransforms>()
        .set(id, position, Vec3::ZERO);
    world.spawn(Throwable { id }).id()
}

/// Put an object straight into a player's hand (scene setup)
pub fn give_object(
    world: &mut World,
    object: ThrowableId,
    player: PlayerId,
) -> Result<(), PossessionError> {
    world.resource_scope(|world, mut registry: Mut<PossessionRegistry>| {
        let mut physics = world.resource_mut::<PhysicsCommands>();
        registry.attach(object, player, &mut *physics)
    })?;
    let changes = world.resource_scope(|world, mut team: Mut<TeamControl>| {
        team.refresh_pickup_areas(world.resource::<PossessionRegistry>())
    });
    world.resource_scope(|world, mut bus: Mut<EventBus>| {
        bus.emit(GameEvent::Attach { object, player });
        let mut physics = world.resource_mut::<PhysicsCommands>();
        apply_pickup_changes(&changes, &mut *physics, &mut bus);
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::PossessionState;
    use crate::bridge::{OverlapEdge, PresentationCommand, ZoneKind};
    use crate::catching::CatchZone;
    use crate::constants::*;
    use crate::events::strip_timestamp;
    use crate::input::Button;
    use crate::player::Activity;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;

    const A: PlayerId = PlayerId(0);
    const B: PlayerId = PlayerId(1);
    const BALL: ThrowableId = ThrowableId(0);

    const SPARE: ThrowableId = ThrowableId(1);

    fn test_app() -> App {
        test_app_with(GameplayTuning {
            spawn_input_delay: 0.0,
            ..default()
        })
    }

    fn test_app_with(tuning: GameplayTuning) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(16)));
        app.add_plugins(GameplayPlugin::with_tuning(tuning));
        app.update();
        let world = app.world_mut();
        spawn_player(world, A, Vec3::ZERO, Vec3::Z).unwrap();
        spawn_player(world, B, Vec3::new(0.0, 0.0, 8.0), Vec3::NEG_Z).unwrap();
        spawn_throwable(world, BALL, Vec3::new(0.0, 0.1, 0.6));
        app
    }

    fn activity(app: &mut App, id: PlayerId) -> Activity {
        let entity = app.world().resource::<TeamControl>().entity(id).unwrap();
        app.world().get::<ActivityState>(entity).unwrap().current
    }

    fn readiness(app: &mut App, id: PlayerId) -> CatchReadiness {
        let entity = app.world().resource::<TeamControl>().entity(id).unwrap();
        app.world().get::<CatchReadiness>(entity).unwrap().clone()
    }

    /// Short receiver windows; the passer never gets a release frame and the
    /// watchdog stays out of the way
    fn short_window_app() -> App {
        test_app_with(GameplayTuning {
            spawn_input_delay: 0.0,
            pass_ready_timeout: 0.2,
            release_watchdog: 30.0,
            ..default()
        })
    }

    fn commit_pass_to_b(app: &mut App) {
        give_object(app.world_mut(), BALL, A).unwrap();
        app.world_mut().resource_mut::<PlayerInput>().press(Button::Pass);
        for _ in 0..31 {
            app.update();
        }
        app.world_mut().resource_mut::<PlayerInput>().release(Button::Pass);
        app.update();
        assert!(readiness(app, B).any_armed());
    }

    fn timeout_disarms(app: &App, zone: &str) -> usize {
        let line = format!("KD|P1|{}|timeout", zone);
        app.world()
            .resource::<EventBus>()
            .processed()
            .iter()
            .filter(|e| strip_timestamp(&e.line()) == line)
            .count()
    }

    fn state(app: &App) -> PossessionState {
        app.world()
            .resource::<PossessionRegistry>()
            .state(BALL)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_pickup_reserves_then_attaches_on_frame() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<PhysicsEvents>()
            .zone(OverlapEdge::Enter, ZoneKind::Pickup, A, BALL);
        app.update();

        assert_eq!(state(&app), PossessionState::Reserved { by: A });
        assert_eq!(activity(&mut app, A), Activity::TakingFullBody);
        let played = app
            .world()
            .resource::<PresentationCommands>()
            .peek()
            .iter()
            .any(|c| matches!(c, PresentationCommand::PlayDiscreteState { player, name } if *player == A && *name == CLIP_TAKE_STILL));
        assert!(played);

        app.world_mut()
            .resource_mut::<AnimationSignals>()
            .push(AnimationSignal::AttachFrame(A));
        app.update();
        assert_eq!(state(&app), PossessionState::Held { by: A });

        app.world_mut()
            .resource_mut::<AnimationStatus>()
            .set(A, CLIP_TAKE_STILL, 1.0);
        app.update();
        assert_eq!(activity(&mut app, A), Activity::Idle);
    }

    #[test]
    fn test_inactive_player_cannot_pick_up() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<PhysicsEvents>()
            .zone(OverlapEdge::Enter, ZoneKind::Pickup, B, BALL);
        app.update();
        assert_eq!(state(&app), PossessionState::Free);
        assert_eq!(activity(&mut app, B), Activity::Idle);
    }

    #[test]
    fn test_pass_commit_hands_off_and_arms_receiver() {
        let mut app = test_app();
        give_object(app.world_mut(), BALL, A).unwrap();

        app.world_mut().resource_mut::<PlayerInput>().press(Button::Pass);
        app.update();
        assert_eq!(activity(&mut app, A), Activity::ChargingPass);
        for _ in 0..30 {
            app.update();
        }
        app.world_mut().resource_mut::<PlayerInput>().release(Button::Pass);
        app.update();

        assert_eq!(activity(&mut app, A), Activity::Locked);
        let team = app.world().resource::<TeamControl>();
        assert_eq!(team.active(), Some(B));
        // The holder keeps pickup until the object leaves the hand
        assert!(team.pickup_enabled(A));
        assert_eq!(
            app.world().resource::<PossessionRegistry>().intended_target(BALL),
            Some(B)
        );
        let ready = readiness(&mut app, B);
        assert!(ready.is_armed(CatchZone::Upper));
        assert!(ready.is_armed(CatchZone::Lower));

        app.world_mut()
            .resource_mut::<AnimationSignals>()
            .push(AnimationSignal::ReleaseFrame(A));
        app.update();
        assert!(state(&app).is_guided());
        assert_eq!(activity(&mut app, A), Activity::ThrowingFullBody);
        assert!(app.world().resource::<TeamControl>().pickup_enabled(B));
    }

    #[test]
    fn test_release_watchdog_forces_throw() {
        let mut app = test_app();
        give_object(app.world_mut(), BALL, A).unwrap();
        app.world_mut().resource_mut::<PlayerInput>().press(Button::Attack);
        app.update();
        app.world_mut().resource_mut::<PlayerInput>().release(Button::Attack);
        app.update();
        assert_eq!(activity(&mut app, A), Activity::Locked);

        // No release frame ever arrives
        for _ in 0..120 {
            app.update();
        }
        assert!(matches!(
            state(&app),
            PossessionState::InFlightBallistic { thrower: A }
        ));
    }

    #[test]
    fn test_receiver_window_times_out_through_deferred_task() {
        let mut app = short_window_app();
        commit_pass_to_b(&mut app);
        let key = TaskKey::new(B, TaskPurpose::CatchReadyTimeout(CatchZone::Upper));
        assert!(app.world().resource::<DeferredTasks>().fire_at(key).is_some());

        for _ in 0..20 {
            app.update();
        }
        assert!(!readiness(&mut app, B).any_armed());
        assert!(app.world().resource::<DeferredTasks>().fire_at(key).is_none());
        assert_eq!(timeout_disarms(&app, "U"), 1);
        assert_eq!(timeout_disarms(&app, "L"), 1);
    }

    #[test]
    fn test_window_held_open_by_object_in_hand_expires_once_hands_empty() {
        let mut app = short_window_app();
        spawn_throwable(app.world_mut(), SPARE, Vec3::new(0.0, 0.1, 8.6));
        give_object(app.world_mut(), SPARE, B).unwrap();
        commit_pass_to_b(&mut app);

        // Timeout fires while B still holds the spare
        for _ in 0..20 {
            app.update();
        }
        assert!(readiness(&mut app, B).is_armed(CatchZone::Upper));
        assert_eq!(timeout_disarms(&app, "U"), 0);

        app.world_mut()
            .resource_scope(|world, mut registry: Mut<PossessionRegistry>| {
                let mut physics = world.resource_mut::<PhysicsCommands>();
                registry.drop_object(SPARE, &mut *physics)
            })
            .unwrap();
        app.update();
        assert!(!readiness(&mut app, B).any_armed());
        assert_eq!(timeout_disarms(&app, "U"), 1);
        assert_eq!(timeout_disarms(&app, "L"), 1);
    }

    #[test]
    fn test_window_survives_timeout_during_catch() {
        let mut app = test_app();
        let entity = app.world().resource::<TeamControl>().entity(B).unwrap();
        let now = app.world().resource::<Time>().elapsed_secs();
        app.world_mut()
            .get_mut::<CatchReadiness>(entity)
            .unwrap()
            .arm(CatchZone::Upper, 0.1, now, Activity::Idle, None);
        app.world_mut().resource_mut::<DeferredTasks>().schedule(
            TaskKey::new(B, TaskPurpose::CatchReadyTimeout(CatchZone::Upper)),
            now + 0.1,
        );
        app.world_mut()
            .get_mut::<ActivityState>(entity)
            .unwrap()
            .set(Activity::CatchingUpper, now);

        for _ in 0..12 {
            app.update();
        }
        assert!(app.world().resource::<DeferredTasks>().is_empty());
        assert!(readiness(&mut app, B).is_armed(CatchZone::Upper));

        app.world_mut()
            .get_mut::<ActivityState>(entity)
            .unwrap()
            .set(Activity::Idle, now);
        app.update();
        assert!(!readiness(&mut app, B).any_armed());
        assert_eq!(timeout_disarms(&app, "U"), 1);
    }
}
