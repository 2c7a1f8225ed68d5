//! Headless collaborators - stand-in physics and animation for simulations
//! and scenario tests
//!
//! [`HeadlessArena`] plays the physics engine: it applies queued commands,
//! integrates loose objects over a flat ground, keeps held objects in hand and
//! reports trigger overlaps. [`ScriptedAnimator`] plays named clips with fixed
//! durations and raises attach/release frames at fixed fractions.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::ball::{PossessionRegistry, ThrowableId};
use crate::bridge::{
    AnimationSignal, AnimationSignals, AnimationStatus, ObjectTransforms, OverlapEdge,
    PhysicsCommand, PhysicsCommands, PhysicsEvent, PhysicsEvents, PresentationCommand,
    PresentationCommands, ZoneKind,
};
use crate::catching::CatchZone;
use crate::constants::*;
use crate::gameplay::GameplaySet;
use crate::input::InputState;
use crate::player::{ActivityState, Player, PlayerBody, PlayerId};

#[derive(Debug, Clone)]
struct ObjectBody {
    position: Vec3,
    velocity: Vec3,
    kinematic: bool,
    collision: bool,
    hand: Option<PlayerId>,
    resting: bool,
}

impl ObjectBody {
    fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            kinematic: false,
            collision: true,
            hand: None,
            resting: false,
        }
    }
}

type Overlap = (PlayerId, ZoneKind, ThrowableId);

/// Flat-ground physics with spherical trigger zones around each player
#[derive(Resource, Default, Debug)]
pub struct HeadlessArena {
    bodies: HashMap<ThrowableId, ObjectBody>,
    pickup_disabled: HashSet<PlayerId>,
    overlaps: HashSet<Overlap>,
}

impl HeadlessArena {
    pub fn position(&self, object: ThrowableId) -> Option<Vec3> {
        self.bodies.get(&object).map(|b| b.position)
    }

    pub fn pickup_enabled(&self, player: PlayerId) -> bool {
        !self.pickup_disabled.contains(&player)
    }

    fn apply(&mut self, command: PhysicsCommand) {
        if let PhysicsCommand::SetPickupArea { player, enabled } = command {
            if enabled {
                self.pickup_disabled.remove(&player);
            } else {
                self.pickup_disabled.insert(player);
            }
            return;
        }
        let object = match command {
            PhysicsCommand::SetKinematic { object, .. }
            | PhysicsCommand::SetVelocity { object, .. }
            | PhysicsCommand::MoveTo { object, .. }
            | PhysicsCommand::EnableCollision { object, .. }
            | PhysicsCommand::AttachToHand { object, .. }
            | PhysicsCommand::Detach { object } => object,
            PhysicsCommand::SetPickupArea { .. } => return,
        };
        let body = self
            .bodies
            .entry(object)
            .or_insert_with(|| ObjectBody::at(Vec3::ZERO));
        match command {
            PhysicsCommand::SetKinematic { kinematic, .. } => body.kinematic = kinematic,
            PhysicsCommand::SetVelocity { velocity, .. } => {
                body.velocity = velocity;
                body.resting = false;
            }
            PhysicsCommand::MoveTo { position, .. } => body.position = position,
            PhysicsCommand::EnableCollision { enabled, .. } => body.collision = enabled,
            PhysicsCommand::AttachToHand { player, .. } => {
                body.hand = Some(player);
                body.velocity = Vec3::ZERO;
            }
            PhysicsCommand::Detach { .. } => body.hand = None,
            PhysicsCommand::SetPickupArea { .. } => {}
        }
    }

    /// Gravity, ground bounce and friction for one loose body.
    /// Returns true on the tick it comes to rest.
    fn integrate(body: &mut ObjectBody, dt: f32) -> bool {
        if body.resting {
            return false;
        }
        body.velocity.y += GRAVITY * dt;
        body.position += body.velocity * dt;
        if body.position.y <= OBJECT_RADIUS {
            body.position.y = OBJECT_RADIUS;
            if body.velocity.y < 0.0 {
                body.velocity.y = -body.velocity.y * GROUND_BOUNCE;
                body.velocity.x *= GROUND_FRICTION;
                body.velocity.z *= GROUND_FRICTION;
            }
            if body.velocity.length() < SETTLE_SPEED {
                body.velocity = Vec3::ZERO;
                body.resting = true;
                return true;
            }
        }
        false
    }
}

fn zone_contains(kind: ZoneKind, body: &PlayerBody, point: Vec3) -> bool {
    let zone_point = |zone: CatchZone| match zone {
        CatchZone::Upper => body.catch_point(),
        CatchZone::Lower => body.lower_catch_point(),
    };
    match kind {
        ZoneKind::Pickup => point.distance(body.position) <= PICKUP_RADIUS,
        ZoneKind::PreCatch(zone) => point.distance(zone_point(zone)) <= PRE_CATCH_RADIUS,
        ZoneKind::Catch(zone) => point.distance(zone_point(zone)) <= CATCH_RADIUS,
    }
}

const ZONES: [ZoneKind; 5] = [
    ZoneKind::Catch(CatchZone::Upper),
    ZoneKind::Catch(CatchZone::Lower),
    ZoneKind::Pickup,
    ZoneKind::PreCatch(CatchZone::Upper),
    ZoneKind::PreCatch(CatchZone::Lower),
];

/// Drain the physics outbox into the arena
pub fn apply_physics_commands(
    mut arena: ResMut<HeadlessArena>,
    mut commands: ResMut<PhysicsCommands>,
) {
    for command in commands.drain() {
        arena.apply(command);
    }
}

/// Move the arena forward one tick and report settles and zone overlaps
pub fn step_arena(
    time: Res<Time>,
    mut arena: ResMut<HeadlessArena>,
    registry: Res<PossessionRegistry>,
    mut transforms: ResMut<ObjectTransforms>,
    mut events: ResMut<PhysicsEvents>,
    players: Query<(&Player, &PlayerBody)>,
) {
    let dt = time.delta_secs();
    let bodies: HashMap<PlayerId, &PlayerBody> =
        players.iter().map(|(player, body)| (player.id, body)).collect();

    for (object, _) in registry.objects() {
        if !arena.bodies.contains_key(&object) {
            let start = transforms.position(object).unwrap_or(Vec3::ZERO);
            arena.bodies.insert(object, ObjectBody::at(start));
        }
    }

    let mut ids: Vec<ThrowableId> = arena.bodies.keys().copied().collect();
    ids.sort();
    for &object in &ids {
        let Some(body) = arena.bodies.get_mut(&object) else {
            continue;
        };
        if let Some(holder) = body.hand {
            if let Some(player_body) = bodies.get(&holder) {
                body.position = player_body.release_origin();
            }
            body.velocity = Vec3::ZERO;
        } else if !body.kinematic && HeadlessArena::integrate(body, dt) {
            events.push(PhysicsEvent::Settled(object));
        }
        transforms.set(object, body.position, body.velocity);
    }

    let mut current = HashSet::new();
    for (&player, player_body) in &bodies {
        for &object in &ids {
            let Some(body) = arena.bodies.get(&object) else {
                continue;
            };
            if body.hand.is_some() || (!body.collision && !body.kinematic) {
                continue;
            }
            let in_flight = registry.state(object).is_some_and(|s| s.is_in_flight());
            for kind in ZONES {
                let active = match kind {
                    ZoneKind::Pickup => arena.pickup_enabled(player),
                    _ => in_flight,
                };
                if active && zone_contains(kind, player_body, body.position) {
                    current.insert((player, kind, object));
                }
            }
        }
    }

    let mut edges: Vec<(OverlapEdge, Overlap)> = current
        .iter()
        .map(|overlap| {
            let edge = if arena.overlaps.contains(overlap) {
                OverlapEdge::Stay
            } else {
                OverlapEdge::Enter
            };
            (edge, *overlap)
        })
        .chain(
            arena
                .overlaps
                .difference(&current)
                .map(|overlap| (OverlapEdge::Exit, *overlap)),
        )
        .collect();
    edges.sort_by_key(|(edge, (player, kind, object))| (*player, *kind, *object, *edge));
    for (edge, (player, kind, object)) in edges {
        events.zone(edge, kind, player, object);
    }
    arena.overlaps = current;
}

/// Stand-in locomotion: the moving player walks along its input direction
/// unless a full-body action roots it
pub fn move_players(
    time: Res<Time>,
    mut players: Query<(&InputState, &ActivityState, &mut PlayerBody)>,
) {
    let dt = time.delta_secs();
    for (input, activity, mut body) in &mut players {
        if !input.is_moving() || activity.current.is_full_body() {
            continue;
        }
        let step = Vec3::new(input.move_dir.x, 0.0, input.move_dir.y) * MOVE_SPEED * dt;
        let target = body.position + step;
        body.face(target);
        body.position = target;
    }
}

/// Clip length and the normalized time of its frame marker
pub fn clip_timing(name: &str) -> (f32, Option<f32>) {
    match name {
        CLIP_TAKE_MOVING => (0.6, Some(0.45)),
        CLIP_TAKE_STILL => (0.8, Some(0.5)),
        CLIP_CATCH_UPPER => (0.5, Some(0.3)),
        CLIP_CATCH_LOWER => (0.6, Some(0.35)),
        CLIP_THROW_MOVING => (0.5, Some(0.4)),
        CLIP_THROW_STILL => (0.7, Some(0.45)),
        _ => (0.5, None),
    }
}

fn frame_signal(name: &str, player: PlayerId) -> AnimationSignal {
    match name {
        CLIP_THROW_MOVING | CLIP_THROW_STILL => AnimationSignal::ReleaseFrame(player),
        _ => AnimationSignal::AttachFrame(player),
    }
}

#[derive(Debug, Clone)]
struct Playback {
    name: &'static str,
    started: f32,
    duration: f32,
    marker: Option<f32>,
    marker_sent: bool,
}

/// Plays the clips the core requests and reports their progress
#[derive(Resource, Default, Debug)]
pub struct ScriptedAnimator {
    playing: HashMap<PlayerId, Playback>,
    params: HashMap<(PlayerId, &'static str), f32>,
    layers: HashMap<(PlayerId, &'static str), f32>,
}

impl ScriptedAnimator {
    pub fn param(&self, player: PlayerId, name: &'static str) -> f32 {
        self.params.get(&(player, name)).copied().unwrap_or(0.0)
    }

    pub fn layer_weight(&self, player: PlayerId, layer: &'static str) -> f32 {
        self.layers.get(&(player, layer)).copied().unwrap_or(0.0)
    }

    pub fn current_clip(&self, player: PlayerId) -> Option<&'static str> {
        self.playing.get(&player).map(|p| p.name)
    }
}

pub fn run_scripted_animator(
    time: Res<Time>,
    mut animator: ResMut<ScriptedAnimator>,
    mut commands: ResMut<PresentationCommands>,
    mut status: ResMut<AnimationStatus>,
    mut signals: ResMut<AnimationSignals>,
) {
    let now = time.elapsed_secs();
    for command in commands.drain() {
        match command {
            PresentationCommand::PlayDiscreteState { player, name } => {
                let (duration, marker) = clip_timing(name);
                animator.playing.insert(
                    player,
                    Playback {
                        name,
                        started: now,
                        duration,
                        marker,
                        marker_sent: false,
                    },
                );
            }
            PresentationCommand::SetContinuousParam {
                player,
                name,
                value,
            } => {
                animator.params.insert((player, name), value);
            }
            PresentationCommand::SetLayerWeight {
                player,
                layer,
                weight,
            } => {
                animator.layers.insert((player, layer), weight);
            }
        }
    }

    let mut players: Vec<PlayerId> = animator.playing.keys().copied().collect();
    players.sort();
    for player in players {
        let Some(playback) = animator.playing.get_mut(&player) else {
            continue;
        };
        let progress = ((now - playback.started) / playback.duration).clamp(0.0, 1.0);
        status.set(player, playback.name, progress);
        if let Some(marker) = playback.marker
            && !playback.marker_sent
            && progress >= marker
        {
            playback.marker_sent = true;
            signals.push(frame_signal(playback.name, player));
        }
    }
}

/// Installs the arena and animator ahead of the core systems
pub struct HeadlessCollaboratorsPlugin;

impl Plugin for HeadlessCollaboratorsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HeadlessArena>()
            .init_resource::<ScriptedAnimator>()
            .add_systems(
                Update,
                (
                    run_scripted_animator,
                    apply_physics_commands,
                    move_players,
                    step_arena,
                )
                    .chain()
                    .in_set(GameplaySet::Collaborators),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_object_bounces_then_rests() {
        let mut body = ObjectBody::at(Vec3::new(0.0, 2.0, 0.0));
        let mut rested_after = None;
        for tick in 0..600 {
            if HeadlessArena::integrate(&mut body, 1.0 / 60.0) {
                rested_after = Some(tick);
                break;
            }
            assert!(body.position.y >= OBJECT_RADIUS);
        }
        assert!(rested_after.is_some());
        assert_eq!(body.velocity, Vec3::ZERO);
        // Resting bodies stay put and report rest once
        assert!(!HeadlessArena::integrate(&mut body, 1.0 / 60.0));
    }

    #[test]
    fn test_pickup_area_toggle() {
        let mut arena = HeadlessArena::default();
        let player = PlayerId(3);
        assert!(arena.pickup_enabled(player));
        arena.apply(PhysicsCommand::SetPickupArea {
            player,
            enabled: false,
        });
        assert!(!arena.pickup_enabled(player));
        arena.apply(PhysicsCommand::SetPickupArea {
            player,
            enabled: true,
        });
        assert!(arena.pickup_enabled(player));
    }

    #[test]
    fn test_zone_radii() {
        let body = PlayerBody::new(Vec3::ZERO, Vec3::Z);
        assert!(zone_contains(ZoneKind::Pickup, &body, Vec3::new(0.0, OBJECT_RADIUS, 0.8)));
        assert!(!zone_contains(ZoneKind::Pickup, &body, Vec3::new(0.0, 0.0, 3.0)));
        let chest = body.catch_point() + Vec3::Z * 0.5;
        assert!(zone_contains(ZoneKind::Catch(CatchZone::Upper), &body, chest));
        assert!(zone_contains(ZoneKind::PreCatch(CatchZone::Upper), &body, chest + Vec3::Z * 4.0));
        assert!(!zone_contains(ZoneKind::Catch(CatchZone::Upper), &body, chest + Vec3::Z * 4.0));
    }

    #[test]
    fn test_throw_clips_release_others_attach() {
        let player = PlayerId(0);
        assert_eq!(
            frame_signal(CLIP_THROW_STILL, player),
            AnimationSignal::ReleaseFrame(player)
        );
        assert_eq!(
            frame_signal(CLIP_CATCH_LOWER, player),
            AnimationSignal::AttachFrame(player)
        );
        let (duration, marker) = clip_timing(CLIP_TAKE_STILL);
        assert!(marker.is_some_and(|m| m < 1.0) && duration > 0.0);
    }
}
