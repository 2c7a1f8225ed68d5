//! Object-player interaction - trigger zones, attach frames and catches

use bevy::prelude::*;

use super::components::ThrowableId;
use super::possession::PossessionError;
use crate::bridge::{OverlapEdge, PhysicsEvent, PhysicsEvents, ZoneEvent, ZoneKind};
use crate::catching::{CatchReadiness, CatchZone, DisarmCause, arm_window, disarm_all, disarm_window};
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::input::InputState;
use crate::player::{Activity, ActivityState, Player, PlayerId, change_activity};
use crate::timers::{TaskKey, TaskPurpose};

fn expiry_key(player: PlayerId) -> TaskKey {
    TaskKey::new(player, TaskPurpose::ReservationExpiry)
}

/// Give up a pending reservation and tell everyone
fn release_reservation(ctx: &mut GameplayParams, player: PlayerId, object: ThrowableId) {
    if ctx.registry.clear_reservation(object, &mut *ctx.physics).is_ok() {
        ctx.tasks.cancel(expiry_key(player));
        ctx.bus.emit(GameEvent::ClearReservation { object, player });
        ctx.refresh_pickups();
    }
}

fn handle_pickup(
    ctx: &mut GameplayParams,
    event: &ZoneEvent,
    moving: bool,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
) {
    let (player, object) = (event.player, event.object);
    if event.edge == OverlapEdge::Exit {
        let busy = activity.current.is_taking() || activity.current.is_catching();
        if !busy && ctx.registry.incoming_for(player) == Some(object) {
            debug!("{} left pickup range of {}", player, object);
            release_reservation(ctx, player, object);
        }
        return;
    }

    if !ctx.team.pickup_enabled(player)
        || activity.current != Activity::Idle
        || ctx.registry.held_by(player).is_some()
        || ctx.registry.incoming_for(player).is_some()
    {
        return;
    }
    let now = ctx.now();
    if let Err(err) = ctx.registry.reserve(object, player, now) {
        // Stay re-fires every tick; only report the first refusal
        if event.edge == OverlapEdge::Enter {
            debug!("{} cannot reserve {}: {}", player, object, err);
            ctx.bus.emit(GameEvent::ReserveFail {
                object,
                player,
                reason: err.code().to_string(),
            });
        }
        return;
    }

    let next = if moving {
        Activity::PickingUp
    } else {
        Activity::TakingFullBody
    };
    if !change_activity(ctx, player, activity, readiness, next) {
        release_reservation(ctx, player, object);
        return;
    }
    ctx.registry.stop_motion(object, &mut *ctx.physics);
    let expires = now + ctx.tuning.reservation_timeout;
    ctx.tasks.schedule(expiry_key(player), expires);
    ctx.tasks
        .cancel(TaskKey::new(player, TaskPurpose::ThrowCooldownEnd));
    ctx.bus.emit(GameEvent::Reserve { object, player });
    info!("{} reserved {} ({:?})", player, object, next);
}

fn handle_pre_catch(
    ctx: &mut GameplayParams,
    event: &ZoneEvent,
    zone: CatchZone,
    activity: &ActivityState,
    readiness: &mut CatchReadiness,
) {
    let (player, object) = (event.player, event.object);
    match event.edge {
        OverlapEdge::Enter => {
            let in_flight = ctx
                .registry
                .state(object)
                .is_some_and(|state| state.is_in_flight());
            if in_flight && ctx.registry.intended_target(object) == Some(player) {
                let timeout = ctx.tuning.pre_catch_timeout;
                arm_window(ctx, player, readiness, activity.current, zone, timeout, Some(object));
            }
        }
        OverlapEdge::Exit => {
            let window = *readiness.window(zone);
            if window.armed && window.tracked == Some(object) {
                disarm_window(ctx, player, readiness, zone, DisarmCause::ZoneExited);
            }
        }
        OverlapEdge::Stay => {}
    }
}

/// Begin catching `object` in `zone`. A take in progress is abandoned first.
pub fn start_catch(
    ctx: &mut GameplayParams,
    player: PlayerId,
    object: ThrowableId,
    zone: CatchZone,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
) -> Result<(), PossessionError> {
    if ctx.registry.intended_target(object) != Some(player) {
        return Err(PossessionError::NotTargeted { object, player });
    }
    if let Some(pending) = ctx.registry.incoming_for(player)
        && pending != object
        && activity.current.is_taking()
    {
        info!("{} drops take of {} to catch {}", player, pending, object);
        release_reservation(ctx, player, pending);
    }
    ctx.registry.begin_catch(object, player, &mut *ctx.physics)?;

    disarm_all(ctx, player, readiness, DisarmCause::CatchBegan);
    change_activity(ctx, player, activity, readiness, zone.catching_activity());
    let expires = ctx.now() + ctx.tuning.reservation_timeout;
    ctx.tasks.schedule(expiry_key(player), expires);
    ctx.bus.emit(GameEvent::CatchBegin {
        player,
        zone,
        object,
    });
    info!("{} catching {} ({})", player, object, zone);
    Ok(())
}

fn handle_catch(
    ctx: &mut GameplayParams,
    event: &ZoneEvent,
    zone: CatchZone,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
) {
    if event.edge == OverlapEdge::Exit
        || !readiness.is_armed(zone)
        || !activity.current.can_transition_to(zone.catching_activity())
    {
        return;
    }
    if let Err(err) = start_catch(ctx, event.player, event.object, zone, activity, readiness) {
        debug!("{} cannot catch {}: {}", event.player, event.object, err);
    }
}

/// Apply trigger and settle reports from the physics collaborator.
///
/// Settles first, then zone events ordered by zone priority (catch before
/// pickup before pre-catch), roster order and object id, so same-tick
/// contention always resolves the same way.
pub fn process_physics_events(
    mut ctx: GameplayParams,
    mut inbox: ResMut<PhysicsEvents>,
    mut players: Query<(&Player, &InputState, &mut ActivityState, &mut CatchReadiness)>,
) {
    if inbox.is_empty() {
        return;
    }
    let mut zone_events = Vec::new();
    for event in inbox.drain() {
        match event {
            PhysicsEvent::Settled(object) => {
                if ctx.registry.settle(object).is_ok() {
                    ctx.bus.emit(GameEvent::Settle { object });
                }
            }
            PhysicsEvent::Zone(zone_event) => zone_events.push(zone_event),
        }
    }
    zone_events.sort_by_key(|e| (e.zone.priority(), ctx.team.order_of(e.player), e.object));

    for event in zone_events {
        let Some(entity) = ctx.team.entity(event.player) else {
            continue;
        };
        let Ok((_, input, mut activity, mut readiness)) = players.get_mut(entity) else {
            continue;
        };
        match event.zone {
            ZoneKind::Catch(zone) => handle_catch(&mut ctx, &event, zone, &mut activity, &mut readiness),
            ZoneKind::Pickup => handle_pickup(
                &mut ctx,
                &event,
                input.is_moving(),
                &mut activity,
                &mut readiness,
            ),
            ZoneKind::PreCatch(zone) => {
                handle_pre_catch(&mut ctx, &event, zone, &activity, &mut readiness)
            }
        }
    }
}

/// Attach frame of a take or catch clip: the reserved object goes to hand
pub fn on_attach_frame(
    ctx: &mut GameplayParams,
    player: PlayerId,
    activity: &ActivityState,
    readiness: &mut CatchReadiness,
) -> bool {
    let Some(object) = ctx.registry.incoming_for(player) else {
        debug!("{} attach frame with nothing reserved", player);
        return false;
    };
    if !(activity.current.is_taking() || activity.current.is_catching()) {
        debug!("{} attach frame during {:?} ignored", player, activity.current);
        return false;
    }
    if let Err(err) = ctx.registry.attach(object, player, &mut *ctx.physics) {
        debug!("{} failed to attach {}: {}", player, object, err);
        return false;
    }
    ctx.tasks.cancel(expiry_key(player));
    disarm_all(ctx, player, readiness, DisarmCause::Attached);
    ctx.refresh_pickups();
    ctx.bus.emit(GameEvent::Attach { object, player });
    info!("{} now holds {}", player, object);
    true
}

/// A reservation that never reached its attach frame is dropped
pub fn on_reservation_expiry(ctx: &mut GameplayParams, player: PlayerId) {
    let Some(object) = ctx.registry.incoming_for(player) else {
        debug!("{} stale reservation expiry ignored", player);
        return;
    };
    if ctx.registry.drop_object(object, &mut *ctx.physics).is_ok() {
        info!("{} reservation of {} expired", player, object);
        ctx.bus.emit(GameEvent::Drop { object, player });
        ctx.refresh_pickups();
    }
}
