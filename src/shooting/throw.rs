//! Throw intent systems - charge, commit and release

use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use super::charge::{ChargeChannel, ChargeProfile, ChargeResult, IntentRejected, ThrowCommit, ThrowIntent};
use super::targeting::{PassCandidate, ThrowPlan, choose_pass_target, resolve_destination, select_plan};
use super::trajectory::{FlightMode, SolveError, solve_arc_apex, solve_constant_time};
use crate::ball::{GuidedPass, PossessionError, ThrowableId};
use crate::bridge::{PresentationSink, SightBlockers};
use crate::catching::{CatchReadiness, CatchZone, arm_window};
use crate::constants::*;
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::input::{Button, ButtonEdge, InputState};
use crate::player::{
    Activity, ActivityState, PassTargeting, Player, PlayerBody, PlayerId, change_activity,
};
use crate::timers::{TaskKey, TaskPurpose};

/// Live upper catch point per player, sampled before a system mutates anything
pub type CatchPoints = HashMap<PlayerId, Vec3>;

#[derive(Debug, Error)]
pub enum ReleaseFailure {
    #[error(transparent)]
    Possession(#[from] PossessionError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}

fn channel_for(button: Button) -> Option<ChargeChannel> {
    match button {
        Button::Pass => Some(ChargeChannel::Pass),
        Button::Attack => Some(ChargeChannel::Attack),
        Button::SwitchPlayer => None,
    }
}

fn charging_activity(channel: ChargeChannel) -> Activity {
    match channel {
        ChargeChannel::Pass => Activity::ChargingPass,
        ChargeChannel::Attack => Activity::ChargingAttack,
    }
}

fn begin_charge(
    ctx: &mut GameplayParams,
    player: PlayerId,
    channel: ChargeChannel,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    intent: &mut ThrowIntent,
) -> Result<(), IntentRejected> {
    if ctx.registry.held_by(player).is_none() {
        return Err(IntentRejected::NotHolding);
    }
    intent.check_free()?;
    let next = charging_activity(channel);
    if !activity.current.can_transition_to(next) {
        return Err(IntentRejected::ActivityBusy);
    }
    let now = ctx.now();
    intent.begin(channel, now)?;
    change_activity(ctx, player, activity, readiness, next);
    ctx.bus.emit(GameEvent::ChargeStart { player, channel });
    Ok(())
}

/// Commit a released charge: pick the plan, lock the intent and start the
/// throw clip. Returns the receiver and object when a pass was committed.
#[allow(clippy::too_many_arguments)]
fn commit_throw(
    ctx: &mut GameplayParams,
    player: PlayerId,
    body: &PlayerBody,
    targeting: &PassTargeting,
    moving: bool,
    channel: ChargeChannel,
    result: ChargeResult,
    candidates: &[PassCandidate],
    sight: &SightBlockers,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    intent: &mut ThrowIntent,
) -> Option<(PlayerId, ThrowableId)> {
    let Some(object) = ctx.registry.held_by(player) else {
        cancel_charge(ctx, player, activity, readiness, intent);
        return None;
    };
    let target = match channel {
        ChargeChannel::Pass => choose_pass_target(
            player,
            body,
            targeting.configured,
            candidates,
            ctx.tuning.auto_select_pass_target,
        ),
        ChargeChannel::Attack => None,
    };
    let (plan, failure) = select_plan(channel, &result, body, target.as_ref(), &ctx.tuning, sight);
    if channel == ChargeChannel::Pass {
        ctx.bus.emit(GameEvent::PassGate {
            player,
            target: target.map(|t| t.id),
            passed: failure.is_none(),
            reason: failure,
        });
    }

    let now = ctx.now();
    intent.lock(ThrowCommit {
        channel,
        result,
        plan,
        moving,
        committed_at: now,
    });
    change_activity(ctx, player, activity, readiness, Activity::Locked);
    let clip = if moving { CLIP_THROW_MOVING } else { CLIP_THROW_STILL };
    ctx.presentation.play_discrete_state(player, clip);
    ctx.presentation
        .set_continuous_param(player, PARAM_CHARGE_POWER, result.power);
    let watchdog = now + ctx.tuning.release_watchdog;
    ctx.tasks
        .schedule(TaskKey::new(player, TaskPurpose::ReleaseWatchdog), watchdog);
    ctx.bus.emit(GameEvent::ChargeCommit {
        player,
        channel,
        power: result.power,
        charge: result.charge01,
        tap: result.profile == ChargeProfile::Tap,
    });
    info!("{} committed {} throw: {:?}", player, channel, plan);

    let ThrowPlan::Pass { target } = plan else {
        return None;
    };
    if let Err(err) = ctx.registry.designate_target(object, player, target) {
        debug!("{} could not designate {}: {}", player, target, err);
        return None;
    }
    if let Err(err) = ctx.switch_control(target) {
        warn!("handoff to {} failed: {}", target, err);
    }
    Some((target, object))
}

fn cancel_charge(
    ctx: &mut GameplayParams,
    player: PlayerId,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    intent: &mut ThrowIntent,
) {
    if intent.cancel() {
        ctx.presentation
            .set_continuous_param(player, PARAM_CHARGE_POWER, 0.0);
        ctx.bus.emit(GameEvent::ChargeCancel { player });
        change_activity(ctx, player, activity, readiness, Activity::Idle);
    }
}

/// Turn button edges into charge and commit transitions, and export the
/// live charge power while a button is held
pub fn update_throw_intent(
    mut ctx: GameplayParams,
    sight: Res<SightBlockers>,
    mut players: Query<(
        &Player,
        &PlayerBody,
        &PassTargeting,
        &mut InputState,
        &mut ActivityState,
        &mut CatchReadiness,
        &mut ThrowIntent,
    )>,
) {
    let now = ctx.now();
    let candidates: Vec<PassCandidate> = players
        .iter()
        .map(|(player, body, ..)| PassCandidate {
            id: player.id,
            catch_point: body.catch_point(),
        })
        .collect();
    let mut passes = Vec::new();

    for (player, body, targeting, mut input, mut activity, mut readiness, mut intent) in &mut players {
        let id = player.id;
        if ctx.registry.held_by(id).is_none() && intent.charging_channel().is_some() {
            debug!("{} lost its object while charging", id);
            cancel_charge(&mut ctx, id, &mut activity, &mut readiness, &mut intent);
        }

        let moving = input.is_moving();
        for edge in input.take_edges() {
            match edge {
                ButtonEdge::Down(button) => {
                    let Some(channel) = channel_for(button) else {
                        continue;
                    };
                    if let Err(reason) =
                        begin_charge(&mut ctx, id, channel, &mut activity, &mut readiness, &mut intent)
                    {
                        debug!("{} {} charge rejected: {}", id, channel, reason);
                    }
                }
                ButtonEdge::Up(button) => {
                    let Some(channel) = channel_for(button) else {
                        continue;
                    };
                    let Some(result) = intent.release(channel, now, &ctx.tuning) else {
                        continue;
                    };
                    if let Some(pass) = commit_throw(
                        &mut ctx,
                        id,
                        body,
                        targeting,
                        moving,
                        channel,
                        result,
                        &candidates,
                        &sight,
                        &mut activity,
                        &mut readiness,
                        &mut intent,
                    ) {
                        passes.push(pass);
                    }
                }
            }
        }

        if let Some(power) = intent.preview_power(now, &ctx.tuning) {
            ctx.presentation
                .set_continuous_param(id, PARAM_CHARGE_POWER, power);
        }
    }

    // Receivers get ready on both zones for the object headed their way
    let timeout = ctx.tuning.pass_ready_timeout;
    for (target, object) in passes {
        let Some(entity) = ctx.team.entity(target) else {
            continue;
        };
        let Ok((_, _, _, _, activity, mut readiness, _)) = players.get_mut(entity) else {
            continue;
        };
        let current = activity.current;
        for zone in CatchZone::ALL {
            arm_window(&mut ctx, target, &mut readiness, current, zone, timeout, Some(object));
        }
    }
}

fn launch(
    ctx: &mut GameplayParams,
    player: PlayerId,
    object: ThrowableId,
    commit: &ThrowCommit,
    origin: Vec3,
    destination: Vec3,
) -> Result<(), ReleaseFailure> {
    let now = ctx.now();
    let gravity = ctx.tuning.gravity;
    match commit.plan {
        ThrowPlan::Pass { target } if ctx.tuning.pass_flight_mode == FlightMode::Guided => {
            let pass = GuidedPass {
                thrower: player,
                target,
                start: origin,
                catch_point: destination,
                arc_height: ctx.tuning.pass_arc_height,
                duration: ctx.tuning.guided_duration(origin.distance(destination)),
            };
            let flight = ctx
                .registry
                .start_guided_pass(object, pass, now, &mut *ctx.physics)?;
            ctx.bus.emit(GameEvent::GuidedStart {
                object,
                thrower: player,
                target,
                duration: flight.duration,
            });
            info!("{} guided pass {} to {} over {:.2}s", player, object, target, flight.duration);
        }
        ThrowPlan::Pass { target } => {
            let arc = ctx.tuning.pass_arc_height.max(ARC_EPSILON);
            let velocity = solve_arc_apex(origin, destination, arc, gravity)?;
            ctx.registry
                .release(object, player, velocity, Some(target), now, &mut *ctx.physics)?;
            ctx.bus.emit(GameEvent::Release {
                object,
                thrower: player,
                target: Some(target),
                power: commit.result.power,
                speed: velocity.length(),
            });
            info!("{} lobbed {} to {}", player, object, target);
        }
        ThrowPlan::Forward { .. } => {
            let flight_time = commit.result.flight_time.max(MIN_FLIGHT_TIME);
            let velocity = solve_constant_time(origin, destination, flight_time, gravity)?;
            ctx.registry
                .release(object, player, velocity, None, now, &mut *ctx.physics)?;
            ctx.bus.emit(GameEvent::Release {
                object,
                thrower: player,
                target: None,
                power: commit.result.power,
                speed: velocity.length(),
            });
            info!("{} threw {} at {:.1} m/s", player, object, velocity.length());
        }
    }
    Ok(())
}

/// Release frame: compute the launch, hand the object to flight and start
/// the cooldown. Returns whether the object left the hand.
pub fn release_throw(
    ctx: &mut GameplayParams,
    player: PlayerId,
    body: &PlayerBody,
    catch_points: &CatchPoints,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    intent: &mut ThrowIntent,
) -> bool {
    let Some(commit) = intent.take_commit() else {
        debug!("{} release frame without a committed throw", player);
        return false;
    };
    ctx.tasks
        .cancel(TaskKey::new(player, TaskPurpose::ReleaseWatchdog));
    ctx.presentation
        .set_continuous_param(player, PARAM_CHARGE_POWER, 0.0);

    let Some(object) = ctx.registry.held_by(player) else {
        debug!("{} lost its object before the release frame", player);
        change_activity(ctx, player, activity, readiness, Activity::Idle);
        return false;
    };
    let origin = body.release_origin();
    let target_point = match commit.plan {
        ThrowPlan::Pass { target } => catch_points.get(&target).copied(),
        ThrowPlan::Forward { .. } => None,
    };
    let destination = resolve_destination(&commit.plan, body, target_point, &ctx.tuning);

    if let Err(err) = launch(ctx, player, object, &commit, origin, destination) {
        warn!("{} failed to release {}: {}", player, object, err);
        change_activity(ctx, player, activity, readiness, Activity::Idle);
        return false;
    }

    ctx.refresh_pickups();
    let cooldown_end = ctx.registry.throw_cooldown_until(player);
    ctx.tasks
        .schedule(TaskKey::new(player, TaskPurpose::ThrowCooldownEnd), cooldown_end);
    let next = if commit.moving {
        Activity::ThrowingUpper
    } else {
        Activity::ThrowingFullBody
    };
    change_activity(ctx, player, activity, readiness, next);
    true
}

/// The release frame never arrived; force the release if still locked
pub fn on_release_watchdog(
    ctx: &mut GameplayParams,
    player: PlayerId,
    body: &PlayerBody,
    catch_points: &CatchPoints,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    intent: &mut ThrowIntent,
) {
    if activity.current != Activity::Locked || intent.locked().is_none() {
        debug!("{} stale release watchdog ignored", player);
        return;
    }
    warn!("{} release frame missing, forcing release", player);
    release_throw(ctx, player, body, catch_points, activity, readiness, intent);
}
