//! Player activity - one tagged state per player with an explicit transition table

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::components::{Player, PlayerId};
use crate::bridge::{AnimationGate, AnimationStatus, PresentationSink};
use crate::catching::{CatchReadiness, DisarmCause, disarm_all};
use crate::constants::*;
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::timers::{TaskKey, TaskPurpose};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[default]
    Idle,
    /// Upper-body take while moving
    PickingUp,
    /// Full-body take while standing
    TakingFullBody,
    CatchingUpper,
    CatchingLower,
    ChargingPass,
    ChargingAttack,
    /// Throw committed, waiting for the release frame
    Locked,
    ThrowingUpper,
    ThrowingFullBody,
}

impl Activity {
    /// Actions that occupy the whole body and exclude catch readiness
    pub fn is_full_body(self) -> bool {
        matches!(
            self,
            Activity::PickingUp
                | Activity::TakingFullBody
                | Activity::CatchingUpper
                | Activity::CatchingLower
                | Activity::ThrowingFullBody
        )
    }

    pub fn is_catching(self) -> bool {
        matches!(self, Activity::CatchingUpper | Activity::CatchingLower)
    }

    pub fn is_taking(self) -> bool {
        matches!(self, Activity::PickingUp | Activity::TakingFullBody)
    }

    pub fn is_charging(self) -> bool {
        matches!(self, Activity::ChargingPass | Activity::ChargingAttack)
    }

    /// Allowed transitions. Catches may cut a take short; nothing else interrupts.
    pub fn can_transition_to(self, next: Activity) -> bool {
        use Activity::*;
        match (self, next) {
            (Idle, Idle) => false,
            (_, Idle) => true,
            (Idle, _) => !matches!(next, Locked | ThrowingUpper | ThrowingFullBody),
            (PickingUp | TakingFullBody, CatchingUpper | CatchingLower) => true,
            (ChargingPass | ChargingAttack, Locked) => true,
            (Locked, ThrowingUpper | ThrowingFullBody) => true,
            _ => false,
        }
    }

    /// Clip requested when the activity starts
    pub fn entry_clip(self) -> Option<&'static str> {
        match self {
            Activity::PickingUp => Some(CLIP_TAKE_MOVING),
            Activity::TakingFullBody => Some(CLIP_TAKE_STILL),
            Activity::CatchingUpper => Some(CLIP_CATCH_UPPER),
            Activity::CatchingLower => Some(CLIP_CATCH_LOWER),
            _ => None,
        }
    }

    /// Clip whose completion returns the player to Idle
    pub fn completion_clip(self) -> Option<&'static str> {
        match self {
            Activity::ThrowingUpper => Some(CLIP_THROW_MOVING),
            Activity::ThrowingFullBody => Some(CLIP_THROW_STILL),
            other => other.entry_clip(),
        }
    }

    /// Upper-body layer driven while the activity runs
    pub fn layer(self) -> Option<&'static str> {
        match self {
            Activity::PickingUp => Some(LAYER_TAKE),
            Activity::CatchingUpper | Activity::CatchingLower => Some(LAYER_CATCH),
            Activity::Locked | Activity::ThrowingUpper => Some(LAYER_THROW),
            _ => None,
        }
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct ActivityState {
    pub current: Activity,
    /// Time the current activity began
    pub since: f32,
}

impl ActivityState {
    pub fn set(&mut self, next: Activity, now: f32) {
        self.current = next;
        self.since = now;
    }
}

/// Move a player to `next` if the table allows it.
///
/// Starts the entry clip, swaps layer weights, and closes catch windows when
/// the new activity is full-body.
pub fn change_activity(
    ctx: &mut GameplayParams,
    player: PlayerId,
    activity: &mut ActivityState,
    readiness: &mut CatchReadiness,
    next: Activity,
) -> bool {
    let previous = activity.current;
    if !previous.can_transition_to(next) {
        debug!("{} cannot go from {:?} to {:?}", player, previous, next);
        return false;
    }
    if next.is_full_body() {
        disarm_all(ctx, player, readiness, DisarmCause::FullBodyAction);
    }
    activity.set(next, ctx.now());

    if let Some(layer) = previous.layer()
        && previous.layer() != next.layer()
    {
        ctx.presentation.set_layer_weight(player, layer, 0.0);
    }
    if let Some(layer) = next.layer() {
        ctx.presentation.set_layer_weight(player, layer, 1.0);
    }
    if let Some(clip) = next.entry_clip() {
        ctx.presentation.play_discrete_state(player, clip);
    }
    true
}

/// Return players to Idle once the clip that defines their activity finishes.
///
/// Clip status lags one tick behind play requests, so an activity is never
/// completed on the tick it started. A take or catch that ends without its
/// attach frame drops the reserved object.
pub fn clear_finished_actions(
    mut ctx: GameplayParams,
    gate: Res<AnimationStatus>,
    mut players: Query<(&Player, &mut ActivityState, &mut CatchReadiness)>,
) {
    let now = ctx.now();
    for (player, mut activity, mut readiness) in &mut players {
        let Some(clip) = activity.current.completion_clip() else {
            continue;
        };
        if activity.since >= now || !gate.clip_finished(player.id, clip) {
            continue;
        }

        if (activity.current.is_taking() || activity.current.is_catching())
            && let Some(object) = ctx.registry.incoming_for(player.id)
        {
            ctx.tasks
                .cancel(TaskKey::new(player.id, TaskPurpose::ReservationExpiry));
            if ctx.registry.drop_object(object, &mut *ctx.physics).is_ok() {
                info!("{} finished {} without attaching {}", player.id, clip, object);
                ctx.bus.emit(GameEvent::Drop {
                    object,
                    player: player.id,
                });
                ctx.refresh_pickups();
            }
        }
        change_activity(
            &mut ctx,
            player.id,
            &mut activity,
            &mut readiness,
            Activity::Idle,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_body_set() {
        assert!(Activity::PickingUp.is_full_body());
        assert!(Activity::TakingFullBody.is_full_body());
        assert!(Activity::CatchingLower.is_full_body());
        assert!(Activity::ThrowingFullBody.is_full_body());
        assert!(!Activity::ThrowingUpper.is_full_body());
        assert!(!Activity::ChargingPass.is_full_body());
        assert!(!Activity::Locked.is_full_body());
    }

    #[test]
    fn test_throw_sequence_transitions() {
        assert!(Activity::Idle.can_transition_to(Activity::ChargingAttack));
        assert!(Activity::ChargingAttack.can_transition_to(Activity::Locked));
        assert!(Activity::Locked.can_transition_to(Activity::ThrowingFullBody));
        assert!(Activity::ThrowingFullBody.can_transition_to(Activity::Idle));
        // Release without a commit is impossible
        assert!(!Activity::Idle.can_transition_to(Activity::Locked));
        assert!(!Activity::ChargingPass.can_transition_to(Activity::ThrowingUpper));
    }

    #[test]
    fn test_catch_preempts_take_only() {
        assert!(Activity::PickingUp.can_transition_to(Activity::CatchingUpper));
        assert!(Activity::TakingFullBody.can_transition_to(Activity::CatchingLower));
        assert!(!Activity::ChargingPass.can_transition_to(Activity::CatchingUpper));
        assert!(!Activity::ThrowingUpper.can_transition_to(Activity::CatchingUpper));
        assert!(!Activity::CatchingUpper.can_transition_to(Activity::PickingUp));
    }

    #[test]
    fn test_completion_clips() {
        assert_eq!(Activity::ThrowingUpper.completion_clip(), Some(CLIP_THROW_MOVING));
        assert_eq!(Activity::TakingFullBody.completion_clip(), Some(CLIP_TAKE_STILL));
        assert_eq!(Activity::Locked.completion_clip(), None);
        assert_eq!(Activity::ChargingPass.completion_clip(), None);
    }
}
