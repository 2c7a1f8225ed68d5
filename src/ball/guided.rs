//! Guided pass integration

use bevy::prelude::*;

use super::components::ThrowableId;
use super::interaction::start_catch;
use crate::catching::{CatchReadiness, CatchZone};
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::player::{ActivityState, Player, PlayerBody, PlayerId};

/// Advance every guided flight toward its receiver's live catch point.
///
/// On arrival the receiver starts an upper catch if it can; otherwise the
/// object drops out of guidance and falls ballistically.
pub fn step_guided_flights(
    mut ctx: GameplayParams,
    mut players: Query<(&Player, &PlayerBody, &mut ActivityState, &mut CatchReadiness)>,
) {
    let dt = ctx.time.delta_secs();
    let guided: Vec<(ThrowableId, Option<PlayerId>)> = ctx
        .registry
        .objects()
        .filter(|(_, record)| record.state.is_guided())
        .map(|(id, record)| (id, record.intended_target))
        .collect();

    for (object, target) in guided {
        let receiver = target.and_then(|t| ctx.team.entity(t));
        let live = receiver
            .and_then(|entity| players.get(entity).ok())
            .map(|(_, body, ..)| body.catch_point());
        let Some(step) = ctx
            .registry
            .step_guided(object, dt, live, &mut *ctx.physics)
        else {
            continue;
        };
        if !step.arrived {
            continue;
        }

        let mut caught = false;
        if let (Some(target), Some(entity)) = (target, receiver)
            && let Ok((_, _, mut activity, mut readiness)) = players.get_mut(entity)
            && activity.current.can_transition_to(CatchZone::Upper.catching_activity())
        {
            caught = start_catch(
                &mut ctx,
                target,
                object,
                CatchZone::Upper,
                &mut activity,
                &mut readiness,
            )
            .is_ok();
            if caught {
                ctx.bus.emit(GameEvent::GuidedArrive { object, target });
            }
        }
        if !caught && ctx.registry.cancel_guided_pass(object, &mut *ctx.physics) {
            info!("{} arrived with no catch, falling free", object);
            ctx.bus.emit(GameEvent::GuidedCancel { object });
        }
    }
}
