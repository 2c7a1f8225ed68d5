//! Catch readiness windows - per body zone, timed, never armed during
//! full-body actions

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ball::ThrowableId;
use crate::bridge::PresentationSink;
use crate::constants::{CLIP_CATCH_LOWER, CLIP_CATCH_UPPER, PARAM_READY_LOWER, PARAM_READY_UPPER};
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::player::{Activity, ActivityState, Player, PlayerId};
use crate::timers::{TaskKey, TaskPurpose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CatchZone {
    Upper,
    Lower,
}

impl CatchZone {
    pub const ALL: [CatchZone; 2] = [CatchZone::Upper, CatchZone::Lower];

    pub fn clip(self) -> &'static str {
        match self {
            CatchZone::Upper => CLIP_CATCH_UPPER,
            CatchZone::Lower => CLIP_CATCH_LOWER,
        }
    }

    pub fn ready_param(self) -> &'static str {
        match self {
            CatchZone::Upper => PARAM_READY_UPPER,
            CatchZone::Lower => PARAM_READY_LOWER,
        }
    }

    pub fn catching_activity(self) -> Activity {
        match self {
            CatchZone::Upper => Activity::CatchingUpper,
            CatchZone::Lower => Activity::CatchingLower,
        }
    }
}

impl std::fmt::Display for CatchZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatchZone::Upper => write!(f, "U"),
            CatchZone::Lower => write!(f, "L"),
        }
    }
}

/// Why a window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisarmCause {
    CatchBegan,
    Attached,
    ZoneExited,
    Timeout,
    TargetChanged,
    FullBodyAction,
}

impl DisarmCause {
    pub fn code(self) -> &'static str {
        match self {
            DisarmCause::CatchBegan => "catch",
            DisarmCause::Attached => "attach",
            DisarmCause::ZoneExited => "exit",
            DisarmCause::Timeout => "timeout",
            DisarmCause::TargetChanged => "retarget",
            DisarmCause::FullBodyAction => "fullbody",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZoneWindow {
    pub armed: bool,
    pub deadline: f32,
    /// Object whose pass armed this window
    pub tracked: Option<ThrowableId>,
}

/// Per-player readiness, one window per catch zone
#[derive(Component, Debug, Clone, Default)]
pub struct CatchReadiness {
    upper: ZoneWindow,
    lower: ZoneWindow,
}

impl CatchReadiness {
    pub fn window(&self, zone: CatchZone) -> &ZoneWindow {
        match zone {
            CatchZone::Upper => &self.upper,
            CatchZone::Lower => &self.lower,
        }
    }

    fn window_mut(&mut self, zone: CatchZone) -> &mut ZoneWindow {
        match zone {
            CatchZone::Upper => &mut self.upper,
            CatchZone::Lower => &mut self.lower,
        }
    }

    pub fn is_armed(&self, zone: CatchZone) -> bool {
        self.window(zone).armed
    }

    pub fn any_armed(&self) -> bool {
        self.upper.armed || self.lower.armed
    }

    /// Open a window until `now + timeout`. Refused during full-body actions.
    pub fn arm(
        &mut self,
        zone: CatchZone,
        timeout: f32,
        now: f32,
        activity: Activity,
        tracked: Option<ThrowableId>,
    ) -> bool {
        if activity.is_full_body() {
            return false;
        }
        *self.window_mut(zone) = ZoneWindow {
            armed: true,
            deadline: now + timeout,
            tracked,
        };
        true
    }

    /// Close a window; returns whether it was open
    pub fn disarm(&mut self, zone: CatchZone) -> bool {
        let window = self.window_mut(zone);
        let was_armed = window.armed;
        *window = ZoneWindow::default();
        was_armed
    }

    pub fn timed_out(&self, zone: CatchZone, now: f32) -> bool {
        let window = self.window(zone);
        window.armed && now >= window.deadline
    }
}

/// Arm a zone and schedule its timeout check
pub fn arm_window(
    ctx: &mut GameplayParams,
    player: PlayerId,
    readiness: &mut CatchReadiness,
    activity: Activity,
    zone: CatchZone,
    timeout: f32,
    tracked: Option<ThrowableId>,
) -> bool {
    let now = ctx.now();
    if !readiness.arm(zone, timeout, now, activity, tracked) {
        debug!("{} cannot ready {:?} catch during {:?}", player, zone, activity);
        return false;
    }
    ctx.tasks.schedule(
        TaskKey::new(player, TaskPurpose::CatchReadyTimeout(zone)),
        now + timeout,
    );
    ctx.presentation
        .set_continuous_param(player, zone.ready_param(), 1.0);
    ctx.bus.emit(GameEvent::CatchArm { player, zone });
    true
}

/// Disarm a zone and cancel its pending timeout
pub fn disarm_window(
    ctx: &mut GameplayParams,
    player: PlayerId,
    readiness: &mut CatchReadiness,
    zone: CatchZone,
    cause: DisarmCause,
) -> bool {
    if !readiness.disarm(zone) {
        return false;
    }
    ctx.tasks
        .cancel(TaskKey::new(player, TaskPurpose::CatchReadyTimeout(zone)));
    ctx.presentation
        .set_continuous_param(player, zone.ready_param(), 0.0);
    ctx.bus.emit(GameEvent::CatchDisarm {
        player,
        zone,
        cause,
    });
    true
}

pub fn disarm_all(
    ctx: &mut GameplayParams,
    player: PlayerId,
    readiness: &mut CatchReadiness,
    cause: DisarmCause,
) {
    for zone in CatchZone::ALL {
        disarm_window(ctx, player, readiness, zone, cause);
    }
}

/// Past its deadline, with no catch running and empty hands
fn expiry_due(
    ctx: &GameplayParams,
    player: PlayerId,
    readiness: &CatchReadiness,
    activity: Activity,
    zone: CatchZone,
) -> bool {
    readiness.timed_out(zone, ctx.now())
        && !activity.is_catching()
        && ctx.registry.held_by(player).is_none()
}

/// Timeout fire: close the window only if it is still due and nothing
/// superseded it. A window kept open by a catch or a held object is closed
/// later by `update_catch_windows`.
pub fn on_ready_timeout(
    ctx: &mut GameplayParams,
    player: PlayerId,
    readiness: &mut CatchReadiness,
    activity: Activity,
    zone: CatchZone,
) {
    if !expiry_due(ctx, player, readiness, activity, zone) {
        debug!("{} stale {:?} readiness timeout ignored", player, zone);
        return;
    }
    disarm_window(ctx, player, readiness, zone, DisarmCause::Timeout);
}

/// Per-tick window upkeep: close windows whose tracked pass is no longer
/// headed to this player, and windows left open past their deadline
pub fn update_catch_windows(
    mut ctx: GameplayParams,
    mut players: Query<(&Player, &ActivityState, &mut CatchReadiness)>,
) {
    for (player, activity, mut readiness) in &mut players {
        for zone in CatchZone::ALL {
            let window = *readiness.window(zone);
            if !window.armed {
                continue;
            }
            let retargeted = window
                .tracked
                .is_some_and(|tracked| ctx.registry.intended_target(tracked) != Some(player.id));
            let cause = if retargeted {
                DisarmCause::TargetChanged
            } else if expiry_due(&ctx, player.id, &readiness, activity.current, zone) {
                DisarmCause::Timeout
            } else {
                continue;
            };
            disarm_window(&mut ctx, player.id, &mut readiness, zone, cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_refused_during_full_body() {
        let mut readiness = CatchReadiness::default();
        assert!(!readiness.arm(CatchZone::Upper, 1.0, 0.0, Activity::PickingUp, None));
        assert!(!readiness.is_armed(CatchZone::Upper));

        assert!(readiness.arm(CatchZone::Upper, 1.0, 0.0, Activity::ChargingPass, None));
        assert!(readiness.is_armed(CatchZone::Upper));
        assert!(!readiness.is_armed(CatchZone::Lower));
    }

    #[test]
    fn test_window_expires_at_deadline() {
        let mut readiness = CatchReadiness::default();
        readiness.arm(CatchZone::Upper, 1.0, 5.0, Activity::Idle, None);
        assert!(!readiness.timed_out(CatchZone::Upper, 5.9));
        assert!(readiness.timed_out(CatchZone::Upper, 6.0 + f32::EPSILON));
    }

    #[test]
    fn test_rearm_extends_deadline() {
        let mut readiness = CatchReadiness::default();
        readiness.arm(CatchZone::Lower, 1.0, 0.0, Activity::Idle, None);
        readiness.arm(CatchZone::Lower, 1.0, 0.8, Activity::Idle, Some(ThrowableId(3)));
        assert!(!readiness.timed_out(CatchZone::Lower, 1.5));
        assert_eq!(readiness.window(CatchZone::Lower).tracked, Some(ThrowableId(3)));
    }

    #[test]
    fn test_disarm_reports_previous_state() {
        let mut readiness = CatchReadiness::default();
        assert!(!readiness.disarm(CatchZone::Upper));
        readiness.arm(CatchZone::Upper, 1.0, 0.0, Activity::Idle, None);
        assert!(readiness.disarm(CatchZone::Upper));
        assert!(!readiness.any_armed());
    }
}
