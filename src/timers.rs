//! Deferred one-shot tasks keyed by (owner, purpose)
//!
//! Scheduling an existing key replaces it, so at most one task per purpose is
//! pending for a player. Handlers re-validate their condition when they fire.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::ball::on_reservation_expiry;
use crate::catching::{CatchReadiness, CatchZone, on_ready_timeout};
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::input::on_input_enable;
use crate::player::{ActivityState, InputGate, Player, PlayerBody, PlayerId};
use crate::shooting::{CatchPoints, ThrowIntent, on_release_watchdog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskPurpose {
    ThrowCooldownEnd,
    CatchReadyTimeout(CatchZone),
    InputEnable,
    ReservationExpiry,
    ReleaseWatchdog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub owner: PlayerId,
    pub purpose: TaskPurpose,
}

impl TaskKey {
    pub fn new(owner: PlayerId, purpose: TaskPurpose) -> Self {
        Self { owner, purpose }
    }
}

#[derive(Resource, Default, Debug)]
pub struct DeferredTasks {
    tasks: BTreeMap<TaskKey, f32>,
}

impl DeferredTasks {
    /// Schedule a task; returns true when it superseded a pending one
    pub fn schedule(&mut self, key: TaskKey, fire_at: f32) -> bool {
        self.tasks.insert(key, fire_at).is_some()
    }

    pub fn cancel(&mut self, key: TaskKey) -> bool {
        self.tasks.remove(&key).is_some()
    }

    pub fn fire_at(&self, key: TaskKey) -> Option<f32> {
        self.tasks.get(&key).copied()
    }

    /// Remove and return every task due at `now`, earliest first.
    /// Ties break on key order.
    pub fn drain_due(&mut self, now: f32) -> Vec<TaskKey> {
        let mut due: Vec<(f32, TaskKey)> = self
            .tasks
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(key, at)| (*at, *key))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, key) in &due {
            self.tasks.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Fire due tasks in deterministic order
pub fn fire_deferred_tasks(
    mut ctx: GameplayParams,
    mut players: Query<(
        &Player,
        &PlayerBody,
        &mut ActivityState,
        &mut CatchReadiness,
        &mut ThrowIntent,
        &mut InputGate,
    )>,
) {
    let now = ctx.now();
    let due = ctx.tasks.drain_due(now);
    if due.is_empty() {
        return;
    }
    let catch_points: CatchPoints = players
        .iter()
        .map(|(player, body, ..)| (player.id, body.catch_point()))
        .collect();
    for key in due {
        let Some(entity) = ctx.team.entity(key.owner) else {
            continue;
        };
        let Ok((player, body, mut activity, mut readiness, mut intent, mut gate)) =
            players.get_mut(entity)
        else {
            continue;
        };
        match key.purpose {
            TaskPurpose::ThrowCooldownEnd => {
                if ctx.registry.cooldown_elapsed(player.id, now) {
                    ctx.bus.emit(GameEvent::CooldownEnd { player: player.id });
                }
            }
            TaskPurpose::CatchReadyTimeout(zone) => {
                on_ready_timeout(&mut ctx, player.id, &mut readiness, activity.current, zone);
            }
            TaskPurpose::InputEnable => {
                on_input_enable(&mut ctx, player.id, &mut gate);
            }
            TaskPurpose::ReservationExpiry => {
                on_reservation_expiry(&mut ctx, player.id);
            }
            TaskPurpose::ReleaseWatchdog => {
                on_release_watchdog(
                    &mut ctx,
                    player.id,
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

#[cfg(test)]
mod tests {
    use super::*;

    const P: PlayerId = PlayerId(0);

    #[test]
    fn test_schedule_supersedes_same_key() {
        let mut tasks = DeferredTasks::default();
        let key = TaskKey::new(P, TaskPurpose::CatchReadyTimeout(CatchZone::Upper));
        assert!(!tasks.schedule(key, 1.0));
        assert!(tasks.schedule(key, 3.0));
        assert_eq!(tasks.len(), 1);
        assert!(tasks.drain_due(2.0).is_empty());
        assert_eq!(tasks.drain_due(3.0), vec![key]);
    }

    #[test]
    fn test_drain_due_orders_by_time_then_key() {
        let mut tasks = DeferredTasks::default();
        let late = TaskKey::new(P, TaskPurpose::InputEnable);
        let early = TaskKey::new(PlayerId(5), TaskPurpose::ThrowCooldownEnd);
        let tie_a = TaskKey::new(PlayerId(1), TaskPurpose::ReservationExpiry);
        let tie_b = TaskKey::new(PlayerId(2), TaskPurpose::ReservationExpiry);
        tasks.schedule(late, 2.0);
        tasks.schedule(tie_b, 1.0);
        tasks.schedule(early, 0.5);
        tasks.schedule(tie_a, 1.0);

        assert_eq!(tasks.drain_due(5.0), vec![early, tie_a, tie_b, late]);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_cancel_removes_pending() {
        let mut tasks = DeferredTasks::default();
        let key = TaskKey::new(P, TaskPurpose::ReleaseWatchdog);
        tasks.schedule(key, 1.0);
        assert!(tasks.cancel(key));
        assert!(!tasks.cancel(key));
        assert!(tasks.drain_due(10.0).is_empty());
    }
}
