//! Team control - which roster member receives input, and who may pick up

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ball::PossessionRegistry;
use crate::bridge::PhysicsBridge;
use crate::catching::CatchReadiness;
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::input::{Button, ButtonEdge, InputState};
use crate::player::{Activity, ActivityState, Player, PlayerId, change_activity};
use crate::shooting::ThrowIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlState {
    Active,
    Inactive,
}

#[derive(Debug, Clone)]
pub struct RosterMember {
    pub id: PlayerId,
    pub entity: Entity,
    pub control: ControlState,
    pub pickup_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TeamError {
    #[error("{0} is not on the roster")]
    UnknownPlayer(PlayerId),
    #[error("{0} is already registered")]
    AlreadyRegistered(PlayerId),
}

/// A pickup-area flag that changed during a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupChange {
    pub player: PlayerId,
    pub enabled: bool,
}

/// Roster in registration order plus the single active member
#[derive(Resource, Default, Debug)]
pub struct TeamControl {
    members: Vec<RosterMember>,
    active: Option<PlayerId>,
}

impl TeamControl {
    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    pub fn active(&self) -> Option<PlayerId> {
        self.active
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        self.active == Some(player)
    }

    pub fn member(&self, player: PlayerId) -> Option<&RosterMember> {
        self.members.iter().find(|m| m.id == player)
    }

    pub fn entity(&self, player: PlayerId) -> Option<Entity> {
        self.member(player).map(|m| m.entity)
    }

    /// Registration order, used to break same-tick ties
    pub fn order_of(&self, player: PlayerId) -> usize {
        self.members
            .iter()
            .position(|m| m.id == player)
            .unwrap_or(usize::MAX)
    }

    pub fn pickup_enabled(&self, player: PlayerId) -> bool {
        self.member(player).is_some_and(|m| m.pickup_enabled)
    }

    /// Roster member after `player`, wrapping around
    pub fn next_after(&self, player: PlayerId) -> Option<PlayerId> {
        let index = self.members.iter().position(|m| m.id == player)?;
        let next = &self.members[(index + 1) % self.members.len()];
        (next.id != player).then_some(next.id)
    }

    /// Append a player. The first member becomes active.
    pub fn register(
        &mut self,
        player: PlayerId,
        entity: Entity,
        registry: &PossessionRegistry,
    ) -> Result<Vec<PickupChange>, TeamError> {
        if self.member(player).is_some() {
            return Err(TeamError::AlreadyRegistered(player));
        }
        let control = if self.active.is_none() {
            self.active = Some(player);
            ControlState::Active
        } else {
            ControlState::Inactive
        };
        self.members.push(RosterMember {
            id: player,
            entity,
            control,
            pickup_enabled: false,
        });
        Ok(self.refresh_pickup_areas(registry))
    }

    /// Hand control to `player`; everyone else becomes inactive
    pub fn switch_to(
        &mut self,
        player: PlayerId,
        registry: &PossessionRegistry,
    ) -> Result<Vec<PickupChange>, TeamError> {
        if self.member(player).is_none() {
            return Err(TeamError::UnknownPlayer(player));
        }
        for member in &mut self.members {
            member.control = if member.id == player {
                ControlState::Active
            } else {
                ControlState::Inactive
            };
        }
        self.active = Some(player);
        Ok(self.refresh_pickup_areas(registry))
    }

    /// Enable pickup for the holder if a roster member holds an object,
    /// otherwise for the active player. Returns the flags that changed.
    pub fn refresh_pickup_areas(&mut self, registry: &PossessionRegistry) -> Vec<PickupChange> {
        let holder = self
            .members
            .iter()
            .find(|m| registry.held_by(m.id).is_some())
            .map(|m| m.id);
        let allowed = holder.or(self.active);

        let mut changes = Vec::new();
        for member in &mut self.members {
            let enabled = Some(member.id) == allowed;
            if member.pickup_enabled != enabled {
                member.pickup_enabled = enabled;
                changes.push(PickupChange {
                    player: member.id,
                    enabled,
                });
            }
        }
        changes
    }

    /// Exactly one member active and exactly one with pickup enabled
    pub fn check_invariants(&self, registry: &PossessionRegistry) -> Result<(), String> {
        if self.members.is_empty() {
            return Ok(());
        }
        let active = self
            .members
            .iter()
            .filter(|m| m.control == ControlState::Active)
            .count();
        if active != 1 {
            return Err(format!("{} active roster members", active));
        }
        let enabled: Vec<PlayerId> = self
            .members
            .iter()
            .filter(|m| m.pickup_enabled)
            .map(|m| m.id)
            .collect();
        if enabled.len() != 1 {
            return Err(format!("pickup enabled for {:?}", enabled));
        }
        let holder = self
            .members
            .iter()
            .find(|m| registry.held_by(m.id).is_some())
            .map(|m| m.id);
        let expected = holder.or(self.active);
        if Some(enabled[0]) != expected {
            return Err(format!(
                "pickup enabled for {} but expected {:?}",
                enabled[0], expected
            ));
        }
        Ok(())
    }
}

/// Forward pickup-area changes to physics and the event log
pub fn apply_pickup_changes(
    changes: &[PickupChange],
    physics: &mut impl PhysicsBridge,
    bus: &mut crate::events::EventBus,
) {
    for change in changes {
        physics.set_pickup_area_enabled(change.player, change.enabled);
        bus.emit(GameEvent::PickupArea {
            player: change.player,
            enabled: change.enabled,
        });
    }
}

/// Consume switch requests from the active player's input and cycle control
/// to the next teammate.
///
/// The player losing control drops any charge in progress; its buffered
/// input is discarded.
pub fn handle_switch_requests(
    mut ctx: GameplayParams,
    mut players: Query<(
        &Player,
        &mut InputState,
        &mut ActivityState,
        &mut CatchReadiness,
        &mut ThrowIntent,
    )>,
) {
    let Some(active) = ctx.team.active() else {
        return;
    };
    let Some(entity) = ctx.team.entity(active) else {
        return;
    };
    let Ok((_, mut input, _, _, _)) = players.get_mut(entity) else {
        return;
    };
    let requested = input.take_edges_for(Button::SwitchPlayer);
    if !requested.contains(&ButtonEdge::Down(Button::SwitchPlayer)) {
        return;
    }
    let Some(next) = ctx.team.next_after(active) else {
        return;
    };
    if ctx.switch_control(next).is_err() {
        return;
    }
    if let Ok((_, mut input, mut activity, mut readiness, mut intent)) = players.get_mut(entity) {
        *input = InputState::default();
        if intent.cancel() {
            ctx.bus.emit(GameEvent::ChargeCancel { player: active });
            change_activity(&mut ctx, active, &mut activity, &mut readiness, Activity::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::ThrowableId;
    use crate::bridge::PhysicsCommands;

    const A: PlayerId = PlayerId(0);
    const B: PlayerId = PlayerId(1);
    const C: PlayerId = PlayerId(2);

    fn roster(registry: &PossessionRegistry) -> TeamControl {
        let mut world = World::new();
        let mut team = TeamControl::default();
        for id in [A, B, C] {
            let entity = world.spawn_empty().id();
            team.register(id, entity, registry).unwrap();
        }
        team
    }

    #[test]
    fn test_first_registered_is_active() {
        let registry = PossessionRegistry::default();
        let team = roster(&registry);
        assert_eq!(team.active(), Some(A));
        assert!(team.pickup_enabled(A));
        assert!(!team.pickup_enabled(B));
        assert!(team.check_invariants(&registry).is_ok());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = PossessionRegistry::default();
        let mut team = roster(&registry);
        let entity = World::new().spawn_empty().id();
        assert_eq!(
            team.register(A, entity, &registry),
            Err(TeamError::AlreadyRegistered(A))
        );
    }

    #[test]
    fn test_holder_keeps_pickup_when_control_moves() {
        let mut registry = PossessionRegistry::default();
        let mut physics = PhysicsCommands::default();
        let ball = ThrowableId(0);
        registry.register(ball);
        let mut team = roster(&registry);

        registry.attach(ball, A, &mut physics).unwrap();
        team.refresh_pickup_areas(&registry);
        let changes = team.switch_to(B, &registry).unwrap();
        assert!(changes.is_empty());
        assert!(team.pickup_enabled(A));
        assert!(!team.pickup_enabled(B));
        assert!(team.check_invariants(&registry).is_ok());

        registry
            .release(ball, A, Vec3::Z, Some(B), 0.0, &mut physics)
            .unwrap();
        let changes = team.refresh_pickup_areas(&registry);
        assert_eq!(
            changes,
            vec![
                PickupChange {
                    player: A,
                    enabled: false
                },
                PickupChange {
                    player: B,
                    enabled: true
                },
            ]
        );
    }

    #[test]
    fn test_switch_to_unknown_player() {
        let registry = PossessionRegistry::default();
        let mut team = roster(&registry);
        assert_eq!(
            team.switch_to(PlayerId(7), &registry),
            Err(TeamError::UnknownPlayer(PlayerId(7)))
        );
        assert_eq!(team.active(), Some(A));
    }

    #[test]
    fn test_next_after_wraps() {
        let registry = PossessionRegistry::default();
        let team = roster(&registry);
        assert_eq!(team.next_after(A), Some(B));
        assert_eq!(team.next_after(C), Some(A));
        assert_eq!(team.order_of(C), 2);
    }
}
