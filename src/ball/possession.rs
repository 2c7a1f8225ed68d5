//! Possession registry - single source of truth for who holds, reserves, or
//! throws each object
//!
//! Held/incoming/intended-target relations are never stored on players; they
//! are derived from the one state value per object, so two holders of the same
//! object cannot be represented. Every mutation is compare-and-set: it succeeds
//! only from the documented states and otherwise returns a [`PossessionError`]
//! without side effects.

use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::components::{GuidedFlight, PossessionState, ThrowableId};
use crate::bridge::PhysicsBridge;
use crate::constants::{GUIDED_MIN_ARC_HEIGHT, GUIDED_MIN_DURATION, THROW_COOLDOWN};
use crate::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PossessionError {
    #[error("unknown object {0}")]
    UnknownObject(ThrowableId),
    #[error("{object} is in flight")]
    NotFree { object: ThrowableId },
    #[error("{object} is reserved by {by}")]
    ReservedByOther { object: ThrowableId, by: PlayerId },
    #[error("{object} is already held by {by}")]
    AlreadyHeld { object: ThrowableId, by: PlayerId },
    #[error("{player} already holds {held}")]
    HolderBusy { player: PlayerId, held: ThrowableId },
    #[error("{player} is already taking {incoming}")]
    AwaitingOther {
        player: PlayerId,
        incoming: ThrowableId,
    },
    #[error("{player} cannot reserve until {until:.2}s")]
    CooldownActive { player: PlayerId, until: f32 },
    #[error("{object} is not held by {player}")]
    NotHeldBy { object: ThrowableId, player: PlayerId },
    #[error("{object} is not reserved")]
    NotReserved { object: ThrowableId },
    #[error("{object} is not in flight")]
    NotInFlight { object: ThrowableId },
    #[error("{object} is not headed to {player}")]
    NotTargeted { object: ThrowableId, player: PlayerId },
}

impl PossessionError {
    /// Compact reason code for event logs
    pub fn code(&self) -> &'static str {
        match self {
            PossessionError::UnknownObject(_) => "unknown",
            PossessionError::NotFree { .. } => "in_flight",
            PossessionError::ReservedByOther { .. } => "reserved",
            PossessionError::AlreadyHeld { .. } => "held",
            PossessionError::HolderBusy { .. } => "busy",
            PossessionError::AwaitingOther { .. } => "awaiting",
            PossessionError::CooldownActive { .. } => "cooldown",
            PossessionError::NotHeldBy { .. } => "not_holder",
            PossessionError::NotReserved { .. } => "not_reserved",
            PossessionError::NotInFlight { .. } => "not_in_flight",
            PossessionError::NotTargeted { .. } => "not_target",
        }
    }
}

/// Per-object bookkeeping
#[derive(Debug, Clone)]
pub struct ThrowableRecord {
    pub state: PossessionState,
    /// Player a pass is headed to. Never implies ownership.
    pub intended_target: Option<PlayerId>,
    /// Stopped and non-collidable after `stop_motion`
    pub parked: bool,
}

impl ThrowableRecord {
    fn free() -> Self {
        Self {
            state: PossessionState::Free,
            intended_target: None,
            parked: false,
        }
    }
}

/// Parameters for [`PossessionRegistry::start_guided_pass`]
#[derive(Debug, Clone, Copy)]
pub struct GuidedPass {
    pub thrower: PlayerId,
    pub target: PlayerId,
    pub start: Vec3,
    pub catch_point: Vec3,
    pub arc_height: f32,
    pub duration: f32,
}

/// One integration step of a guided flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidedStep {
    pub position: Vec3,
    pub arrived: bool,
}

#[derive(Resource, Debug)]
pub struct PossessionRegistry {
    objects: BTreeMap<ThrowableId, ThrowableRecord>,
    cooldown_until: HashMap<PlayerId, f32>,
    throw_cooldown: f32,
}

impl Default for PossessionRegistry {
    fn default() -> Self {
        Self::with_cooldown(THROW_COOLDOWN)
    }
}

impl PossessionRegistry {
    pub fn with_cooldown(throw_cooldown: f32) -> Self {
        Self {
            objects: BTreeMap::new(),
            cooldown_until: HashMap::new(),
            throw_cooldown,
        }
    }

    /// Add a free object (scene setup)
    pub fn register(&mut self, object: ThrowableId) {
        self.objects.insert(object, ThrowableRecord::free());
    }

    /// Remove an object (scene teardown)
    pub fn remove(&mut self, object: ThrowableId) -> Option<ThrowableRecord> {
        self.objects.remove(&object)
    }

    // === Queries ===

    pub fn record(&self, object: ThrowableId) -> Option<&ThrowableRecord> {
        self.objects.get(&object)
    }

    pub fn state(&self, object: ThrowableId) -> Option<&PossessionState> {
        self.objects.get(&object).map(|r| &r.state)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ThrowableId, &ThrowableRecord)> {
        self.objects.iter().map(|(id, r)| (*id, r))
    }

    /// Object currently held by `player`
    pub fn held_by(&self, player: PlayerId) -> Option<ThrowableId> {
        self.objects
            .iter()
            .find(|(_, r)| r.state == PossessionState::Held { by: player })
            .map(|(id, _)| *id)
    }

    /// Object reserved by `player` and not yet attached
    pub fn incoming_for(&self, player: PlayerId) -> Option<ThrowableId> {
        self.objects
            .iter()
            .find(|(_, r)| r.state == PossessionState::Reserved { by: player })
            .map(|(id, _)| *id)
    }

    pub fn holder_of(&self, object: ThrowableId) -> Option<PlayerId> {
        match self.state(object)? {
            PossessionState::Held { by } => Some(*by),
            _ => None,
        }
    }

    /// Every (object, holder) pair, in object order
    pub fn holders(&self) -> impl Iterator<Item = (ThrowableId, PlayerId)> + '_ {
        self.objects.iter().filter_map(|(id, r)| match r.state {
            PossessionState::Held { by } => Some((*id, by)),
            _ => None,
        })
    }

    pub fn intended_target(&self, object: ThrowableId) -> Option<PlayerId> {
        self.objects.get(&object).and_then(|r| r.intended_target)
    }

    pub fn throw_cooldown_until(&self, player: PlayerId) -> f32 {
        self.cooldown_until.get(&player).copied().unwrap_or(0.0)
    }

    pub fn cooldown_elapsed(&self, player: PlayerId, now: f32) -> bool {
        now >= self.throw_cooldown_until(player)
    }

    /// Not held, and either unreserved or reserved by this player
    pub fn can_be_picked_up_by(&self, object: ThrowableId, player: PlayerId) -> bool {
        match self.state(object) {
            Some(PossessionState::Held { .. }) | None => false,
            Some(PossessionState::Reserved { by }) => *by == player,
            Some(_) => true,
        }
    }

    // === Transitions ===

    fn record_mut(&mut self, object: ThrowableId) -> Result<&mut ThrowableRecord, PossessionError> {
        self.objects
            .get_mut(&object)
            .ok_or(PossessionError::UnknownObject(object))
    }

    /// A player may be bound to at most one object at a time
    fn check_hands_free(&self, object: ThrowableId, player: PlayerId) -> Result<(), PossessionError> {
        if let Some(held) = self.held_by(player) {
            return Err(if held == object {
                PossessionError::AlreadyHeld { object, by: player }
            } else {
                PossessionError::HolderBusy { player, held }
            });
        }
        match self.incoming_for(player) {
            Some(incoming) if incoming != object => {
                Err(PossessionError::AwaitingOther { player, incoming })
            }
            _ => Ok(()),
        }
    }

    /// Claim a free object ahead of the attach frame
    pub fn reserve(
        &mut self,
        object: ThrowableId,
        player: PlayerId,
        now: f32,
    ) -> Result<(), PossessionError> {
        let until = self.throw_cooldown_until(player);
        if now < until {
            return Err(PossessionError::CooldownActive { player, until });
        }
        self.check_hands_free(object, player)?;

        let record = self.record_mut(object)?;
        match record.state {
            PossessionState::Free => {}
            PossessionState::Reserved { by } if by == player => {}
            PossessionState::Reserved { by } => {
                return Err(PossessionError::ReservedByOther { object, by });
            }
            PossessionState::Held { by } => return Err(PossessionError::AlreadyHeld { object, by }),
            PossessionState::InFlightBallistic { .. } | PossessionState::InFlightGuided { .. } => {
                return Err(PossessionError::NotFree { object });
            }
        }
        record.state = PossessionState::Reserved { by: player };
        record.intended_target = None;
        Ok(())
    }

    /// Give up a reservation; the object becomes free and physical again.
    /// Returns the player who held the reservation.
    pub fn clear_reservation(
        &mut self,
        object: ThrowableId,
        physics: &mut impl PhysicsBridge,
    ) -> Result<PlayerId, PossessionError> {
        let record = self.record_mut(object)?;
        let PossessionState::Reserved { by } = record.state else {
            return Err(PossessionError::NotReserved { object });
        };
        record.state = PossessionState::Free;
        if record.parked {
            record.parked = false;
            physics.enable_collision(object, true);
            physics.set_kinematic(object, false);
        }
        Ok(by)
    }

    /// Put the object in the player's hand
    pub fn attach(
        &mut self,
        object: ThrowableId,
        player: PlayerId,
        physics: &mut impl PhysicsBridge,
    ) -> Result<(), PossessionError> {
        self.check_hands_free(object, player)?;

        let record = self.record_mut(object)?;
        match record.state {
            PossessionState::Free => {}
            PossessionState::Reserved { by } if by == player => {}
            PossessionState::Reserved { by } => {
                return Err(PossessionError::ReservedByOther { object, by });
            }
            PossessionState::Held { by } => return Err(PossessionError::AlreadyHeld { object, by }),
            PossessionState::InFlightBallistic { .. } | PossessionState::InFlightGuided { .. } => {
                return Err(PossessionError::NotFree { object });
            }
        }
        record.state = PossessionState::Held { by: player };
        record.intended_target = None;
        record.parked = false;

        physics.set_kinematic(object, true);
        physics.enable_collision(object, false);
        physics.attach_to_hand(object, player);
        Ok(())
    }

    /// Record who a committed pass is for while the thrower still holds it
    pub fn designate_target(
        &mut self,
        object: ThrowableId,
        thrower: PlayerId,
        target: PlayerId,
    ) -> Result<(), PossessionError> {
        let record = self.record_mut(object)?;
        if record.state != (PossessionState::Held { by: thrower }) {
            return Err(PossessionError::NotHeldBy {
                object,
                player: thrower,
            });
        }
        record.intended_target = Some(target);
        Ok(())
    }

    fn start_cooldown(&mut self, player: PlayerId, now: f32) {
        self.cooldown_until.insert(player, now + self.throw_cooldown);
    }

    /// Launch a held object ballistically
    pub fn release(
        &mut self,
        object: ThrowableId,
        thrower: PlayerId,
        velocity: Vec3,
        intended_target: Option<PlayerId>,
        now: f32,
        physics: &mut impl PhysicsBridge,
    ) -> Result<(), PossessionError> {
        let record = self.record_mut(object)?;
        if record.state != (PossessionState::Held { by: thrower }) {
            return Err(PossessionError::NotHeldBy {
                object,
                player: thrower,
            });
        }
        record.state = PossessionState::InFlightBallistic { thrower };
        record.intended_target = intended_target;
        self.start_cooldown(thrower, now);

        physics.detach(object);
        physics.set_kinematic(object, false);
        physics.enable_collision(object, true);
        physics.set_velocity(object, velocity);
        Ok(())
    }

    /// Launch a held object along a receiver-tracking curve
    pub fn start_guided_pass(
        &mut self,
        object: ThrowableId,
        pass: GuidedPass,
        now: f32,
        physics: &mut impl PhysicsBridge,
    ) -> Result<GuidedFlight, PossessionError> {
        let record = self.record_mut(object)?;
        if record.state != (PossessionState::Held { by: pass.thrower }) {
            return Err(PossessionError::NotHeldBy {
                object,
                player: pass.thrower,
            });
        }
        let flight = GuidedFlight {
            start: pass.start,
            catch_point: pass.catch_point,
            arc_height: pass.arc_height.max(GUIDED_MIN_ARC_HEIGHT),
            duration: pass.duration.max(GUIDED_MIN_DURATION),
            elapsed: 0.0,
        };
        record.state = PossessionState::InFlightGuided {
            thrower: pass.thrower,
            flight: flight.clone(),
        };
        record.intended_target = Some(pass.target);
        self.start_cooldown(pass.thrower, now);

        physics.detach(object);
        physics.set_kinematic(object, true);
        physics.enable_collision(object, true);
        physics.move_to(object, pass.start);
        Ok(flight)
    }

    /// Advance a guided flight by `dt`, steering toward the live catch point.
    /// Returns `None` when the object is not on a guided flight.
    pub fn step_guided(
        &mut self,
        object: ThrowableId,
        dt: f32,
        live_catch_point: Option<Vec3>,
        physics: &mut impl PhysicsBridge,
    ) -> Option<GuidedStep> {
        let record = self.objects.get_mut(&object)?;
        let PossessionState::InFlightGuided { flight, .. } = &mut record.state else {
            return None;
        };
        if let Some(point) = live_catch_point {
            flight.catch_point = point;
        }
        flight.elapsed += dt;
        let position = flight.position();
        physics.move_to(object, position);
        Some(GuidedStep {
            position,
            arrived: flight.t() >= 1.0,
        })
    }

    /// Drop out of guided flight into free ballistic motion. Idempotent:
    /// returns false when there was nothing to cancel.
    pub fn cancel_guided_pass(
        &mut self,
        object: ThrowableId,
        physics: &mut impl PhysicsBridge,
    ) -> bool {
        let Some(record) = self.objects.get_mut(&object) else {
            return false;
        };
        let PossessionState::InFlightGuided { thrower, flight } = &record.state else {
            return false;
        };
        let thrower = *thrower;
        let velocity = flight.velocity();
        record.state = PossessionState::InFlightBallistic { thrower };

        physics.set_kinematic(object, false);
        physics.set_velocity(object, velocity);
        true
    }

    /// Freeze the object in place without collisions.
    /// Has no effect while a guided flight drives it.
    pub fn stop_motion(&mut self, object: ThrowableId, physics: &mut impl PhysicsBridge) -> bool {
        let Some(record) = self.objects.get_mut(&object) else {
            return false;
        };
        if record.state.is_guided() {
            return false;
        }
        record.parked = true;
        physics.set_velocity(object, Vec3::ZERO);
        physics.set_kinematic(object, true);
        physics.enable_collision(object, false);
        true
    }

    /// Start catching an object headed to `player`: cancel guidance, stop it,
    /// and reserve it for the catcher.
    pub fn begin_catch(
        &mut self,
        object: ThrowableId,
        player: PlayerId,
        physics: &mut impl PhysicsBridge,
    ) -> Result<(), PossessionError> {
        let record = self
            .objects
            .get(&object)
            .ok_or(PossessionError::UnknownObject(object))?;
        if !record.state.is_in_flight() {
            return Err(PossessionError::NotInFlight { object });
        }
        if record.intended_target != Some(player) {
            return Err(PossessionError::NotTargeted { object, player });
        }
        self.check_hands_free(object, player)?;

        self.cancel_guided_pass(object, physics);
        self.stop_motion(object, physics);
        let record = self.record_mut(object)?;
        record.state = PossessionState::Reserved { by: player };
        record.intended_target = None;
        Ok(())
    }

    /// Physics reports a ballistic object came to rest
    pub fn settle(&mut self, object: ThrowableId) -> Result<(), PossessionError> {
        let record = self.record_mut(object)?;
        if !matches!(record.state, PossessionState::InFlightBallistic { .. }) {
            return Err(PossessionError::NotInFlight { object });
        }
        record.state = PossessionState::Free;
        record.intended_target = None;
        Ok(())
    }

    /// Let go of a held or reserved object without throwing it.
    /// Held objects fall from the hand; reserved ones become free in place.
    pub fn drop_object(
        &mut self,
        object: ThrowableId,
        physics: &mut impl PhysicsBridge,
    ) -> Result<PlayerId, PossessionError> {
        let holder = match self.state(object) {
            Some(PossessionState::Held { by }) => *by,
            Some(PossessionState::Reserved { .. }) => {
                return self.clear_reservation(object, physics);
            }
            Some(_) => return Err(PossessionError::NotReserved { object }),
            None => return Err(PossessionError::UnknownObject(object)),
        };
        let record = self.record_mut(object)?;
        record.state = PossessionState::InFlightBallistic { thrower: holder };
        record.intended_target = None;
        physics.detach(object);
        physics.set_kinematic(object, false);
        physics.enable_collision(object, true);
        physics.set_velocity(object, Vec3::ZERO);
        Ok(holder)
    }

    /// Cross-check relations; returns a description of the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut bound: HashMap<PlayerId, ThrowableId> = HashMap::new();
        for (id, record) in &self.objects {
            let player = match record.state {
                PossessionState::Held { by } | PossessionState::Reserved { by } => by,
                _ => continue,
            };
            if let Some(other) = bound.insert(player, *id) {
                return Err(format!("{} is bound to both {} and {}", player, other, id));
            }
            if record.intended_target.is_some() && matches!(record.state, PossessionState::Reserved { .. }) {
                return Err(format!("{} is reserved but still has a pass target", id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{PhysicsCommand, PhysicsCommands};
    use proptest::prelude::*;

    const A: PlayerId = PlayerId(0);
    const B: PlayerId = PlayerId(1);
    const BALL: ThrowableId = ThrowableId(0);

    fn registry_with(objects: &[ThrowableId]) -> PossessionRegistry {
        let mut registry = PossessionRegistry::default();
        for &object in objects {
            registry.register(object);
        }
        registry
    }

    #[test]
    fn test_reserve_then_attach() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();

        registry.reserve(BALL, A, 0.0).unwrap();
        assert_eq!(registry.incoming_for(A), Some(BALL));
        assert!(registry.can_be_picked_up_by(BALL, A));
        assert!(!registry.can_be_picked_up_by(BALL, B));

        registry.attach(BALL, A, &mut physics).unwrap();
        assert_eq!(registry.held_by(A), Some(BALL));
        assert_eq!(registry.incoming_for(A), None);
        assert!(physics.peek().contains(&PhysicsCommand::AttachToHand {
            object: BALL,
            player: A
        }));
    }

    #[test]
    fn test_same_tick_reservations_first_wins() {
        let mut registry = registry_with(&[BALL]);
        assert!(registry.reserve(BALL, A, 1.0).is_ok());
        assert_eq!(
            registry.reserve(BALL, B, 1.0),
            Err(PossessionError::ReservedByOther { object: BALL, by: A })
        );
        // Repeat reservation by the owner is accepted
        assert!(registry.reserve(BALL, A, 1.0).is_ok());
    }

    #[test]
    fn test_attach_rejects_other_reserver_and_double_attach() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.reserve(BALL, A, 0.0).unwrap();

        assert!(matches!(
            registry.attach(BALL, B, &mut physics),
            Err(PossessionError::ReservedByOther { .. })
        ));
        registry.attach(BALL, A, &mut physics).unwrap();
        assert!(matches!(
            registry.attach(BALL, A, &mut physics),
            Err(PossessionError::AlreadyHeld { .. })
        ));
    }

    #[test]
    fn test_player_holds_at_most_one_object() {
        let other = ThrowableId(1);
        let mut registry = registry_with(&[BALL, other]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();

        assert_eq!(
            registry.attach(other, A, &mut physics),
            Err(PossessionError::HolderBusy { player: A, held: BALL })
        );
        assert!(registry.reserve(other, A, 0.0).is_err());
    }

    #[test]
    fn test_release_starts_cooldown() {
        let other = ThrowableId(1);
        let mut registry = registry_with(&[BALL, other]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();

        let now = 10.0;
        registry
            .release(BALL, A, Vec3::new(0.0, 4.0, 8.0), Some(B), now, &mut physics)
            .unwrap();
        assert_eq!(registry.intended_target(BALL), Some(B));
        assert_eq!(registry.held_by(A), None);

        assert!(matches!(
            registry.reserve(other, A, now + 0.1),
            Err(PossessionError::CooldownActive { .. })
        ));
        assert!(registry.reserve(other, A, now + 0.31).is_ok());
    }

    #[test]
    fn test_release_requires_holder() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();
        assert!(matches!(
            registry.release(BALL, B, Vec3::ZERO, None, 0.0, &mut physics),
            Err(PossessionError::NotHeldBy { .. })
        ));
    }

    #[test]
    fn test_clear_reservation_frees_object() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.reserve(BALL, A, 0.0).unwrap();
        assert_eq!(registry.clear_reservation(BALL, &mut physics), Ok(A));
        assert_eq!(registry.state(BALL), Some(&PossessionState::Free));
        assert!(registry.clear_reservation(BALL, &mut physics).is_err());
    }

    fn guided(registry: &mut PossessionRegistry, physics: &mut PhysicsCommands) {
        registry.attach(BALL, A, physics).unwrap();
        registry
            .start_guided_pass(
                BALL,
                GuidedPass {
                    thrower: A,
                    target: B,
                    start: Vec3::new(0.0, 1.3, 0.0),
                    catch_point: Vec3::new(0.0, 1.4, 8.0),
                    arc_height: 1.5,
                    duration: 0.5,
                },
                0.0,
                physics,
            )
            .unwrap();
    }

    #[test]
    fn test_guided_pass_floors_parameters() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();
        let flight = registry
            .start_guided_pass(
                BALL,
                GuidedPass {
                    thrower: A,
                    target: B,
                    start: Vec3::ZERO,
                    catch_point: Vec3::Z,
                    arc_height: 0.0,
                    duration: 0.01,
                },
                0.0,
                &mut physics,
            )
            .unwrap();
        assert_eq!(flight.duration, GUIDED_MIN_DURATION);
        assert_eq!(flight.arc_height, GUIDED_MIN_ARC_HEIGHT);
    }

    #[test]
    fn test_guided_step_tracks_moving_target() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        guided(&mut registry, &mut physics);

        let step = registry
            .step_guided(BALL, 0.25, Some(Vec3::new(2.0, 1.4, 8.0)), &mut physics)
            .unwrap();
        assert!(!step.arrived);
        let step = registry.step_guided(BALL, 0.3, None, &mut physics).unwrap();
        assert!(step.arrived);
        // Ends on the most recently sampled catch point
        assert!((step.position - Vec3::new(2.0, 1.4, 8.0)).length() < 1e-4);
    }

    #[test]
    fn test_stop_motion_is_noop_while_guided() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        guided(&mut registry, &mut physics);

        assert!(!registry.stop_motion(BALL, &mut physics));
        assert!(registry.state(BALL).unwrap().is_guided());

        assert!(registry.cancel_guided_pass(BALL, &mut physics));
        assert!(!registry.cancel_guided_pass(BALL, &mut physics));
        assert!(matches!(
            registry.state(BALL),
            Some(PossessionState::InFlightBallistic { thrower: A })
        ));
        assert_eq!(registry.intended_target(BALL), Some(B));
        assert!(registry.stop_motion(BALL, &mut physics));
    }

    #[test]
    fn test_begin_catch_only_for_target() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        guided(&mut registry, &mut physics);

        assert!(matches!(
            registry.begin_catch(BALL, A, &mut physics),
            Err(PossessionError::NotTargeted { .. })
        ));
        registry.begin_catch(BALL, B, &mut physics).unwrap();
        assert_eq!(registry.incoming_for(B), Some(BALL));
        assert!(registry.record(BALL).unwrap().parked);

        registry.attach(BALL, B, &mut physics).unwrap();
        assert_eq!(registry.holder_of(BALL), Some(B));
        assert!(!registry.record(BALL).unwrap().parked);
    }

    #[test]
    fn test_settle_frees_ballistic_object() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();
        registry
            .release(BALL, A, Vec3::Z, None, 0.0, &mut physics)
            .unwrap();
        registry.settle(BALL).unwrap();
        assert_eq!(registry.state(BALL), Some(&PossessionState::Free));
        assert!(registry.settle(BALL).is_err());
    }

    #[test]
    fn test_drop_held_object_falls() {
        let mut registry = registry_with(&[BALL]);
        let mut physics = PhysicsCommands::default();
        registry.attach(BALL, A, &mut physics).unwrap();
        assert_eq!(registry.drop_object(BALL, &mut physics), Ok(A));
        assert!(registry.state(BALL).unwrap().is_in_flight());
        // Dropping is not a throw
        assert!(registry.cooldown_elapsed(A, 0.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(u8, u8),
        Attach(u8, u8),
        Release(u8, u8),
        Clear(u8),
        Settle(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 0u8..3).prop_map(|(p, o)| Op::Reserve(p, o)),
            (0u8..4, 0u8..3).prop_map(|(p, o)| Op::Attach(p, o)),
            (0u8..4, 0u8..3).prop_map(|(p, o)| Op::Release(p, o)),
            (0u8..3).prop_map(Op::Clear),
            (0u8..3).prop_map(Op::Settle),
        ]
    }

    proptest! {
        #[test]
        fn prop_single_ownership(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let objects: Vec<ThrowableId> = (0..3).map(ThrowableId).collect();
            let mut registry = registry_with(&objects);
            let mut physics = PhysicsCommands::default();

            for (step, op) in ops.iter().enumerate() {
                let now = step as f32 * 0.1;
                let _ = match *op {
                    Op::Reserve(p, o) => registry.reserve(ThrowableId(o as u32), PlayerId(p as u32), now),
                    Op::Attach(p, o) => registry.attach(ThrowableId(o as u32), PlayerId(p as u32), &mut physics),
                    Op::Release(p, o) => registry.release(
                        ThrowableId(o as u32), PlayerId(p as u32), Vec3::Z, None, now, &mut physics,
                    ),
                    Op::Clear(o) => registry.clear_reservation(ThrowableId(o as u32), &mut physics).map(|_| ()),
                    Op::Settle(o) => registry.settle(ThrowableId(o as u32)),
                };
                prop_assert!(registry.check_invariants().is_ok());
                for p in 0..4 {
                    let player = PlayerId(p);
                    let held = registry.objects().filter(|(_, r)| r.state == PossessionState::Held { by: player }).count();
                    prop_assert!(held <= 1);
                }
            }
        }
    }
}
