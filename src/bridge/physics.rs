//! Physics collaborator seam
//!
//! The core never moves bodies itself. It queues [`PhysicsCommand`]s in the
//! [`PhysicsCommands`] outbox and reads back trigger overlaps and rest reports
//! from the [`PhysicsEvents`] inbox.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::ball::ThrowableId;
use crate::catching::CatchZone;
use crate::player::PlayerId;

/// Requests the core makes of rigid bodies and trigger volumes
pub trait PhysicsBridge {
    fn set_kinematic(&mut self, object: ThrowableId, kinematic: bool);
    fn set_velocity(&mut self, object: ThrowableId, velocity: Vec3);
    fn move_to(&mut self, object: ThrowableId, position: Vec3);
    fn enable_collision(&mut self, object: ThrowableId, enabled: bool);
    fn attach_to_hand(&mut self, object: ThrowableId, player: PlayerId);
    fn detach(&mut self, object: ThrowableId);
    fn set_pickup_area_enabled(&mut self, player: PlayerId, enabled: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsCommand {
    SetKinematic { object: ThrowableId, kinematic: bool },
    SetVelocity { object: ThrowableId, velocity: Vec3 },
    MoveTo { object: ThrowableId, position: Vec3 },
    EnableCollision { object: ThrowableId, enabled: bool },
    AttachToHand { object: ThrowableId, player: PlayerId },
    Detach { object: ThrowableId },
    SetPickupArea { player: PlayerId, enabled: bool },
}

/// Outbox drained by the physics collaborator once per tick
#[derive(Resource, Default, Debug)]
pub struct PhysicsCommands {
    pending: Vec<PhysicsCommand>,
}

impl PhysicsCommands {
    pub fn push(&mut self, command: PhysicsCommand) {
        self.pending.push(command);
    }

    pub fn peek(&self) -> &[PhysicsCommand] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<PhysicsCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl PhysicsBridge for PhysicsCommands {
    fn set_kinematic(&mut self, object: ThrowableId, kinematic: bool) {
        self.push(PhysicsCommand::SetKinematic { object, kinematic });
    }

    fn set_velocity(&mut self, object: ThrowableId, velocity: Vec3) {
        self.push(PhysicsCommand::SetVelocity { object, velocity });
    }

    fn move_to(&mut self, object: ThrowableId, position: Vec3) {
        self.push(PhysicsCommand::MoveTo { object, position });
    }

    fn enable_collision(&mut self, object: ThrowableId, enabled: bool) {
        self.push(PhysicsCommand::EnableCollision { object, enabled });
    }

    fn attach_to_hand(&mut self, object: ThrowableId, player: PlayerId) {
        self.push(PhysicsCommand::AttachToHand { object, player });
    }

    fn detach(&mut self, object: ThrowableId) {
        self.push(PhysicsCommand::Detach { object });
    }

    fn set_pickup_area_enabled(&mut self, player: PlayerId, enabled: bool) {
        self.push(PhysicsCommand::SetPickupArea { player, enabled });
    }
}

/// Trigger volumes attached to a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneKind {
    Catch(CatchZone),
    Pickup,
    PreCatch(CatchZone),
}

impl ZoneKind {
    /// Same-tick evaluation order: catches before pickups before readiness
    pub fn priority(self) -> u8 {
        match self {
            ZoneKind::Catch(_) => 0,
            ZoneKind::Pickup => 1,
            ZoneKind::PreCatch(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlapEdge {
    Enter,
    Stay,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneEvent {
    pub edge: OverlapEdge,
    pub zone: ZoneKind,
    pub player: PlayerId,
    pub object: ThrowableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEvent {
    Zone(ZoneEvent),
    /// An in-flight object came to rest
    Settled(ThrowableId),
}

/// Inbox filled by the physics collaborator, drained by the core each tick
#[derive(Resource, Default, Debug)]
pub struct PhysicsEvents {
    pending: Vec<PhysicsEvent>,
}

impl PhysicsEvents {
    pub fn push(&mut self, event: PhysicsEvent) {
        self.pending.push(event);
    }

    pub fn zone(&mut self, edge: OverlapEdge, zone: ZoneKind, player: PlayerId, object: ThrowableId) {
        self.push(PhysicsEvent::Zone(ZoneEvent {
            edge,
            zone,
            player,
            object,
        }));
    }

    pub fn drain(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Object poses reported by the physics collaborator
#[derive(Resource, Default, Debug)]
pub struct ObjectTransforms {
    positions: HashMap<ThrowableId, Vec3>,
    velocities: HashMap<ThrowableId, Vec3>,
}

impl ObjectTransforms {
    pub fn set(&mut self, object: ThrowableId, position: Vec3, velocity: Vec3) {
        self.positions.insert(object, position);
        self.velocities.insert(object, velocity);
    }

    pub fn position(&self, object: ThrowableId) -> Option<Vec3> {
        self.positions.get(&object).copied()
    }

    pub fn velocity(&self, object: ThrowableId) -> Option<Vec3> {
        self.velocities.get(&object).copied()
    }
}

/// Spherical occluders used for pass line-of-sight checks
#[derive(Resource, Default, Debug)]
pub struct SightBlockers {
    pub spheres: Vec<(Vec3, f32)>,
}

impl SightBlockers {
    /// True when the segment from `from` to `to` misses every blocker
    pub fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        let segment = to - from;
        let len_sq = segment.length_squared();
        self.spheres.iter().all(|&(center, radius)| {
            let t = if len_sq > f32::EPSILON {
                ((center - from).dot(segment) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = from + segment * t;
            closest.distance(center) > radius
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_queue_in_order() {
        let mut outbox = PhysicsCommands::default();
        let object = ThrowableId(1);
        outbox.set_kinematic(object, true);
        outbox.enable_collision(object, false);
        outbox.attach_to_hand(object, PlayerId(2));

        let drained = outbox.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(
            drained[2],
            PhysicsCommand::AttachToHand {
                object,
                player: PlayerId(2)
            }
        );
        assert!(outbox.peek().is_empty());
    }

    #[test]
    fn test_catch_zones_sort_first() {
        let mut zones = vec![
            ZoneKind::PreCatch(CatchZone::Upper),
            ZoneKind::Pickup,
            ZoneKind::Catch(CatchZone::Lower),
        ];
        zones.sort_by_key(|z| z.priority());
        assert_eq!(zones[0], ZoneKind::Catch(CatchZone::Lower));
        assert_eq!(zones[1], ZoneKind::Pickup);
    }

    #[test]
    fn test_line_of_sight_blocked_by_sphere() {
        let blockers = SightBlockers {
            spheres: vec![(Vec3::new(0.0, 1.0, 5.0), 1.0)],
        };
        assert!(!blockers.line_of_sight(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 10.0)));
        assert!(blockers.line_of_sight(Vec3::new(3.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 10.0)));
    }
}
