//! Player-related components

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{CATCH_HEIGHT, HAND_HEIGHT, LOWER_CATCH_HEIGHT};
use crate::helpers::planar_direction;

/// Roster identity, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Marker + identity for player entities
#[derive(Component, Debug, Clone, Copy)]
pub struct Player {
    pub id: PlayerId,
}

/// Body pose reported by the locomotion collaborator
#[derive(Component, Debug, Clone)]
pub struct PlayerBody {
    /// Feet position
    pub position: Vec3,
    /// Horizontal facing direction (unit length)
    pub forward: Vec3,
    /// World position of the hand slot, when the rig reports one
    pub hand: Option<Vec3>,
    /// Height of the upper catch point above the feet
    pub catch_height: f32,
}

impl PlayerBody {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: planar_direction(forward, Vec3::Z),
            hand: None,
            catch_height: CATCH_HEIGHT,
        }
    }

    /// Where a released object starts its flight
    pub fn release_origin(&self) -> Vec3 {
        self.hand
            .unwrap_or(self.position + Vec3::Y * HAND_HEIGHT)
    }

    /// Upper catch point; guided passes steer toward it
    pub fn catch_point(&self) -> Vec3 {
        self.position + Vec3::Y * self.catch_height
    }

    pub fn lower_catch_point(&self) -> Vec3 {
        self.position + Vec3::Y * LOWER_CATCH_HEIGHT
    }

    /// Turn to face a point (horizontal only)
    pub fn face(&mut self, point: Vec3) {
        self.forward = planar_direction(point - self.position, self.forward);
    }
}

/// Preferred pass receiver. `None` leaves the choice to auto-selection.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PassTargeting {
    pub configured: Option<PlayerId>,
}

/// Input is ignored until enabled (post-spawn delay)
#[derive(Component, Debug, Clone, Copy)]
pub struct InputGate {
    pub enabled: bool,
}

impl Default for InputGate {
    fn default() -> Self {
        Self { enabled: true }
    }
}
