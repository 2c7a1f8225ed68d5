//! Throwable object components and possession state

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::shooting::{guided_position, guided_tangent};

/// Identity of a throwable object, assigned at scene setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThrowableId(pub u32);

impl std::fmt::Display for ThrowableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Marker + identity for throwable entities
#[derive(Component, Debug, Clone, Copy)]
pub struct Throwable {
    pub id: ThrowableId,
}

/// Guided pass in progress
#[derive(Debug, Clone, PartialEq)]
pub struct GuidedFlight {
    pub start: Vec3,
    /// Last sampled catch point of the receiver
    pub catch_point: Vec3,
    pub arc_height: f32,
    pub duration: f32,
    pub elapsed: f32,
}

impl GuidedFlight {
    /// Normalized progress in [0, 1]
    pub fn t(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn position(&self) -> Vec3 {
        guided_position(self.start, self.catch_point, self.arc_height, self.t())
    }

    /// Instantaneous velocity along the curve
    pub fn velocity(&self) -> Vec3 {
        guided_tangent(self.start, self.catch_point, self.arc_height, self.t()) / self.duration
    }
}

/// Lifecycle of a throwable object
#[derive(Debug, Clone, PartialEq)]
pub enum PossessionState {
    Free,
    Reserved { by: PlayerId },
    Held { by: PlayerId },
    InFlightBallistic { thrower: PlayerId },
    InFlightGuided { thrower: PlayerId, flight: GuidedFlight },
}

impl PossessionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            PossessionState::InFlightBallistic { .. } | PossessionState::InFlightGuided { .. }
        )
    }

    pub fn is_guided(&self) -> bool {
        matches!(self, PossessionState::InFlightGuided { .. })
    }

    /// Short name used by logs and scenario checks
    pub fn name(&self) -> &'static str {
        match self {
            PossessionState::Free => "Free",
            PossessionState::Reserved { .. } => "Reserved",
            PossessionState::Held { .. } => "Held",
            PossessionState::InFlightBallistic { .. } => "InFlightBallistic",
            PossessionState::InFlightGuided { .. } => "InFlightGuided",
        }
    }
}
