//! Catchball - catch, throw and pass gameplay core built with Bevy
//!
//! Possession, throw intent, trajectory solving, catch windows and team
//! control run as Bevy systems. Physics, animation and presentation are
//! reached through the resources in [`bridge`]; the [`simulation`] module
//! provides headless stand-ins for them.

// Core modules
pub mod constants;
pub mod events;
pub mod gameplay;
pub mod helpers;
pub mod simulation;
pub mod testing;
pub mod timers;
pub mod tuning;

// Gameplay modules
pub mod ball;
pub mod bridge;
pub mod catching;
pub mod input;
pub mod player;
pub mod shooting;
pub mod team;

// Re-export commonly used types for convenience
pub use ball::{PossessionError, PossessionRegistry, PossessionState, ThrowableId};
pub use bridge::{
    AnimationSignal, AnimationSignals, AnimationStatus, ObjectTransforms, OverlapEdge,
    PhysicsCommand, PhysicsCommands, PhysicsEvent, PhysicsEvents, PresentationCommand,
    PresentationCommands, ZoneKind,
};
pub use catching::{CatchReadiness, CatchZone};
pub use constants::*;
pub use events::{BusEvent, EventBus, EventLog, GameEvent};
pub use gameplay::{GameplayParams, GameplayPlugin, GameplaySet, give_object, spawn_player, spawn_throwable};
pub use helpers::*;
pub use input::{Button, PlayerInput};
pub use player::{Activity, ActivityState, Player, PlayerBody, PlayerId};
pub use shooting::{ChargeChannel, ThrowIntent};
pub use team::{TeamControl, TeamError};
pub use tuning::GameplayTuning;
