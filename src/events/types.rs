//! Event type definitions for the logging system

use serde::{Deserialize, Serialize};

use crate::ball::ThrowableId;
use crate::catching::{CatchZone, DisarmCause};
use crate::player::PlayerId;
use crate::shooting::{ChargeChannel, GateFailure};
use crate::tuning::GameplayTuning;

/// All gameplay events that can be logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    // === Session Events ===
    /// Session started (generated once per launch)
    SessionStart {
        session_id: String, // UUID v4
        timestamp: String,  // ISO 8601
    },
    /// Tuning snapshot (logged after session start)
    Config(GameplayTuning),

    // === Match Events ===
    MatchStart {
        seed: u64,
        players: u32,
        objects: u32,
    },
    MatchEnd {
        duration: f32,
        passes: u32,
        throws: u32,
    },

    // === Roster Events ===
    Register { player: PlayerId },
    ControlSwitch {
        from: Option<PlayerId>,
        to: PlayerId,
    },
    PickupArea { player: PlayerId, enabled: bool },
    InputEnabled { player: PlayerId },

    // === Possession Events ===
    Reserve {
        object: ThrowableId,
        player: PlayerId,
    },
    ReserveFail {
        object: ThrowableId,
        player: PlayerId,
        reason: String,
    },
    ClearReservation {
        object: ThrowableId,
        player: PlayerId,
    },
    Attach {
        object: ThrowableId,
        player: PlayerId,
    },
    /// Ballistic launch
    Release {
        object: ThrowableId,
        thrower: PlayerId,
        target: Option<PlayerId>,
        power: f32,
        speed: f32,
    },
    GuidedStart {
        object: ThrowableId,
        thrower: PlayerId,
        target: PlayerId,
        duration: f32,
    },
    GuidedArrive {
        object: ThrowableId,
        target: PlayerId,
    },
    GuidedCancel { object: ThrowableId },
    Settle { object: ThrowableId },
    Drop {
        object: ThrowableId,
        player: PlayerId,
    },
    CooldownEnd { player: PlayerId },

    // === Intent Events ===
    ChargeStart {
        player: PlayerId,
        channel: ChargeChannel,
    },
    ChargeCancel { player: PlayerId },
    ChargeCommit {
        player: PlayerId,
        channel: ChargeChannel,
        power: f32,
        charge: f32,
        tap: bool,
    },
    PassGate {
        player: PlayerId,
        target: Option<PlayerId>,
        passed: bool,
        reason: Option<GateFailure>,
    },

    // === Catch Events ===
    CatchArm { player: PlayerId, zone: CatchZone },
    CatchDisarm {
        player: PlayerId,
        zone: CatchZone,
        cause: DisarmCause,
    },
    CatchBegin {
        player: PlayerId,
        zone: CatchZone,
        object: ThrowableId,
    },
}

impl GameEvent {
    /// Get the event type code for compact serialization
    pub fn type_code(&self) -> &'static str {
        match self {
            GameEvent::SessionStart { .. } => "SE",
            GameEvent::Config(_) => "CF",
            GameEvent::MatchStart { .. } => "MS",
            GameEvent::MatchEnd { .. } => "ME",
            GameEvent::Register { .. } => "RG",
            GameEvent::ControlSwitch { .. } => "CS",
            GameEvent::PickupArea { .. } => "PA",
            GameEvent::InputEnabled { .. } => "IE",
            GameEvent::Reserve { .. } => "RS",
            GameEvent::ReserveFail { .. } => "RF",
            GameEvent::ClearReservation { .. } => "RC",
            GameEvent::Attach { .. } => "AT",
            GameEvent::Release { .. } => "RL",
            GameEvent::GuidedStart { .. } => "GS",
            GameEvent::GuidedArrive { .. } => "GA",
            GameEvent::GuidedCancel { .. } => "GC",
            GameEvent::Settle { .. } => "ST",
            GameEvent::Drop { .. } => "DR",
            GameEvent::CooldownEnd { .. } => "CD",
            GameEvent::ChargeStart { .. } => "C+",
            GameEvent::ChargeCancel { .. } => "C-",
            GameEvent::ChargeCommit { .. } => "CC",
            GameEvent::PassGate { .. } => "PG",
            GameEvent::CatchArm { .. } => "KA",
            GameEvent::CatchDisarm { .. } => "KD",
            GameEvent::CatchBegin { .. } => "KB",
        }
    }
}
