//! Charge state for the pass and attack channels

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::targeting::ThrowPlan;
use crate::helpers::{clamp01, lerp};
use crate::tuning::GameplayTuning;

/// Easing applied to normalized charge time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeCurve {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    SmoothStep,
}

impl ChargeCurve {
    pub fn apply(self, t: f32) -> f32 {
        let t = clamp01(t);
        match self {
            ChargeCurve::Linear => t,
            ChargeCurve::EaseIn => t * t,
            ChargeCurve::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            ChargeCurve::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeChannel {
    Pass,
    Attack,
}

impl std::fmt::Display for ChargeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeChannel::Pass => write!(f, "pass"),
            ChargeChannel::Attack => write!(f, "attack"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeProfile {
    Tap,
    Hold,
}

/// Committed charge values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeResult {
    pub power: f32,
    pub flight_time: f32,
    /// Eased charge in [0,1]; zero for taps
    pub charge01: f32,
    pub profile: ChargeProfile,
}

/// Charge preview while the button is still down
pub fn charge_power(elapsed: f32, tuning: &GameplayTuning) -> f32 {
    let t = tuning.charge_curve.apply(elapsed / tuning.full_charge_time.max(f32::EPSILON));
    lerp(tuning.min_hold_power, tuning.max_hold_power, t)
}

/// Values committed on button up after holding for `elapsed` seconds
pub fn charge_result(elapsed: f32, tuning: &GameplayTuning) -> ChargeResult {
    if elapsed <= tuning.tap_threshold {
        return ChargeResult {
            power: tuning.tap_power,
            flight_time: tuning.slow_flight_time,
            charge01: 0.0,
            profile: ChargeProfile::Tap,
        };
    }
    let t = tuning.charge_curve.apply(elapsed / tuning.full_charge_time.max(f32::EPSILON));
    ChargeResult {
        power: lerp(tuning.min_hold_power, tuning.max_hold_power, t),
        flight_time: lerp(tuning.slow_flight_time, tuning.fast_flight_time, t),
        charge01: t,
        profile: ChargeProfile::Hold,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IntentRejected {
    #[error("not holding an object")]
    NotHolding,
    #[error("{0} channel is busy")]
    ChannelBusy(ChargeChannel),
    #[error("current activity cannot start a charge")]
    ActivityBusy,
}

/// Everything the release frame needs from the commit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowCommit {
    pub channel: ChargeChannel,
    pub result: ChargeResult,
    pub plan: ThrowPlan,
    /// Upper-body throw when moving at commit
    pub moving: bool,
    pub committed_at: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum IntentPhase {
    #[default]
    Idle,
    Charging {
        channel: ChargeChannel,
        started_at: f32,
    },
    Locked(ThrowCommit),
}

/// Per-player throw intent. Only one channel can be charging or locked.
#[derive(Component, Debug, Clone, Default)]
pub struct ThrowIntent {
    pub phase: IntentPhase,
}

impl ThrowIntent {
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, IntentPhase::Idle)
    }

    pub fn charging_channel(&self) -> Option<ChargeChannel> {
        match self.phase {
            IntentPhase::Charging { channel, .. } => Some(channel),
            _ => None,
        }
    }

    pub fn check_free(&self) -> Result<(), IntentRejected> {
        match self.phase {
            IntentPhase::Idle => Ok(()),
            IntentPhase::Charging { channel, .. } => Err(IntentRejected::ChannelBusy(channel)),
            IntentPhase::Locked(commit) => Err(IntentRejected::ChannelBusy(commit.channel)),
        }
    }

    pub fn begin(&mut self, channel: ChargeChannel, now: f32) -> Result<(), IntentRejected> {
        self.check_free()?;
        self.phase = IntentPhase::Charging {
            channel,
            started_at: now,
        };
        Ok(())
    }

    pub fn preview_power(&self, now: f32, tuning: &GameplayTuning) -> Option<f32> {
        match self.phase {
            IntentPhase::Charging { started_at, .. } => Some(charge_power(now - started_at, tuning)),
            _ => None,
        }
    }

    /// Button up on `channel`. Returns the charge result if that channel was charging;
    /// the intent stays in Charging until [`ThrowIntent::lock`].
    pub fn release(
        &self,
        channel: ChargeChannel,
        now: f32,
        tuning: &GameplayTuning,
    ) -> Option<ChargeResult> {
        match self.phase {
            IntentPhase::Charging {
                channel: charging,
                started_at,
            } if charging == channel => Some(charge_result(now - started_at, tuning)),
            _ => None,
        }
    }

    pub fn lock(&mut self, commit: ThrowCommit) {
        self.phase = IntentPhase::Locked(commit);
    }

    pub fn locked(&self) -> Option<&ThrowCommit> {
        match &self.phase {
            IntentPhase::Locked(commit) => Some(commit),
            _ => None,
        }
    }

    /// Consume the commit at the release frame
    pub fn take_commit(&mut self) -> Option<ThrowCommit> {
        match std::mem::take(&mut self.phase) {
            IntentPhase::Locked(commit) => Some(commit),
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Abandon a charge in progress; returns whether one was cancelled.
    /// A locked throw is not cancellable.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.phase, IntentPhase::Charging { .. }) {
            self.phase = IntentPhase::Idle;
            return true;
        }
        false
    }
}
