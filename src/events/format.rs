//! Compact text format for gameplay event serialization
//!
//! Format: `T:NNNNN|CODE|data...`
//! - T:NNNNN = timestamp in milliseconds (5 digits, wraps at 99999)
//! - CODE = 2-char event type code
//! - data = pipe-separated values specific to event type
//!
//! Examples:
//! ```text
//! T:00000|MS|42|3|1
//! T:00512|RS|O0|P0
//! T:01230|AT|O0|P0
//! T:01800|PG|P0|P1|1|-
//! T:02100|GS|O0|P0|P1|0.78
//! T:02950|KB|P1|U|O0
//! ```

use super::types::GameEvent;
use crate::player::PlayerId;

fn fmt_opt(player: &Option<PlayerId>) -> String {
    player
        .map(|p| p.to_string())
        .unwrap_or_else(|| "_".to_string())
}

fn flag(value: bool) -> u8 {
    if value { 1 } else { 0 }
}

/// Serialize a GameEvent to compact text format
pub fn serialize_event(time_ms: u32, event: &GameEvent) -> String {
    let ts = format!("T:{:05}", time_ms % 100000);
    let code = event.type_code();

    let data = match event {
        GameEvent::SessionStart {
            session_id,
            timestamp,
        } => format!("{}|{}", session_id, timestamp),
        GameEvent::Config(tuning) => {
            // Compact JSON for easy parsing
            serde_json::to_string(tuning).unwrap_or_else(|_| "{}".to_string())
        }
        GameEvent::MatchStart {
            seed,
            players,
            objects,
        } => format!("{}|{}|{}", seed, players, objects),
        GameEvent::MatchEnd {
            duration,
            passes,
            throws,
        } => format!("{:.1}|{}|{}", duration, passes, throws),
        GameEvent::Register { player } => player.to_string(),
        GameEvent::ControlSwitch { from, to } => format!("{}|{}", fmt_opt(from), to),
        GameEvent::PickupArea { player, enabled } => format!("{}|{}", player, flag(*enabled)),
        GameEvent::InputEnabled { player } => player.to_string(),
        GameEvent::Reserve { object, player }
        | GameEvent::ClearReservation { object, player }
        | GameEvent::Attach { object, player }
        | GameEvent::Drop { object, player } => format!("{}|{}", object, player),
        GameEvent::ReserveFail {
            object,
            player,
            reason,
        } => format!("{}|{}|{}", object, player, reason),
        GameEvent::Release {
            object,
            thrower,
            target,
            power,
            speed,
        } => format!(
            "{}|{}|{}|{:.2}|{:.1}",
            object,
            thrower,
            fmt_opt(target),
            power,
            speed
        ),
        GameEvent::GuidedStart {
            object,
            thrower,
            target,
            duration,
        } => format!("{}|{}|{}|{:.2}", object, thrower, target, duration),
        GameEvent::GuidedArrive { object, target } => format!("{}|{}", object, target),
        GameEvent::GuidedCancel { object } | GameEvent::Settle { object } => object.to_string(),
        GameEvent::CooldownEnd { player } | GameEvent::ChargeCancel { player } => {
            player.to_string()
        }
        GameEvent::ChargeStart { player, channel } => format!("{}|{}", player, channel),
        GameEvent::ChargeCommit {
            player,
            channel,
            power,
            charge,
            tap,
        } => format!(
            "{}|{}|{:.2}|{:.2}|{}",
            player,
            channel,
            power,
            charge,
            flag(*tap)
        ),
        GameEvent::PassGate {
            player,
            target,
            passed,
            reason,
        } => format!(
            "{}|{}|{}|{}",
            player,
            fmt_opt(target),
            flag(*passed),
            reason.map(|r| r.code()).unwrap_or("-")
        ),
        GameEvent::CatchArm { player, zone } => format!("{}|{}", player, zone),
        GameEvent::CatchDisarm {
            player,
            zone,
            cause,
        } => format!("{}|{}|{}", player, zone, cause.code()),
        GameEvent::CatchBegin {
            player,
            zone,
            object,
        } => format!("{}|{}|{}", player, zone, object),
    };

    format!("{}|{}|{}", ts, code, data)
}

/// Event code and data of a serialized line, without the timestamp
pub fn strip_timestamp(line: &str) -> &str {
    match line.split_once('|') {
        Some((ts, rest)) if ts.starts_with("T:") => rest,
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::ThrowableId;
    use crate::catching::{CatchZone, DisarmCause};
    use crate::shooting::GateFailure;

    #[test]
    fn test_possession_line() {
        let line = serialize_event(
            512,
            &GameEvent::Reserve {
                object: ThrowableId(0),
                player: PlayerId(2),
            },
        );
        assert_eq!(line, "T:00512|RS|O0|P2");
        assert_eq!(strip_timestamp(&line), "RS|O0|P2");
    }

    #[test]
    fn test_pass_gate_line() {
        let passed = serialize_event(
            1800,
            &GameEvent::PassGate {
                player: PlayerId(0),
                target: Some(PlayerId(1)),
                passed: true,
                reason: None,
            },
        );
        assert_eq!(passed, "T:01800|PG|P0|P1|1|-");

        let failed = serialize_event(
            1800,
            &GameEvent::PassGate {
                player: PlayerId(0),
                target: None,
                passed: false,
                reason: Some(GateFailure::NoTarget),
            },
        );
        assert_eq!(failed, "T:01800|PG|P0|_|0|none");
    }

    #[test]
    fn test_catch_lines() {
        let disarm = serialize_event(
            100_250,
            &GameEvent::CatchDisarm {
                player: PlayerId(1),
                zone: CatchZone::Lower,
                cause: DisarmCause::Timeout,
            },
        );
        // Timestamp wraps at five digits
        assert_eq!(disarm, "T:00250|KD|P1|L|timeout");
    }
}
