//! Assertion checking for scenario expectations

use std::collections::HashMap;

use super::parser::{ExpectedEvent, StateAssertion};

/// Error when an assertion fails
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for AssertionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n    Expected: {}\n    Actual: {}", self.message, self.expected, self.actual)
    }
}

/// Event line (without timestamp) and the frame it was flushed on
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub frame: u64,
    pub line: String,
}

/// Check that the expected events appear in order. Other events may be
/// interleaved.
pub fn check_sequence(expected: &[ExpectedEvent], captured: &[CapturedEvent]) -> Result<(), AssertionError> {
    let mut captured_idx = 0;

    for (i, exp) in expected.iter().enumerate() {
        let found = captured[captured_idx..]
            .iter()
            .enumerate()
            .find(|(_, cap)| cap.line.starts_with(&exp.event));

        match found {
            Some((offset, cap)) => {
                if let Some(min) = exp.frame_min
                    && cap.frame < min
                {
                    return Err(AssertionError {
                        message: format!("Event #{} '{}' occurred too early", i + 1, exp.event),
                        expected: format!("frame >= {}", min),
                        actual: format!("frame {}", cap.frame),
                    });
                }
                if let Some(max) = exp.frame_max
                    && cap.frame > max
                {
                    return Err(AssertionError {
                        message: format!("Event #{} '{}' occurred too late", i + 1, exp.event),
                        expected: format!("frame <= {}", max),
                        actual: format!("frame {}", cap.frame),
                    });
                }
                captured_idx += offset + 1;
            }
            None => {
                return Err(AssertionError {
                    message: format!("Event #{} '{}' not found", i + 1, exp.event),
                    expected: format!("'{}' in sequence", exp.event),
                    actual: format!(
                        "events after position {}: {:?}",
                        captured_idx,
                        captured[captured_idx..].iter().map(|e| &e.line).collect::<Vec<_>>()
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Check that no captured event starts with any of the given prefixes
pub fn check_absent(absent: &[String], captured: &[CapturedEvent]) -> Result<(), AssertionError> {
    for prefix in absent {
        if let Some(hit) = captured.iter().find(|c| c.line.starts_with(prefix.as_str())) {
            return Err(AssertionError {
                message: format!("Unexpected event '{}'", prefix),
                expected: "no such event".to_string(),
                actual: format!("'{}' at frame {}", hit.line, hit.frame),
            });
        }
    }
    Ok(())
}

/// World state for assertions, keyed by scenario names
#[derive(Debug, Default)]
pub struct WorldState {
    pub active: Option<String>,
    pub players: HashMap<String, PlayerState>,
    pub objects: HashMap<String, ObjectState>,
}

#[derive(Debug, Default)]
pub struct PlayerState {
    pub x: f32,
    pub z: f32,
    pub activity: String,
    pub armed_upper: bool,
    pub armed_lower: bool,
    pub pickup: bool,
    pub charging: bool,
    pub input_enabled: bool,
    /// Held object name, `none` when empty-handed
    pub holding: String,
}

#[derive(Debug, Default)]
pub struct ObjectState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub state: String,
    /// Holder or reserving player, `none` otherwise
    pub holder: String,
    /// Intended pass receiver, `none` otherwise
    pub target: String,
}

/// Parse a check string into (path, operator, value)
fn parse_check(check: &str) -> Option<(&str, &str, &str)> {
    // Longer operators first so `>=` is not read as `>`
    for op in &["==", "!=", ">=", "<=", "=", ">", "<"] {
        if let Some(idx) = check.find(op) {
            let path = check[..idx].trim();
            let value = check[idx + op.len()..].trim().trim_matches('"');
            return Some((path, op, value));
        }
    }
    None
}

enum Actual<'a> {
    Text(&'a str),
    Flag(bool),
    Number(f32),
}

fn lookup<'a>(state: &'a WorldState, path: &[&str]) -> Result<Actual<'a>, String> {
    if path == ["active"] {
        return Ok(Actual::Text(state.active.as_deref().unwrap_or("none")));
    }
    let name = path.first().copied().unwrap_or_default();
    if let Some(player) = state.players.get(name) {
        return match &path[1..] {
            ["x"] => Ok(Actual::Number(player.x)),
            ["z"] => Ok(Actual::Number(player.z)),
            ["activity"] => Ok(Actual::Text(&player.activity)),
            ["armed", "upper"] => Ok(Actual::Flag(player.armed_upper)),
            ["armed", "lower"] => Ok(Actual::Flag(player.armed_lower)),
            ["pickup"] => Ok(Actual::Flag(player.pickup)),
            ["charging"] => Ok(Actual::Flag(player.charging)),
            ["input"] => Ok(Actual::Flag(player.input_enabled)),
            ["holding"] => Ok(Actual::Text(&player.holding)),
            other => Err(format!("unknown player property {:?}", other)),
        };
    }
    if let Some(object) = state.objects.get(name) {
        return match &path[1..] {
            ["x"] => Ok(Actual::Number(object.x)),
            ["y"] => Ok(Actual::Number(object.y)),
            ["z"] => Ok(Actual::Number(object.z)),
            ["state"] => Ok(Actual::Text(&object.state)),
            ["holder"] => Ok(Actual::Text(&object.holder)),
            ["target"] => Ok(Actual::Text(&object.target)),
            other => Err(format!("unknown object property {:?}", other)),
        };
    }
    Err(format!(
        "'{}' is not a player or object (players: {:?}, objects: {:?})",
        name,
        state.players.keys().collect::<Vec<_>>(),
        state.objects.keys().collect::<Vec<_>>()
    ))
}

fn compare(actual: &Actual, operator: &str, expected: &str) -> Result<bool, String> {
    match actual {
        Actual::Text(text) => match operator {
            "==" | "=" => Ok(*text == expected),
            "!=" => Ok(*text != expected),
            _ => Err(format!("operator {} needs a number", operator)),
        },
        Actual::Flag(flag) => {
            let value: bool = expected
                .parse()
                .map_err(|_| format!("'{}' is not true/false", expected))?;
            match operator {
                "==" | "=" => Ok(*flag == value),
                "!=" => Ok(*flag != value),
                _ => Err(format!("operator {} needs a number", operator)),
            }
        }
        Actual::Number(number) => {
            let value: f32 = expected
                .parse()
                .map_err(|_| format!("'{}' is not a number", expected))?;
            Ok(match operator {
                ">=" => *number >= value,
                "<=" => *number <= value,
                ">" => *number > value,
                "<" => *number < value,
                "!=" => (number - value).abs() >= 0.1,
                _ => (number - value).abs() < 0.1,
            })
        }
    }
}

fn describe(actual: &Actual) -> String {
    match actual {
        Actual::Text(text) => text.to_string(),
        Actual::Flag(flag) => flag.to_string(),
        Actual::Number(number) => format!("{:.2}", number),
    }
}

/// Check state assertions against world state
pub fn check_state(assertion: &StateAssertion, state: &WorldState) -> Result<(), AssertionError> {
    for check in &assertion.checks {
        let (path, operator, expected) = parse_check(check).ok_or_else(|| AssertionError {
            message: format!("Invalid check syntax: {}", check),
            expected: "format: 'name.property == value' or 'name.property > value'".to_string(),
            actual: check.clone(),
        })?;
        let parts: Vec<&str> = path.split('.').collect();
        let actual = lookup(state, &parts).map_err(|e| AssertionError {
            message: format!("Check '{}' after frame {}: {}", check, assertion.after_frame, e),
            expected: path.to_string(),
            actual: String::new(),
        })?;
        let pass = compare(&actual, operator, expected).map_err(|e| AssertionError {
            message: format!("Check '{}': {}", check, e),
            expected: expected.to_string(),
            actual: describe(&actual),
        })?;
        if !pass {
            return Err(AssertionError {
                message: format!("Check failed after frame {}: {}", assertion.after_frame, check),
                expected: format!("{} {} {}", path, operator, expected),
                actual: describe(&actual),
            });
        }
    }
    Ok(())
}
