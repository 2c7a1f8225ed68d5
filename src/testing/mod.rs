//! Scenario testing for deterministic gameplay checks
//!
//! Runs scripted human input against the headless app and verifies the
//! resulting event sequence and world state.

pub mod assertions;
pub mod input;
pub mod parser;
pub mod runner;

pub use assertions::{AssertionError, check_sequence, check_state};
pub use input::ScriptedInputs;
pub use parser::{ExpectedEvent, FrameInput, StateAssertion, TestDefinition, TestExpectations, TestSetup};
pub use runner::{TestResult, run_test};

/// Default path for scenario files
pub const SCENARIOS_DIR: &str = "tests/scenarios";
