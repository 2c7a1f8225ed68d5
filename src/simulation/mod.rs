//! Headless simulation - the gameplay core against stand-in collaborators
//!
//! Provides the headless app builder, the stand-in arena and animator, and a
//! seeded random-input match runner that checks invariants every tick.

pub mod app_builder;
pub mod config;
pub mod headless;
pub mod metrics;
pub mod parallel;
pub mod runner;

pub use app_builder::HeadlessAppBuilder;
pub use config::SimConfig;
pub use headless::{HeadlessArena, HeadlessCollaboratorsPlugin, ScriptedAnimator};
pub use metrics::{BatchSummary, MatchResult, PlayerStats, SimMetrics};
pub use runner::{check_world_invariants, run_match, run_simulation};
