//! Parallel simulation execution
//!
//! Uses Rayon to run many seeded matches concurrently. Each match runs in its
//! own Bevy app with minimal threading to avoid hitting OS thread limits.

use rayon::prelude::*;

use super::config::SimConfig;
use super::metrics::MatchResult;
use super::runner::run_match;

/// Initialize the global Rayon pool with the given thread count.
/// Call this once at startup before running parallel simulations.
pub fn init_parallel(threads: usize) -> Result<(), String> {
    if threads == 0 {
        // Rayon's default (auto-detect)
        return Ok(());
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| format!("Failed to initialize Rayon thread pool: {}", e))
}

/// Run `config.matches` matches in parallel
///
/// Match `i` uses seed `base_seed + i`, so results line up with a sequential
/// run of the same config. Returns results in match order.
pub fn run_matches_parallel(config: &SimConfig, base_seed: u64) -> Vec<MatchResult> {
    let config = SimConfig {
        parallel: config.parallel.max(1),
        ..config.clone()
    };
    (0..config.matches)
        .into_par_iter()
        .map(|i| run_match(&config, base_seed.wrapping_add(i as u64)))
        .collect()
}
