//! Headless match simulator
//!
//! Runs seeded random-input matches against the gameplay core and reports
//! pass/throw/catch counts plus any invariant violations.
//!
//! Usage:
//!   cargo run --bin simulate -- --help
//!   cargo run --bin simulate -- --matches 20 --players 4 --objects 2
//!   cargo run --bin simulate -- --seed 42 --log-events
//!   cargo run --bin simulate -- --matches 200 --parallel 8 --output results.json

use catchball::simulation::{SimConfig, run_simulation};

fn main() {
    let config = SimConfig::from_args();
    match run_simulation(&config) {
        Ok(results) => {
            let dirty = results.iter().filter(|r| !r.is_clean()).count();
            if dirty > 0 {
                eprintln!("{} match(es) broke an invariant", dirty);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(2);
        }
    }
}
