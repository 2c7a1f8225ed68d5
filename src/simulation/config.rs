//! Simulation configuration

use serde::{Deserialize, Serialize};

/// Configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of matches to run
    pub matches: u32,
    /// Players on the team (at least 2)
    pub players: u32,
    /// Throwable objects in play
    pub objects: u32,
    /// Match duration in seconds
    pub duration: f32,
    /// Tick rate of the headless app
    pub fps: f32,
    /// RNG seed for reproducibility (None = random)
    pub seed: Option<u64>,
    /// Output file path for JSON results (None = summary only)
    pub output_file: Option<String>,
    /// Write a `.evlog` per match into `log_dir`
    pub log_events: bool,
    pub log_dir: String,
    /// Suppress progress output
    pub quiet: bool,
    /// Route gameplay `info!`/`warn!` output to the terminal
    pub verbose: bool,
    /// Number of parallel threads (0 = sequential, N = N threads)
    pub parallel: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            matches: 1,
            players: 4,
            objects: 1,
            duration: 60.0,
            fps: 60.0,
            seed: None,
            output_file: None,
            log_events: false,
            log_dir: "logs/sim".to_string(),
            quiet: false,
            verbose: false,
            parallel: 0,
        }
    }
}

/// Local simulation settings (gitignored, user's custom settings)
pub const SIM_SETTINGS_FILE: &str = "config/simulation_settings.json";

impl SimConfig {
    /// Load configuration from a JSON settings file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?;
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse {}: {}", path, e))
    }

    /// Parse configuration from command line arguments
    pub fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::parse_args(&args[1..])
    }

    /// Apply command line overrides on top of the settings file (or defaults)
    pub fn parse_args(args: &[String]) -> Self {
        let mut config = Self::from_file(SIM_SETTINGS_FILE).unwrap_or_default();

        let mut i = 0;
        while i < args.len() {
            let value = args.get(i + 1);
            match args[i].as_str() {
                "--settings" => {
                    if let Some(path) = value {
                        match Self::from_file(path) {
                            Ok(loaded) => config = loaded,
                            Err(e) => eprintln!("Warning: {}", e),
                        }
                        i += 1;
                    }
                }
                "--matches" => {
                    if let Some(v) = value {
                        config.matches = v.parse().unwrap_or(1);
                        i += 1;
                    }
                }
                "--players" => {
                    if let Some(v) = value {
                        config.players = v.parse::<u32>().unwrap_or(4).max(2);
                        i += 1;
                    }
                }
                "--objects" => {
                    if let Some(v) = value {
                        config.objects = v.parse::<u32>().unwrap_or(1).max(1);
                        i += 1;
                    }
                }
                "--duration" => {
                    if let Some(v) = value {
                        config.duration = v.parse().unwrap_or(60.0);
                        i += 1;
                    }
                }
                "--seed" => {
                    if let Some(v) = value {
                        config.seed = v.parse().ok();
                        i += 1;
                    }
                }
                "--output" => {
                    if let Some(v) = value {
                        config.output_file = Some(v.clone());
                        i += 1;
                    }
                }
                "--log-events" => {
                    config.log_events = true;
                }
                "--log-dir" => {
                    if let Some(v) = value {
                        config.log_dir = v.clone();
                        i += 1;
                    }
                }
                "--parallel" => {
                    if let Some(v) = value {
                        config.parallel = v.parse().unwrap_or(0);
                        i += 1;
                    }
                }
                "--quiet" | "-q" => {
                    config.quiet = true;
                }
                "--verbose" | "-v" => {
                    config.verbose = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Warning: ignoring unknown argument {}", other);
                }
            }
            i += 1;
        }

        config
    }
}

fn print_help() {
    println!(
        r#"Catchball Simulation - headless random-input matches with invariant checks

USAGE:
    cargo run --bin simulate -- [OPTIONS]

OPTIONS:
    --settings <FILE>   Load settings from JSON file (CLI args override file settings)
    --matches <N>       Number of matches (default: 1)
    --players <N>       Players on the team, at least 2 (default: 4)
    --objects <N>       Throwable objects in play (default: 1)
    --duration <SECS>   Match duration in seconds (default: 60)
    --seed <N>          RNG seed for reproducibility
    --output <FILE>     Write JSON results to file
    --log-events        Write a .evlog per match
    --log-dir <DIR>     Event log directory (default: logs/sim)
    --parallel <N>      Run matches in parallel with N threads
    --quiet, -q         Suppress progress output
    --verbose, -v       Print gameplay log lines
    --help, -h          Show this help

EXAMPLES:
    # 100 seeded matches on 8 threads
    cargo run --bin simulate -- --matches 100 --seed 7 --parallel 8

    # One long match with three objects and an event log
    cargo run --bin simulate -- --players 6 --objects 3 --duration 300 --log-events
"#
    );
}
