//! Scenario runner CLI
//!
//! Usage:
//!   cargo run --bin test-scenarios                          # every scenario
//!   cargo run --bin test-scenarios -- passing/              # one category
//!   cargo run --bin test-scenarios -- control/switch_cycle  # one scenario
//!   cargo run --bin test-scenarios -- --verbose             # expected/actual on failure

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use catchball::testing::{SCENARIOS_DIR, TestResult, parser::parse_test_file, run_test};

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
    errors: usize,
}

impl Tally {
    fn add(&mut self, result: &TestResult) {
        match result {
            TestResult::Pass { .. } => self.passed += 1,
            TestResult::Fail { .. } => self.failed += 1,
            TestResult::Error { .. } => self.errors += 1,
        }
    }

    fn clean(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

fn main() {
    let mut verbose = false;
    let mut filter = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            other if !other.starts_with('-') => filter = Some(other.to_string()),
            other => eprintln!("Ignoring unknown flag {}", other),
        }
    }

    let root = Path::new(SCENARIOS_DIR);
    let by_category = collect_scenarios(root, filter.as_deref());
    if by_category.is_empty() {
        println!("No scenarios under {} (filter: {:?})", SCENARIOS_DIR, filter);
        std::process::exit(1);
    }

    println!("Catch/Throw Scenarios");
    println!("=====================");
    let mut tally = Tally::default();
    for (category, paths) in &by_category {
        println!("\n{}/", category);
        for path in paths {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let result = match parse_test_file(path) {
                Ok(def) => run_test(&def),
                Err(message) => TestResult::Error { message },
            };
            print_result(&name, &result, verbose);
            tally.add(&result);
        }
    }

    println!("\n=====================");
    println!(
        "Results: {} passed, {} failed, {} errors",
        tally.passed, tally.failed, tally.errors
    );
    if !tally.clean() {
        std::process::exit(1);
    }
}

/// Scenario files grouped by their directory relative to `root`, sorted
fn collect_scenarios(root: &Path, filter: Option<&str>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut found: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|e| e.path()) {
            if path.is_dir() {
                dirs.push(path);
                continue;
            }
            if !path.extension().is_some_and(|e| e == "toml") {
                continue;
            }
            let rel = path.strip_prefix(root).unwrap_or(&path);
            if filter.is_some_and(|f| !rel.to_string_lossy().contains(f)) {
                continue;
            }
            let category = rel
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| ".".to_string());
            found.entry(category).or_default().push(path);
        }
    }
    for paths in found.values_mut() {
        paths.sort();
    }
    found
}

fn print_result(name: &str, result: &TestResult, verbose: bool) {
    let dots = ".".repeat(40usize.saturating_sub(name.len()).max(1));
    match result {
        TestResult::Pass { frames } => println!("  {} {} PASS ({} frames)", name, dots, frames),
        TestResult::Fail { error } => {
            println!("  {} {} FAIL", name, dots);
            if verbose {
                println!("    {}", error);
            } else {
                println!("    {}", error.message);
            }
        }
        TestResult::Error { message } => {
            println!("  {} {} ERROR", name, dots);
            println!("    {}", message);
        }
    }
}
