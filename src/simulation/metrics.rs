//! Metrics collection for headless matches

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::{BusEvent, GameEvent};
use crate::player::PlayerId;

/// Statistics for a single player during a match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Committed passes that found a receiver
    pub passes: u32,
    /// Forward throws (attacks and failed-gate fallbacks)
    pub throws: u32,
    pub catches: u32,
    pub pickups: u32,
    /// Time holding an object (seconds)
    pub possession_time: f32,
}

/// Counters fed from the event stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimMetrics {
    pub players: BTreeMap<u32, PlayerStats>,
    pub guided_arrivals: u32,
    pub guided_cancels: u32,
    pub settles: u32,
    pub drops: u32,
    pub reserve_failures: u32,
    pub control_switches: u32,
    /// Pass gate failures by reason code
    pub gate_failures: BTreeMap<String, u32>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn player(&mut self, player: PlayerId) -> &mut PlayerStats {
        self.players.entry(player.0).or_default()
    }

    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Release { thrower, target, .. } => {
                let stats = self.player(*thrower);
                if target.is_some() {
                    stats.passes += 1;
                } else {
                    stats.throws += 1;
                }
            }
            GameEvent::GuidedStart { thrower, .. } => self.player(*thrower).passes += 1,
            GameEvent::CatchBegin { player, .. } => self.player(*player).catches += 1,
            GameEvent::Reserve { player, .. } => self.player(*player).pickups += 1,
            GameEvent::GuidedArrive { .. } => self.guided_arrivals += 1,
            GameEvent::GuidedCancel { .. } => self.guided_cancels += 1,
            GameEvent::Settle { .. } => self.settles += 1,
            GameEvent::Drop { .. } => self.drops += 1,
            GameEvent::ReserveFail { .. } => self.reserve_failures += 1,
            GameEvent::ControlSwitch { .. } => self.control_switches += 1,
            GameEvent::PassGate {
                passed: false,
                reason: Some(reason),
                ..
            } => {
                *self
                    .gate_failures
                    .entry(reason.code().to_string())
                    .or_insert(0) += 1;
            }
            _ => {}
        }
    }

    /// Add `dt` of possession time to every current holder
    pub fn track_possession(&mut self, holders: impl IntoIterator<Item = PlayerId>, dt: f32) {
        for holder in holders {
            self.player(holder).possession_time += dt;
        }
    }

    pub fn total_passes(&self) -> u32 {
        self.players.values().map(|p| p.passes).sum()
    }

    pub fn total_throws(&self) -> u32 {
        self.players.values().map(|p| p.throws).sum()
    }

    pub fn total_catches(&self) -> u32 {
        self.players.values().map(|p| p.catches).sum()
    }
}

/// Result of a single match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub seed: u64,
    pub players: u32,
    pub objects: u32,
    /// Simulated seconds
    pub duration: f32,
    pub ticks: u32,
    pub metrics: SimMetrics,
    /// Invariant violations, one line each, with the tick they were seen on
    pub violations: Vec<String>,
    /// Logged events for this match
    #[serde(skip)]
    pub events: Vec<BusEvent>,
}

impl MatchResult {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Aggregate over a batch of matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub matches: u32,
    pub clean_matches: u32,
    pub passes: u32,
    pub throws: u32,
    pub catches: u32,
    pub guided_arrivals: u32,
    /// Share of guided passes that ended in a catch
    pub catch_rate: f32,
}

impl BatchSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut summary = Self {
            matches: results.len() as u32,
            ..Default::default()
        };
        for result in results {
            if result.is_clean() {
                summary.clean_matches += 1;
            }
            summary.passes += result.metrics.total_passes();
            summary.throws += result.metrics.total_throws();
            summary.catches += result.metrics.total_catches();
            summary.guided_arrivals += result.metrics.guided_arrivals;
        }
        if summary.passes > 0 {
            summary.catch_rate = summary.catches as f32 / summary.passes as f32;
        }
        summary
    }

    pub fn format_table(&self) -> String {
        format!(
            "matches: {} ({} clean)\npasses:  {}\nthrows:  {}\ncatches: {} ({:.0}% of passes)\narrivals: {}",
            self.matches,
            self.clean_matches,
            self.passes,
            self.throws,
            self.catches,
            self.catch_rate * 100.0,
            self.guided_arrivals
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ball::ThrowableId;
    use crate::catching::CatchZone;
    use crate::shooting::GateFailure;

    #[test]
    fn test_records_pass_and_catch() {
        let mut metrics = SimMetrics::new();
        metrics.record(&GameEvent::GuidedStart {
            object: ThrowableId(0),
            thrower: PlayerId(0),
            target: PlayerId(1),
            duration: 0.4,
        });
        metrics.record(&GameEvent::CatchBegin {
            player: PlayerId(1),
            zone: CatchZone::Upper,
            object: ThrowableId(0),
        });
        metrics.record(&GameEvent::PassGate {
            player: PlayerId(1),
            target: None,
            passed: false,
            reason: Some(GateFailure::NoTarget),
        });
        assert_eq!(metrics.total_passes(), 1);
        assert_eq!(metrics.total_catches(), 1);
        assert_eq!(metrics.gate_failures.get("none"), Some(&1));
    }

    #[test]
    fn test_summary_catch_rate() {
        let mut metrics = SimMetrics::new();
        metrics.player(PlayerId(0)).passes = 4;
        metrics.player(PlayerId(1)).catches = 3;
        let result = MatchResult {
            seed: 1,
            players: 2,
            objects: 1,
            duration: 10.0,
            ticks: 600,
            metrics,
            violations: vec!["tick 3: boom".to_string()],
            events: Vec::new(),
        };
        let summary = BatchSummary::from_results(&[result]);
        assert_eq!(summary.clean_matches, 0);
        assert!((summary.catch_rate - 0.75).abs() < 1e-6);
    }
}
