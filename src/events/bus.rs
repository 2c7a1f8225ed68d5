//! Event Bus - timestamped record of gameplay transitions
//!
//! Core systems emit events as they mutate state. `flush_event_bus` runs
//! last in the core chain and moves the tick's events to the processed list,
//! writing them to the session log when a logger is installed. Readers
//! (simulation metrics, scenario assertions) consume `processed()` and clear
//! it themselves.

use bevy::prelude::*;

use super::format::serialize_event;
use super::logger::EventLogger;
use super::types::GameEvent;

/// Event stamped with the match clock
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub time_ms: u32,
    pub event: GameEvent,
}

impl BusEvent {
    /// Compact log line for this event
    pub fn line(&self) -> String {
        serialize_event(self.time_ms, &self.event)
    }
}

/// Central event bus. `Default` is a muted bus; use [`EventBus::new`] to
/// record.
#[derive(Resource, Default)]
pub struct EventBus {
    /// Emitted this tick, in emission order
    pending: Vec<BusEvent>,
    processed: Vec<BusEvent>,
    clock_ms: u32,
    recording: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            recording: true,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.recording
    }

    /// Stamp later events with this match time
    pub fn set_clock(&mut self, elapsed_secs: f32) {
        self.clock_ms = (elapsed_secs * 1000.0) as u32;
    }

    pub fn emit(&mut self, event: GameEvent) {
        if self.recording {
            self.pending.push(BusEvent {
                time_ms: self.clock_ms,
                event,
            });
        }
    }

    /// Move this tick's events to the processed list and return them
    pub fn flush(&mut self) -> &[BusEvent] {
        let start = self.processed.len();
        self.processed.append(&mut self.pending);
        &self.processed[start..]
    }

    /// Every flushed event since the last clear
    pub fn processed(&self) -> &[BusEvent] {
        &self.processed
    }

    pub fn clear_processed(&mut self) {
        self.processed.clear();
    }
}

pub fn update_event_bus_time(mut bus: ResMut<EventBus>, time: Res<Time>) {
    bus.set_clock(time.elapsed_secs());
}

pub fn flush_event_bus(mut bus: ResMut<EventBus>, logger: Option<ResMut<EventLogger>>) {
    let flushed = bus.flush();
    if let Some(mut logger) = logger {
        for event in flushed {
            logger.log_at(event.time_ms, &event.event);
        }
    }
}
