//! Gameplay event logging
//!
//! Provides a compact text format for every possession, intent, catch and
//! roster transition. Used by scenario tests, simulations and session logs.

mod bus;
mod format;
mod logger;
mod types;

pub use bus::{BusEvent, EventBus, flush_event_bus, update_event_bus_time};
pub use format::{serialize_event, strip_timestamp};
pub use logger::{EventLog, EventLogger, session_timestamp};
pub use types::GameEvent;
