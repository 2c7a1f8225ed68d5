//! Session `.evlog` files
//!
//! A session starts with an `SE` line carrying a v4 uuid and the local start
//! time, followed by one line per event. [`EventLogger`] streams a live app's
//! bus into a file; [`EventLog`] collects a simulated match in memory and
//! writes it in one go.

use bevy::prelude::*;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::bus::BusEvent;
use super::format::serialize_event;
use super::types::GameEvent;

/// Local timestamp used in log file names
pub fn session_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn session_start(timestamp: &str) -> (String, GameEvent) {
    let session_id = Uuid::new_v4().to_string();
    let event = GameEvent::SessionStart {
        session_id: session_id.clone(),
        timestamp: timestamp.to_string(),
    };
    (session_id, event)
}

fn log_file_name(timestamp: &str, session_id: &str) -> String {
    let short = session_id.get(..8).unwrap_or(session_id);
    format!("{}_{}.evlog", timestamp, short)
}

/// Streams flushed bus events to a file
#[derive(Resource)]
pub struct EventLogger {
    writer: BufWriter<File>,
    session_id: String,
    path: PathBuf,
}

impl EventLogger {
    /// Open a new session file under `dir`
    pub fn create(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let timestamp = session_timestamp();
        let (session_id, start) = session_start(&timestamp);
        let path = dir.join(log_file_name(&timestamp, &session_id));
        let mut logger = Self {
            writer: BufWriter::new(File::create(&path)?),
            session_id,
            path,
        };
        logger.log_at(0, &start);
        info!("Event log: {}", logger.path.display());
        Ok(logger)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_at(&mut self, time_ms: u32, event: &GameEvent) {
        if let Err(e) = writeln!(self.writer, "{}", serialize_event(time_ms, event)) {
            warn!("Failed to write event: {}", e);
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush event log: {}", e);
        }
    }
}

/// In-memory session for headless matches
#[derive(Default)]
pub struct EventLog {
    timestamp: String,
    session_id: String,
    events: Vec<BusEvent>,
}

impl EventLog {
    /// Start a session; the `SE` line is the first event
    pub fn begin(timestamp: &str) -> Self {
        let (session_id, start) = session_start(timestamp);
        Self {
            timestamp: timestamp.to_string(),
            session_id,
            events: vec![BusEvent {
                time_ms: 0,
                event: start,
            }],
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn record(&mut self, time_ms: u32, event: GameEvent) {
        self.events.push(BusEvent { time_ms, event });
    }

    pub fn extend(&mut self, events: &[BusEvent]) {
        self.events.extend_from_slice(events);
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<BusEvent> {
        self.events
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for event in &self.events {
            text.push_str(&event.line());
            text.push('\n');
        }
        text
    }

    /// Write the session to `dir`, returning the file path
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(log_file_name(&self.timestamp, &self.session_id));
        fs::write(&path, self.to_text())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerId;

    #[test]
    fn test_session_line_comes_first() {
        let mut log = EventLog::begin("20260101_000000");
        log.record(
            40,
            GameEvent::Register {
                player: PlayerId(0),
            },
        );
        assert_eq!(log.session_id().len(), 36);
        let text = log.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("T:00000|SE|"));
        assert_eq!(lines[1], "T:00040|RG|P0");
    }

    #[test]
    fn test_write_to_names_file_by_session() {
        let dir = std::env::temp_dir().join(format!("catchball-evlog-{}", Uuid::new_v4()));
        let log = EventLog::begin("20260101_000000");
        let path = log.write_to(&dir).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("20260101_000000_"));
        assert!(name.ends_with(".evlog"));
        assert!(fs::read_to_string(&path).unwrap().contains("|SE|"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_logger_streams_lines() {
        let dir = std::env::temp_dir().join(format!("catchball-logger-{}", Uuid::new_v4()));
        let mut logger = EventLogger::create(&dir).unwrap();
        logger.log_at(
            16,
            &GameEvent::CooldownEnd {
                player: PlayerId(2),
            },
        );
        logger.flush();
        let text = fs::read_to_string(logger.path()).unwrap();
        assert!(text.lines().next().unwrap().contains(logger.session_id()));
        assert!(text.contains("T:00016|CD|P2"));
        fs::remove_dir_all(&dir).ok();
    }
}
