//! Headless App Builder
//!
//! Provides a reusable builder for creating headless Bevy apps running the
//! gameplay core. Used by the simulation runner, scenario tests, and parallel
//! execution.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use crate::events::{EventBus, EventLogger};
use crate::gameplay::GameplayPlugin;
use crate::tuning::GameplayTuning;

use super::headless::HeadlessCollaboratorsPlugin;

/// Builder for creating headless Bevy apps
pub struct HeadlessAppBuilder {
    tuning: Option<GameplayTuning>,
    fps: f32,
    minimal_threads: bool,
    collaborators: bool,
    event_logger: Option<EventLogger>,
    logging: bool,
}

impl Default for HeadlessAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessAppBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            tuning: None,
            fps: 60.0,
            minimal_threads: false,
            collaborators: true,
            event_logger: None,
            logging: false,
        }
    }

    /// Use explicit tuning instead of `config/gameplay_tuning.json`
    pub fn with_tuning(mut self, tuning: GameplayTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Set the tick rate (default: 60)
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = fps;
        self
    }

    /// Enable minimal thread mode (task pools = 1)
    ///
    /// Use this when running many apps in parallel to avoid hitting OS thread limits.
    pub fn with_minimal_threads(mut self) -> Self {
        self.minimal_threads = true;
        self
    }

    /// Leave out the stand-in arena and animator; the caller feeds the
    /// collaborator queues itself
    pub fn without_collaborators(mut self) -> Self {
        self.collaborators = false;
        self
    }

    /// Write every flushed event to a session log
    pub fn with_event_logger(mut self, logger: EventLogger) -> Self {
        self.event_logger = Some(logger);
        self
    }

    /// Add `LogPlugin` so gameplay log lines reach the terminal
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Seconds advanced by each `app.update()`
    pub fn tick(&self) -> f32 {
        1.0 / self.fps
    }

    /// Build the app with minimal plugins and the gameplay core
    ///
    /// The returned app has:
    /// - MinimalPlugins with ScheduleRunnerPlugin
    /// - A fixed manual time step of `1 / fps` per update
    /// - GameplayPlugin with an enabled EventBus
    /// - The headless arena and scripted animator unless disabled
    pub fn build(self) -> App {
        let mut app = App::new();
        let step = Duration::from_secs_f32(self.tick());

        if self.minimal_threads {
            // Reduce Bevy's internal thread pools to minimum
            app.add_plugins(
                MinimalPlugins
                    .set(ScheduleRunnerPlugin::run_loop(step))
                    .set(TaskPoolPlugin {
                        task_pool_options: TaskPoolOptions::with_num_threads(1),
                    }),
            );
        } else {
            app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(step)));
        }
        if self.logging {
            app.add_plugins(LogPlugin::default());
        }
        app.insert_resource(TimeUpdateStrategy::ManualDuration(step));
        app.insert_resource(EventBus::new());
        if let Some(logger) = self.event_logger {
            app.insert_resource(logger);
        }

        app.add_plugins(GameplayPlugin {
            tuning: self.tuning,
        });
        if self.collaborators {
            app.add_plugins(HeadlessCollaboratorsPlugin);
        }

        app
    }
}
