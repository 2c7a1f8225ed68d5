//! Presentation collaborator seam
//!
//! Clip playback and blending live outside the core. Requests go out through
//! [`PresentationCommands`]; clip state comes back through [`AnimationStatus`]
//! and one-shot frame signals through [`AnimationSignals`].

use bevy::prelude::*;
use std::collections::HashMap;

use crate::constants::CLIP_FINISHED_PROGRESS;
use crate::player::PlayerId;

/// Fire-and-forget requests to the animation layer
pub trait PresentationSink {
    fn play_discrete_state(&mut self, player: PlayerId, name: &'static str);
    fn set_continuous_param(&mut self, player: PlayerId, name: &'static str, value: f32);
    fn set_layer_weight(&mut self, player: PlayerId, layer: &'static str, weight: f32);
}

/// Read-only view of what each player's animator is playing
pub trait AnimationGate {
    fn is_in_named_state(&self, player: PlayerId, name: &str) -> bool;
    /// Normalized progress of the current clip
    fn progress(&self, player: PlayerId) -> f32;

    fn clip_finished(&self, player: PlayerId, name: &str) -> bool {
        self.is_in_named_state(player, name) && self.progress(player) >= CLIP_FINISHED_PROGRESS
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCommand {
    PlayDiscreteState {
        player: PlayerId,
        name: &'static str,
    },
    SetContinuousParam {
        player: PlayerId,
        name: &'static str,
        value: f32,
    },
    SetLayerWeight {
        player: PlayerId,
        layer: &'static str,
        weight: f32,
    },
}

/// Outbox drained by the presentation layer once per tick
#[derive(Resource, Default, Debug)]
pub struct PresentationCommands {
    pending: Vec<PresentationCommand>,
}

impl PresentationCommands {
    pub fn peek(&self) -> &[PresentationCommand] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<PresentationCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl PresentationSink for PresentationCommands {
    fn play_discrete_state(&mut self, player: PlayerId, name: &'static str) {
        self.pending
            .push(PresentationCommand::PlayDiscreteState { player, name });
    }

    fn set_continuous_param(&mut self, player: PlayerId, name: &'static str, value: f32) {
        self.pending
            .push(PresentationCommand::SetContinuousParam { player, name, value });
    }

    fn set_layer_weight(&mut self, player: PlayerId, layer: &'static str, weight: f32) {
        self.pending
            .push(PresentationCommand::SetLayerWeight { player, layer, weight });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipStatus {
    pub name: String,
    pub progress: f32,
}

/// Current clip per player, written by the presentation layer
#[derive(Resource, Default, Debug)]
pub struct AnimationStatus {
    clips: HashMap<PlayerId, ClipStatus>,
}

impl AnimationStatus {
    pub fn set(&mut self, player: PlayerId, name: impl Into<String>, progress: f32) {
        self.clips.insert(
            player,
            ClipStatus {
                name: name.into(),
                progress,
            },
        );
    }

    pub fn get(&self, player: PlayerId) -> Option<&ClipStatus> {
        self.clips.get(&player)
    }
}

impl AnimationGate for AnimationStatus {
    fn is_in_named_state(&self, player: PlayerId, name: &str) -> bool {
        self.clips.get(&player).is_some_and(|c| c.name == name)
    }

    fn progress(&self, player: PlayerId) -> f32 {
        self.clips.get(&player).map(|c| c.progress).unwrap_or(0.0)
    }
}

/// Frame markers raised by clips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationSignal {
    /// The hand reached the object in a take or catch clip
    AttachFrame(PlayerId),
    /// The throw clip reached its release frame
    ReleaseFrame(PlayerId),
}

/// Inbox of frame markers, drained by the core each tick
#[derive(Resource, Default, Debug)]
pub struct AnimationSignals {
    pending: Vec<AnimationSignal>,
}

impl AnimationSignals {
    pub fn push(&mut self, signal: AnimationSignal) {
        self.pending.push(signal);
    }

    pub fn drain(&mut self) -> Vec<AnimationSignal> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_finished_needs_name_and_progress() {
        let mut status = AnimationStatus::default();
        let player = PlayerId(0);
        assert!(!status.clip_finished(player, "Catch_Upper"));

        status.set(player, "Catch_Upper", 0.9);
        assert!(!status.clip_finished(player, "Catch_Upper"));

        status.set(player, "Catch_Upper", 0.95);
        assert!(status.clip_finished(player, "Catch_Upper"));
        assert!(!status.clip_finished(player, "Throw_Run"));
    }
}
