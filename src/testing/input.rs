//! Scripted input injection for scenarios

use bevy::prelude::*;
use std::collections::BTreeMap;

use super::parser::{EdgeDef, FrameInput};
use crate::input::{Button, PlayerInput};

/// Frame-indexed human input for one scenario
#[derive(Default)]
pub struct ScriptedInputs {
    frames: BTreeMap<u64, Vec<FrameInput>>,
    /// Releases owed by taps, by frame
    pending_up: BTreeMap<u64, Vec<Button>>,
    move_dir: Vec2,
}

impl ScriptedInputs {
    pub fn from_inputs(inputs: &[FrameInput]) -> Self {
        let mut frames: BTreeMap<u64, Vec<FrameInput>> = BTreeMap::new();
        for input in inputs {
            frames.entry(input.frame).or_default().push(input.clone());
        }
        Self {
            frames,
            ..Default::default()
        }
    }

    /// Queue the edges and movement for `frame`
    pub fn apply(&mut self, frame: u64, input: &mut PlayerInput) {
        if let Some(buttons) = self.pending_up.remove(&frame) {
            for button in buttons {
                input.release(button);
            }
        }
        let Some(entries) = self.frames.get(&frame) else {
            input.set_move(self.move_dir);
            return;
        };
        for entry in entries {
            let edges = [
                (Button::Pass, entry.pass),
                (Button::Attack, entry.attack),
                (Button::SwitchPlayer, entry.switch),
            ];
            for (button, edge) in edges {
                match edge {
                    Some(EdgeDef::Down) => input.press(button),
                    Some(EdgeDef::Up) => input.release(button),
                    Some(EdgeDef::Tap) => {
                        input.press(button);
                        self.pending_up.entry(frame + 1).or_default().push(button);
                    }
                    None => {}
                }
            }
            if let Some(x) = entry.move_x {
                self.move_dir.x = x;
            }
            if let Some(z) = entry.move_z {
                self.move_dir.y = z;
            }
        }
        input.set_move(self.move_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonEdge;

    #[test]
    fn test_tap_releases_next_frame() {
        let mut scripted = ScriptedInputs::from_inputs(&[FrameInput {
            frame: 2,
            attack: Some(EdgeDef::Tap),
            move_x: Some(1.0),
            ..Default::default()
        }]);
        let mut input = PlayerInput::default();
        scripted.apply(2, &mut input);
        assert_eq!(input.edges, vec![ButtonEdge::Down(Button::Attack)]);
        assert_eq!(input.move_dir, Vec2::X);

        input.edges.clear();
        scripted.apply(3, &mut input);
        assert_eq!(input.edges, vec![ButtonEdge::Up(Button::Attack)]);
        // Movement persists
        assert_eq!(input.move_dir, Vec2::X);
    }
}
