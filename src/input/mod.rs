//! Input module - PlayerInput resource and per-player routing

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::MOVING_THRESHOLD;
use crate::events::GameEvent;
use crate::gameplay::GameplayParams;
use crate::player::{InputGate, Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Pass,
    Attack,
    SwitchPlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonEdge {
    Down(Button),
    Up(Button),
}

impl ButtonEdge {
    pub fn button(self) -> Button {
        match self {
            ButtonEdge::Down(button) | ButtonEdge::Up(button) => button,
        }
    }
}

/// Buffered input for the human-controlled player, filled by a device layer
/// or a script and consumed once per tick
#[derive(Resource, Default, Debug)]
pub struct PlayerInput {
    pub edges: Vec<ButtonEdge>,
    pub move_dir: Vec2,
}

impl PlayerInput {
    pub fn press(&mut self, button: Button) {
        self.edges.push(ButtonEdge::Down(button));
    }

    pub fn release(&mut self, button: Button) {
        self.edges.push(ButtonEdge::Up(button));
    }

    pub fn set_move(&mut self, dir: Vec2) {
        self.move_dir = dir.clamp_length_max(1.0);
    }
}

/// Input delivered to one player this tick
#[derive(Component, Default, Debug, Clone)]
pub struct InputState {
    pub edges: Vec<ButtonEdge>,
    pub move_dir: Vec2,
}

impl InputState {
    pub fn is_moving(&self) -> bool {
        self.move_dir.length() > MOVING_THRESHOLD
    }

    /// Remove and return edges for one button, keeping the rest in order
    pub fn take_edges_for(&mut self, button: Button) -> Vec<ButtonEdge> {
        let (taken, kept): (Vec<_>, Vec<_>) =
            self.edges.drain(..).partition(|e| e.button() == button);
        self.edges = kept;
        taken
    }

    pub fn take_edges(&mut self) -> Vec<ButtonEdge> {
        std::mem::take(&mut self.edges)
    }
}

/// Copy the buffered human input onto the active player.
/// Everyone else stands still; a gated player receives nothing.
pub fn route_human_input(
    ctx: GameplayParams,
    mut input: ResMut<PlayerInput>,
    mut players: Query<(&Player, &InputGate, &mut InputState)>,
) {
    let edges = std::mem::take(&mut input.edges);
    let active = ctx.team.active();
    for (player, gate, mut state) in &mut players {
        state.edges.clear();
        state.move_dir = Vec2::ZERO;
        if Some(player.id) != active {
            continue;
        }
        if !gate.enabled {
            if !edges.is_empty() {
                debug!("{} input gated, dropped {} edges", player.id, edges.len());
            }
            continue;
        }
        state.edges.extend(edges.iter().copied());
        state.move_dir = input.move_dir;
    }
}

/// Deferred enable after spawn
pub fn on_input_enable(ctx: &mut GameplayParams, player: PlayerId, gate: &mut InputGate) {
    if gate.enabled {
        return;
    }
    gate.enabled = true;
    ctx.bus.emit(GameEvent::InputEnabled { player });
}
