//! Collaborator seams - physics, animation, and their queues

mod physics;
mod presentation;

pub use physics::*;
pub use presentation::*;
