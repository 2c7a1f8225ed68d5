//! Player module - identity, body pose, and activity state

mod activity;
mod components;

pub use activity::*;
pub use components::*;
