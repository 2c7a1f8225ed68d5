//! Ball module - throwable components, possession registry and interaction systems

mod components;
mod guided;
mod interaction;
mod possession;

pub use components::*;
pub use guided::*;
pub use interaction::*;
pub use possession::*;
