//! Shooting module - charge, targeting, trajectory and throw systems

mod charge;
mod targeting;
mod throw;
mod trajectory;

pub use charge::*;
pub use targeting::*;
pub use throw::*;
pub use trajectory::*;
