//! Agent state machines and the tick that drives them

pub mod context;
pub mod guest;
pub mod movement;
pub mod staff;
pub mod tick;

#[cfg(test)]
pub(crate) mod fixture;

pub use context::{Fate, TickContext};
pub use tick::{run_simulation_tick, SimulationEvent};
