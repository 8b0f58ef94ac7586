pub mod patrol;
pub mod pool;
pub mod world;

pub use pool::{EntityPool, Handle, Released};
pub use world::SimulationWorld;
