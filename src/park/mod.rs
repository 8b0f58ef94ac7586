//! External collaborators: map, pathfinding, rides and notifications

pub mod map;
pub mod notify;
pub mod pathing;
pub mod rides;
pub mod sandbox;

pub use map::WorldMap;
pub use notify::{Notification, Notifier};
pub use pathing::{PathGoal, PathRequest, PathStep, Pathfinder, PathingFlags};
pub use rides::{RideEconomy, RideInfo};
pub use sandbox::SandboxPark;

/// Everything the agents talk to outside the entity pool
pub trait ParkServices: WorldMap + Pathfinder + RideEconomy + Notifier {}

impl<T: WorldMap + Pathfinder + RideEconomy + Notifier> ParkServices for T {}
