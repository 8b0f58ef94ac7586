//! Pathfinding call contract
//!
//! The search itself is external. Agents ask for one step at a time each
//! time they reach their current destination.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::rng::ScenarioRng;
use crate::core::types::{CoordsXY, CoordsXYZ, Direction, RideId, StationIndex};

bitflags! {
    /// Result flags of one pathing step
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PathingFlags: u8 {
        const DESTINATION_REACHED = 1 << 0;
        const OUTSIDE_PARK = 1 << 1;
        const RIDE_EXIT = 1 << 2;
        const RIDE_ENTRANCE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathGoal {
    Wander,
    Ride(RideId),
    ParkExit,
    ParkEntrance,
    Location(CoordsXYZ),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathRequest {
    pub from: CoordsXYZ,
    pub goal: PathGoal,
    /// Directions the agent may step in, one bit each
    pub allowed_directions: u8,
    pub is_staff: bool,
}

/// Something the chosen step walks into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathInteraction {
    QueueEntrance { ride: RideId, station: StationIndex },
    Shop(RideId),
    ParkEntrance,
    RideEntrance { ride: RideId, station: StationIndex },
    RideExit { ride: RideId, station: StationIndex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// `None` when no step is possible
    pub next: Option<CoordsXYZ>,
    pub direction: Direction,
    pub on_surface: bool,
    pub sloped: bool,
    pub flags: PathingFlags,
    pub interaction: Option<PathInteraction>,
}

impl PathStep {
    pub fn blocked() -> Self {
        Self {
            next: None,
            direction: 0,
            on_surface: false,
            sloped: false,
            flags: PathingFlags::empty(),
            interaction: None,
        }
    }

    /// Tile centre the agent should walk to
    pub fn target(&self) -> Option<CoordsXY> {
        self.next.map(|loc| loc.xy().to_tile_centre())
    }
}

pub trait Pathfinder {
    fn next_step(&self, request: &PathRequest, rng: &mut ScenarioRng) -> PathStep;
}
