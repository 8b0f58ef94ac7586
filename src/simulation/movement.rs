//! Sub-tile movement and path stepping shared by guests and staff

use crate::core::rng::ScenarioRng;
use crate::core::types::{CoordsXYZ, DIRECTION_OFFSETS};
use crate::entity::agent::{NextTile, Peep, PeepAction, PeepState};
use crate::park::map::WorldMap;
use crate::park::pathing::{PathGoal, PathInteraction, PathRequest, PathingFlags};
use crate::park::ParkServices;
use crate::simulation::context::Fate;

/// All four directions allowed
pub const ALL_DIRECTIONS: u8 = 0xF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStep {
    /// Took one unit step; the position is already updated
    Moved,
    /// Still playing an animation
    Animating,
    /// Within tolerance of the destination
    Arrived,
}

/// Manhattan distance from the peep to its destination
pub fn distance_to_destination(peep: &Peep) -> i32 {
    peep.position.xy().manhattan(peep.destination.loc)
}

/// Advance the running animation, or take one unit step toward the
/// destination along the axis with the larger gap
pub fn update_action(peep: &mut Peep) -> ActionStep {
    match peep.action {
        PeepAction::Animation { kind, frame } => {
            let frame = frame.saturating_add(1);
            peep.action = if frame >= kind.frames() {
                PeepAction::Walking
            } else {
                PeepAction::Animation { kind, frame }
            };
            ActionStep::Animating
        }
        PeepAction::Walking => {
            let here = peep.position.xy();
            let dest = peep.destination.loc;
            let dx = (here.x - dest.x).abs();
            let dy = (here.y - dest.y).abs();
            if dx + dy <= peep.destination.tolerance as i32 {
                return ActionStep::Arrived;
            }

            let direction = if dx < dy {
                if here.y - dest.y >= 0 {
                    3
                } else {
                    1
                }
            } else if here.x - dest.x >= 0 {
                0
            } else {
                2
            };
            let delta = DIRECTION_OFFSETS[direction];
            peep.position.x += delta.x;
            peep.position.y += delta.y;
            ActionStep::Moved
        }
    }
}

/// Record the tile the peep is standing on
pub fn refresh_current_tile<M: WorldMap + ?Sized>(peep: &mut Peep, map: &M) {
    let loc = peep.position.xy().to_tile_start().with_z(peep.position.z);
    peep.next = match map.path_at(loc) {
        Some(path) => NextTile {
            loc,
            on_surface: false,
            sloped: path.sloped,
        },
        None => NextTile {
            loc,
            on_surface: true,
            sloped: false,
        },
    };
}

/// What a call to [`perform_next_action`] produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathOutcome {
    pub flags: PathingFlags,
    pub interaction: Option<PathInteraction>,
    /// Tile the peep is now walking onto
    pub next: Option<CoordsXYZ>,
}

impl PathOutcome {
    pub fn reached(&self) -> bool {
        self.flags.contains(PathingFlags::DESTINATION_REACHED)
    }
}

/// Walk toward the destination; on arrival ask the pathfinder for the next
/// tile and aim for its centre
pub fn perform_next_action(
    peep: &mut Peep,
    goal: PathGoal,
    allowed_directions: u8,
    is_staff: bool,
    park: &mut dyn ParkServices,
    rng: &mut ScenarioRng,
) -> PathOutcome {
    if update_action(peep) != ActionStep::Arrived {
        return PathOutcome::default();
    }

    refresh_current_tile(peep, &*park);
    let request = PathRequest {
        from: peep.next.loc,
        goal,
        allowed_directions,
        is_staff,
    };
    let step = park.next_step(&request, rng);
    if let (Some(next), Some(target)) = (step.next, step.target()) {
        peep.direction = step.direction;
        peep.position.z = next.z;
        peep.set_destination(target, 2);
    }

    PathOutcome {
        flags: step.flags | PathingFlags::DESTINATION_REACHED,
        interaction: step.interaction,
        next: step.next,
    }
}

/// Whether the peep still stands on a path; otherwise it starts falling
pub fn check_for_path<M: WorldMap + ?Sized>(peep: &mut Peep, map: &M) -> bool {
    if peep.next.on_surface {
        return true;
    }
    if map.path_at(peep.next.loc).is_some() {
        return true;
    }
    peep.set_state(PeepState::Falling);
    false
}

/// Turn back to the middle of the current tile
pub fn return_to_centre_of_tile(peep: &mut Peep) {
    peep.direction = (peep.direction + 2) & 3;
    let centre = peep.next.loc.xy().to_tile_centre();
    peep.set_destination(centre, 5);
}

/// Land on whatever is under the peep and resume the default state
pub fn update_falling<M: WorldMap + ?Sized>(peep: &mut Peep, is_staff: bool, map: &M) -> Fate {
    let here = peep.position.xy();
    let on_path = map
        .path_at(here.to_tile_start().with_z(peep.position.z))
        .is_some();
    if !on_path {
        match map.surface_height(here) {
            Some(z) => peep.position.z = z,
            None => return Fate::Remove,
        }
    }

    refresh_current_tile(peep, map);
    peep.action = PeepAction::Walking;
    peep.set_destination(here, 10);
    peep.set_state(if is_staff {
        PeepState::Patrolling
    } else {
        PeepState::Walking
    });
    Fate::Alive
}
