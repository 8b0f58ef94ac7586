//! Patrol areas and the way each staff type picks its next tile
//!
//! Staff do not use the guest pathfinder while patrolling. Each time they
//! reach the middle of a tile they choose a neighbouring tile themselves:
//! handymen drift toward litter and long grass, mechanics keep walking
//! straight where they can, security guards and entertainers wander.

use crate::core::types::{
    direction_from_to, direction_reverse, CoordsXY, CoordsXYZ, Direction, TileCoords,
    COORDS_XY_STEP, DIRECTION_DELTAS, NEIGHBOUR_DELTAS,
};
use crate::entity::agent::{ActionKind, Peep, PeepState};
use crate::entity::needs::clamp_u8;
use crate::entity::staff::{StaffData, StaffOrders, StaffType};
use crate::park::map::{WorldMap, GRASS_LENGTH_CLEAR_1};
use crate::simulation::context::TickContext;
use crate::simulation::movement::{
    check_for_path, refresh_current_tile, return_to_centre_of_tile, update_action, ActionStep,
    ALL_DIRECTIONS,
};
use crate::simulation::staff::duties;

/// Litter further away than this is ignored
const MAX_LITTER_DISTANCE: i32 = 3 * COORDS_XY_STEP;

/// Handyman patrol steps before grass is worth looking for
pub const MOWING_TIMEOUT: u8 = 12;

const HANDYMAN_TOLERANCE: u8 = 3;

/// Entertainers perform on this many of 0x10000 tile arrivals
const PERFORM_CHANCE: u32 = 0x4000;

/// Reach of an entertainer's performance
const CHEER_RANGE_XY: i32 = 96;
const CHEER_RANGE_Z: i32 = 48;

fn neighbour(loc: CoordsXY, direction: Direction) -> CoordsXY {
    loc + DIRECTION_DELTAS[direction as usize & 3]
}

/// Whether the staff member may work at `loc`
///
/// Land outside the park never is. Staff without a patrol area cover the
/// whole park.
pub fn is_location_in_patrol<M: WorldMap + ?Sized>(staff: &StaffData, loc: CoordsXY, map: &M) -> bool {
    if !map.is_owned(loc) {
        return false;
    }
    match &staff.patrol {
        Some(area) if !area.is_empty() => area.contains(loc),
        _ => true,
    }
}

/// Whether any of the eight tiles around `loc` lies outside the patrol area
pub fn is_location_on_patrol_edge<M: WorldMap + ?Sized>(
    staff: &StaffData,
    loc: CoordsXY,
    map: &M,
) -> bool {
    NEIGHBOUR_DELTAS
        .iter()
        .any(|delta| !is_location_in_patrol(staff, loc + *delta, map))
}

/// Directions from `loc` that stay inside the patrol area, one bit each
///
/// A tile with no neighbour inside the area allows every direction so a
/// staff member outside their area can walk back into it.
pub fn valid_patrol_directions<M: WorldMap + ?Sized>(staff: &StaffData, loc: CoordsXY, map: &M) -> u8 {
    let directions = (0..4u8)
        .filter(|d| is_location_in_patrol(staff, neighbour(loc, *d), map))
        .fold(0, |acc, d| acc | (1 << d));
    if directions == 0 {
        ALL_DIRECTIONS
    } else {
        directions
    }
}

/// Path edges from `loc` that lead onto another path tile
fn walkable_edges<M: WorldMap + ?Sized>(loc: CoordsXYZ, edges: u8, map: &M) -> u8 {
    (0..4u8)
        .filter(|d| edges & (1 << d) != 0)
        .filter(|d| map.path_at(neighbour(loc.xy(), *d).with_z(loc.z)).is_some())
        .fold(0, |acc, d| acc | (1 << d))
}

/// Path directions a staff member may take inside their patrol area
///
/// On the edge of the area, when every way on leads outside, the boundary
/// may be crossed so the staff member is never walled in.
fn patrol_path_directions<M: WorldMap + ?Sized>(
    staff: &StaffData,
    loc: CoordsXYZ,
    edges: u8,
    valid: u8,
    map: &M,
) -> u8 {
    let inside = edges & valid;
    if inside == 0 && is_location_on_patrol_edge(staff, loc.xy(), map) {
        edges
    } else {
        inside
    }
}

/// Drop the way back unless it is the only way
fn without_reverse(directions: u8, facing: Direction) -> u8 {
    let back = 1 << direction_reverse(facing);
    let ahead = directions & !back;
    if ahead == 0 {
        back
    } else {
        ahead
    }
}

/// Roll directions until one in `directions` comes up
fn random_set_direction(directions: u8, ctx: &mut TickContext) -> Direction {
    debug_assert!(directions & 0xF != 0);
    loop {
        let direction = (ctx.rand() & 3) as Direction;
        if directions & (1 << direction) != 0 {
            return direction;
        }
    }
}

/// First direction in `directions` scanning from a random start
fn scan_from_random(directions: u8, fallback: Direction, ctx: &mut TickContext) -> Direction {
    let mut direction = (ctx.rand() & 3) as Direction;
    for _ in 0..4 {
        if directions & (1 << direction) != 0 {
            return direction;
        }
        direction = (direction + 1) & 3;
    }
    fallback
}

/// Random direction onto open land, handyman style
fn rand_surface_direction(peep: &Peep, valid: u8, ctx: &mut TickContext) -> Direction {
    let here = peep.next.loc.xy();
    let mut direction = (ctx.rand() % 4) as Direction;
    for _ in 0..4 {
        if valid & (1 << direction) != 0 && !ctx.park.surface_blocked(neighbour(here, direction)) {
            return direction;
        }
        direction = (direction + 1) & 3;
    }
    direction
}

/// Try `initial`, then a random side, then the other side
fn surface_direction(peep: &Peep, initial: Direction, ctx: &mut TickContext) -> Direction {
    let here = peep.next.loc.xy();
    let mut direction = initial;
    for attempt in 0..3 {
        match attempt {
            1 => {
                direction = direction.wrapping_add(1);
                if ctx.rand() & 1 != 0 {
                    direction = direction.wrapping_sub(2);
                }
            }
            2 => direction = direction.wrapping_sub(2),
            _ => {}
        }
        direction &= 3;
        if !ctx.park.surface_blocked(neighbour(here, direction)) {
            return direction;
        }
    }
    initial
}

/// Direction toward the closest litter the handyman may clean up
pub fn direction_to_nearest_litter<M: WorldMap + ?Sized>(
    peep: &Peep,
    staff: &StaffData,
    map: &M,
) -> Option<Direction> {
    let here = peep.position;
    let tile = here.tile();
    let reach = MAX_LITTER_DISTANCE / COORDS_XY_STEP;

    let mut nearest = None;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            for litter in map.litter_on_tile(TileCoords::new(tile.x + dx, tile.y + dy)) {
                let distance = (litter.loc.x - here.x).abs()
                    + (litter.loc.y - here.y).abs()
                    + (litter.loc.z - here.z).abs() * 4;
                if nearest.map_or(true, |(best, _)| distance < best) {
                    nearest = Some((distance, litter.loc.xy()));
                }
            }
        }
    }

    let (distance, loc) = nearest?;
    if distance > MAX_LITTER_DISTANCE {
        return None;
    }
    let litter_tile = loc.to_tile_start();
    if !is_location_in_patrol(staff, litter_tile, map) {
        return None;
    }

    let direction = direction_from_to(here.xy(), litter_tile.to_tile_centre());
    let delta = DIRECTION_DELTAS[direction as usize];
    let approach = CoordsXY::new(litter_tile.x - delta.x, litter_tile.y - delta.y);
    let step = neighbour(here.xy().to_tile_start(), direction);
    let open = |tile: CoordsXY| map.path_at(tile.with_z(here.z)).is_some() || !map.surface_blocked(tile);
    (open(approach) && open(step)).then_some(direction)
}

/// Direction of a neighbouring lawn that needs mowing
fn direction_to_uncut_grass(peep: &Peep, valid: u8, ctx: &mut TickContext) -> Option<Direction> {
    let here = peep.next.loc.xy();
    let mut direction = (ctx.rand() & 3) as Direction;
    for _ in 0..4 {
        if valid & (1 << direction) != 0 {
            let tile = neighbour(here, direction).tile();
            let long = ctx
                .park
                .grass_length(tile)
                .is_some_and(|length| length >= GRASS_LENGTH_CLEAR_1);
            if tile.is_on_map() && long {
                return Some(direction);
            }
        }
        direction = (direction + 1) & 3;
    }
    None
}

fn handyman_direction(
    peep: &Peep,
    staff: &mut StaffData,
    ctx: &mut TickContext,
) -> Option<(Direction, u8)> {
    staff.mowing_timeout = staff.mowing_timeout.saturating_add(1);
    let here = peep.next.loc;
    let valid = valid_patrol_directions(staff, here.xy(), &*ctx.park);

    let sweep_window = (ctx.tick + ctx.handle.index() as u64) & 0xFFF > 110;
    let litter = if staff.orders.contains(StaffOrders::SWEEPING) && sweep_window {
        direction_to_nearest_litter(peep, staff, &*ctx.park)
    } else {
        None
    };

    let mut chosen = None;
    if litter.is_none()
        && staff.orders.contains(StaffOrders::MOWING)
        && staff.mowing_timeout >= MOWING_TIMEOUT
    {
        chosen = direction_to_uncut_grass(peep, valid, ctx);
    }

    let direction = match chosen {
        Some(direction) => direction,
        None if peep.next.on_surface => rand_surface_direction(peep, valid, ctx),
        None => {
            let path = ctx.park.path_at(here)?;
            let edges = walkable_edges(here, path.edges, &*ctx.park);
            let directions = patrol_path_directions(staff, here, edges, valid, &*ctx.park);
            if directions == 0 {
                rand_surface_direction(peep, valid, ctx)
            } else {
                match litter.filter(|d| directions & (1 << *d) != 0) {
                    Some(toward_litter) => {
                        // Queues next to a littered path would trap the handyman
                        let keep_random = if path.queue_for.is_some() { 0xE666 } else { 0x1999 };
                        if ctx.rand() & 0xFFFF >= keep_random {
                            toward_litter
                        } else {
                            random_set_direction(directions, ctx)
                        }
                    }
                    None => random_set_direction(without_reverse(directions, peep.direction), ctx),
                }
            }
        }
    };
    Some((direction, HANDYMAN_TOLERANCE))
}

/// Exit of the ride a mechanic is heading to, else its entrance
fn call_target(peep: &Peep, ctx: &TickContext) -> Option<CoordsXY> {
    let visit = match peep.state {
        PeepState::Answering { visit, .. } | PeepState::HeadingToInspection { visit, .. } => visit,
        _ => return None,
    };
    let station = ctx.park.ride(visit.ride)?.station(visit.station)?;
    station.exit.or(station.entrance).map(|loc| loc.xy())
}

fn mechanic_surface_direction(peep: &Peep, ctx: &mut TickContext) -> Direction {
    let mut direction = (ctx.rand() & 3) as Direction;
    if let Some(target) = call_target(peep, ctx) {
        if ctx.rand() & 1 != 0 {
            direction = direction_from_to(peep.position.xy(), target);
        }
    }
    surface_direction(peep, direction, ctx)
}

/// Keep going straight half the time, otherwise any open way
fn mechanic_path_rand(peep: &Peep, directions: u8, ctx: &mut TickContext) -> Direction {
    if ctx.rand() & 1 != 0 && directions & (1 << peep.direction) != 0 {
        return peep.direction;
    }
    scan_from_random(directions, peep.direction, ctx)
}

fn mechanic_direction(peep: &Peep, staff: &StaffData, ctx: &mut TickContext) -> Option<(Direction, u8)> {
    let here = peep.next.loc;
    let direction = if peep.next.on_surface {
        mechanic_surface_direction(peep, ctx)
    } else {
        let path = ctx.park.path_at(here)?;
        let valid = valid_patrol_directions(staff, here.xy(), &*ctx.park);
        let edges = walkable_edges(here, path.edges, &*ctx.park);
        let directions = patrol_path_directions(staff, here, edges, valid, &*ctx.park);
        if directions == 0 {
            mechanic_surface_direction(peep, ctx)
        } else {
            let directions = without_reverse(directions, peep.direction);
            if directions.count_ones() == 1 {
                directions.trailing_zeros() as Direction
            } else {
                mechanic_path_rand(peep, directions, ctx)
            }
        }
    };
    let tolerance = (ctx.rand() & 7) as u8 + 2;
    Some((direction, tolerance))
}

/// Security guards and entertainers
fn wander_direction(peep: &Peep, staff: &StaffData, ctx: &mut TickContext) -> Option<(Direction, u8)> {
    let here = peep.next.loc;
    let direction = if peep.next.on_surface {
        let initial = (ctx.rand() & 3) as Direction;
        surface_direction(peep, initial, ctx)
    } else {
        let path = ctx.park.path_at(here)?;
        let valid = valid_patrol_directions(staff, here.xy(), &*ctx.park);
        let edges = walkable_edges(here, path.edges, &*ctx.park);
        let directions = patrol_path_directions(staff, here, edges, valid, &*ctx.park);
        if directions == 0 {
            let initial = (ctx.rand() & 3) as Direction;
            surface_direction(peep, initial, ctx)
        } else {
            let directions = without_reverse(directions, peep.direction);
            if directions.count_ones() == 1 {
                directions.trailing_zeros() as Direction
            } else {
                scan_from_random(directions, peep.direction, ctx)
            }
        }
    };
    let tolerance = (ctx.rand() & 7) as u8 + 2;
    Some((direction, tolerance))
}

/// Wave or dance for the guests around, cheering them up
fn entertain(peep: &mut Peep, ctx: &mut TickContext) {
    if ctx.rand() & 0xFFFF > PERFORM_CHANCE || !peep.is_action_walking() {
        return;
    }
    let act = if ctx.rand() & 1 != 0 {
        ActionKind::Wave2
    } else {
        ActionKind::Joy
    };
    peep.start_action(act);

    let here = peep.position;
    for (_, agent) in ctx.agents.iter_mut() {
        let there = agent.peep.position;
        if (there.z - here.z).abs() > CHEER_RANGE_Z
            || (there.x - here.x).abs() > CHEER_RANGE_XY
            || (there.y - here.y).abs() > CHEER_RANGE_XY
        {
            continue;
        }
        let state = agent.peep.state;
        let Some(guest) = agent.guest_mut() else {
            continue;
        };
        if state.is_walking() {
            guest.needs.happiness_target = clamp_u8(guest.needs.happiness_target as i32 + 4);
        } else if state.is_queuing() {
            guest.time_in_queue = guest.time_in_queue.saturating_sub(200);
            guest.needs.happiness_target = clamp_u8(guest.needs.happiness_target as i32 + 3);
        }
    }
}

/// Pick the next tile for this staff member, with the arrival tolerance
///
/// `None` when the staff member stands on a tile with nothing to walk on.
pub fn choose_direction(
    peep: &mut Peep,
    staff: &mut StaffData,
    ctx: &mut TickContext,
) -> Option<(Direction, u8)> {
    match staff.staff_type {
        StaffType::Handyman => handyman_direction(peep, staff, ctx),
        StaffType::Mechanic => mechanic_direction(peep, staff, ctx),
        StaffType::Security => wander_direction(peep, staff, ctx),
        StaffType::Entertainer => {
            entertain(peep, ctx);
            wander_direction(peep, staff, ctx)
        }
    }
}

/// Aim for the middle of the neighbouring tile the staff member chose
pub fn step_toward_chosen_tile(peep: &mut Peep, staff: &mut StaffData, ctx: &mut TickContext) {
    let Some((direction, tolerance)) = choose_direction(peep, staff, ctx) else {
        return;
    };
    let target = neighbour(peep.next.loc.xy(), direction);
    if !ctx.park.is_owned(target) {
        return_to_centre_of_tile(peep);
        return;
    }
    peep.direction = direction;
    peep.set_destination(target.to_tile_centre(), tolerance);
}

/// Walk toward the destination; on arrival pick the next tile
///
/// Returns whether the destination was reached this step.
pub fn staff_next_action(peep: &mut Peep, staff: &mut StaffData, ctx: &mut TickContext) -> bool {
    if update_action(peep) != ActionStep::Arrived {
        return false;
    }
    refresh_current_tile(peep, &*ctx.park);
    step_toward_chosen_tile(peep, staff, ctx);
    true
}

/// Walk the patrol; a handyman arriving on a tile looks for work there
pub fn update_patrolling(peep: &mut Peep, staff: &mut StaffData, ctx: &mut TickContext) {
    if !check_for_path(peep, &*ctx.park) {
        return;
    }
    if !staff_next_action(peep, staff, ctx) {
        return;
    }
    if staff.staff_type != StaffType::Handyman {
        return;
    }
    let _ = duties::find_sweeping(peep, staff, ctx)
        || duties::find_grass(peep, staff, ctx)
        || duties::find_bin(peep, staff, ctx)
        || duties::find_watering(peep, staff, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::patrol::PatrolArea;
    use crate::park::map::{Litter, LitterKind};
    use crate::simulation::fixture::Fixture;

    fn handyman() -> StaffData {
        StaffData::new(StaffType::Handyman, None, 0)
    }

    fn peep_at(fx: &Fixture, tile: TileCoords) -> Peep {
        let mut peep = fx.walking_peep(tile);
        peep.set_state(PeepState::Patrolling);
        peep
    }

    #[test]
    fn test_unrestricted_staff_cover_owned_land_only() {
        let fx = Fixture::new();
        let staff = handyman();
        assert!(is_location_in_patrol(&staff, TileCoords::new(5, 5).centre(), &fx.park));
        assert!(!is_location_in_patrol(&staff, TileCoords::new(25, 5).centre(), &fx.park));
    }

    #[test]
    fn test_valid_patrol_directions_follow_area() {
        let fx = Fixture::new();
        let mut staff = handyman();
        let mut area = PatrolArea::new();
        // Quad covering tiles 4..8 x 4..8
        area.set_tile(TileCoords::new(4, 4), true);
        staff.patrol = Some(area);

        // From (4, 5) west leaves the quad, the rest stay inside
        let loc = TileCoords::new(4, 5).to_coords();
        assert_eq!(valid_patrol_directions(&staff, loc, &fx.park), 0b1110);
        assert!(is_location_on_patrol_edge(&staff, loc, &fx.park));

        // Far away from the area every direction is allowed
        let far = TileCoords::new(15, 15).to_coords();
        assert_eq!(valid_patrol_directions(&staff, far, &fx.park), ALL_DIRECTIONS);
    }

    #[test]
    fn test_interior_tile_is_not_patrol_edge() {
        let fx = Fixture::new();
        let mut staff = handyman();
        let mut area = PatrolArea::new();
        area.set_rect(TileCoords::new(0, 0), TileCoords::new(11, 11), true);
        staff.patrol = Some(area);
        let loc = TileCoords::new(6, 6).to_coords();
        assert!(!is_location_on_patrol_edge(&staff, loc, &fx.park));
    }

    fn staff_with_quad() -> StaffData {
        let mut staff = handyman();
        let mut area = PatrolArea::new();
        // Quad covering tiles 4..8 x 4..8
        area.set_tile(TileCoords::new(4, 4), true);
        staff.patrol = Some(area);
        staff
    }

    #[test]
    fn test_patrol_paths_stay_inside_when_they_can() {
        let fx = Fixture::new();
        let staff = staff_with_quad();
        let loc = TileCoords::new(7, 5).to_coords();
        let valid = valid_patrol_directions(&staff, loc, &fx.park);
        // East leads out of the quad
        assert_eq!(valid, 0b1011);

        // Paths west and east: only west stays inside
        let directions = patrol_path_directions(&staff, loc.with_z(0), 0b0101, valid, &fx.park);
        assert_eq!(directions, 0b0001);
    }

    #[test]
    fn test_patrol_edge_may_be_crossed_when_walled_in() {
        let fx = Fixture::new();
        let staff = staff_with_quad();
        let loc = TileCoords::new(7, 5).to_coords();
        let valid = valid_patrol_directions(&staff, loc, &fx.park);
        assert!(is_location_on_patrol_edge(&staff, loc, &fx.park));

        // The only path leads east, out of the area
        let directions = patrol_path_directions(&staff, loc.with_z(0), 0b0100, valid, &fx.park);
        assert_eq!(directions, 0b0100);

        // No paths at all stays empty
        assert_eq!(patrol_path_directions(&staff, loc.with_z(0), 0, valid, &fx.park), 0);
    }

    #[test]
    fn test_without_reverse_keeps_dead_end() {
        // Facing east (2): the way back is west (0)
        assert_eq!(without_reverse(0b0101, 2), 0b0100);
        assert_eq!(without_reverse(0b0001, 2), 0b0001);
    }

    #[test]
    fn test_litter_direction_points_at_nearby_litter() {
        let mut fx = Fixture::new();
        fx.park.place_litter(Litter {
            loc: TileCoords::new(7, 4).centre().with_z(0),
            direction: 0,
            kind: LitterKind::Rubbish,
        });
        let peep = peep_at(&fx, TileCoords::new(5, 4));
        let staff = handyman();
        assert_eq!(direction_to_nearest_litter(&peep, &staff, &fx.park), Some(2));

        let far = peep_at(&fx, TileCoords::new(1, 4));
        assert_eq!(direction_to_nearest_litter(&far, &staff, &fx.park), None);
    }

    #[test]
    fn test_patrolling_handyman_stays_on_the_path() {
        let mut fx = Fixture::new();
        let mut staff = handyman();
        let mut peep = peep_at(&fx, TileCoords::new(6, 4));
        for _ in 0..400 {
            let mut ctx = fx.ctx();
            staff_next_action(&mut peep, &mut staff, &mut ctx);
            assert_eq!(peep.position.tile().y, 4);
        }
    }
}
