//! Walking the paths: stepping, reacting to the tiles walked onto and
//! deciding to stop at benches, bins or a good view

use crate::core::types::{CoordsXY, CoordsXYZ, Direction, RideId, StationIndex, TileCoords};
use crate::entity::agent::{
    ActionKind, Peep, PeepState, RideVisit, SittingSubState, UsingBinSubState, WatchingSubState,
};
use crate::entity::guest::{GuestData, GuestFlags};
use crate::entity::staff::StaffType;
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::map::{AdditionKind, Litter, LitterKind};
use crate::park::notify::Notification;
use crate::park::pathing::{PathGoal, PathInteraction};
use crate::simulation::context::TickContext;
use crate::simulation::guest::park::walk_into_park_entrance;
use crate::simulation::guest::purchase::interact_with_shop;
use crate::simulation::guest::ride_select::should_go_on_ride;
use crate::simulation::movement::{
    check_for_path, perform_next_action, return_to_centre_of_tile, ALL_DIRECTIONS,
};
use crate::simulation::tick::SimulationEvent;

/// Where a guest stands to use a bin, per edge
pub const BIN_USE_OFFSETS: [CoordsXY; 4] = [
    CoordsXY::new(11, 16),
    CoordsXY::new(16, 21),
    CoordsXY::new(21, 16),
    CoordsXY::new(16, 11),
];

/// Bench seats, indexed by edge plus side
pub const BENCH_USE_OFFSETS: [CoordsXY; 8] = [
    CoordsXY::new(7, 12),
    CoordsXY::new(12, 25),
    CoordsXY::new(25, 20),
    CoordsXY::new(20, 7),
    CoordsXY::new(7, 20),
    CoordsXY::new(20, 25),
    CoordsXY::new(25, 12),
    CoordsXY::new(12, 7),
];

/// Standing spots along a path edge, indexed by edge plus position
pub const WATCHING_OFFSETS: [CoordsXY; 32] = [
    CoordsXY::new(7, 5),
    CoordsXY::new(5, 25),
    CoordsXY::new(25, 5),
    CoordsXY::new(5, 7),
    CoordsXY::new(7, 9),
    CoordsXY::new(9, 25),
    CoordsXY::new(25, 9),
    CoordsXY::new(9, 7),
    CoordsXY::new(7, 23),
    CoordsXY::new(23, 25),
    CoordsXY::new(25, 23),
    CoordsXY::new(23, 7),
    CoordsXY::new(7, 27),
    CoordsXY::new(27, 25),
    CoordsXY::new(25, 27),
    CoordsXY::new(27, 7),
    CoordsXY::new(7, 0),
    CoordsXY::new(0, 25),
    CoordsXY::new(25, 0),
    CoordsXY::new(0, 7),
    CoordsXY::new(7, 0),
    CoordsXY::new(0, 25),
    CoordsXY::new(25, 0),
    CoordsXY::new(0, 7),
    CoordsXY::new(7, 0),
    CoordsXY::new(0, 25),
    CoordsXY::new(25, 0),
    CoordsXY::new(0, 7),
    CoordsXY::new(7, 0),
    CoordsXY::new(0, 25),
    CoordsXY::new(25, 0),
    CoordsXY::new(0, 7),
];

const RANDOM_LITTER: [LitterKind; 4] = [
    LitterKind::EmptyCan,
    LitterKind::Rubbish,
    LitterKind::BurgerBox,
    LitterKind::EmptyCup,
];

/// Chance out of 65536 of an idle wave, photo or sketch per step
const IDLE_ACTION_CHANCE: u32 = 936;

const LITTER_CHANCE: u32 = 4096;

/// Walking agents on one tile before it feels crowded
const CROWD_SIZE: usize = 10;

/// Security guards within this range stop vandals
const SECURITY_RANGE: i32 = 224;

/// Path tile a guest is heading for
pub fn walking_goal(guest: &GuestData) -> PathGoal {
    if guest.is_leaving() {
        PathGoal::ParkExit
    } else if let Some(ride) = guest.heading_to_ride {
        PathGoal::Ride(ride)
    } else {
        PathGoal::Wander
    }
}

/// Drop a piece of litter a few units from `at`
pub fn drop_litter(at: CoordsXYZ, kind: LitterKind, ctx: &mut TickContext) {
    let x = at.x + (ctx.rand() & 7) as i32 - 3;
    let y = at.y + (ctx.rand() & 7) as i32 - 3;
    let direction = (ctx.rand() & 3) as Direction;
    ctx.park.place_litter(Litter {
        loc: CoordsXYZ::new(x, y, at.z),
        direction,
        kind,
    });
}

/// First edge in `edges` at or after `start`, wrapping; `edges` must be set
fn rotate_to_edge(edges: u8, start: u8) -> u8 {
    let mut edge = start & 3;
    while edges & (1 << edge) == 0 {
        edge = (edge + 1) & 3;
    }
    edge
}

/// States of the other agents standing on `tile` at height `z`
fn states_on_tile(ctx: &TickContext, tile: TileCoords, z: i32) -> Vec<PeepState> {
    ctx.agents
        .iter()
        .filter(|(_, agent)| agent.peep.position.tile() == tile && agent.peep.position.z == z)
        .map(|(_, agent)| agent.peep.state)
        .collect()
}

pub fn update_walking(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if !check_for_path(peep, &*ctx.park) {
        return;
    }

    for (flag, action) in [
        (GuestFlags::WAVING, ActionKind::Wave2),
        (GuestFlags::PHOTO, ActionKind::TakePhoto),
        (GuestFlags::PAINTING, ActionKind::DrawPicture),
    ] {
        if guest.flags.contains(flag)
            && peep.is_action_walking()
            && ctx.rand16() < IDLE_ACTION_CHANCE
        {
            peep.start_action(action);
        }
    }

    if guest.flags.contains(GuestFlags::LITTER) {
        if !peep.next.on_surface && ctx.rand16() <= LITTER_CHANCE {
            let kind = RANDOM_LITTER[(ctx.rand() & 3) as usize];
            drop_litter(peep.position, kind, ctx);
        }
    } else if guest.items.has_empty_container()
        && !peep.next.on_surface
        && ctx.handle.index() & 0x1FF == (ctx.tick & 0x1FF) as u32
        && ctx.rand16() <= LITTER_CHANCE
    {
        if let Some(container) = guest.items.empty_containers().first().copied() {
            guest.items.remove(container);
            drop_litter(peep.position, container.descriptor().litter, ctx);
        }
    }

    let outcome = perform_next_action(
        peep,
        walking_goal(guest),
        ALL_DIRECTIONS,
        false,
        ctx.park,
        ctx.rng,
    );
    if !outcome.reached() {
        return;
    }

    if let Some(interaction) = outcome.interaction {
        handle_interaction(peep, guest, interaction, ctx);
        return;
    }

    if let Some(next) = outcome.next {
        observe_footpath(guest, next, ctx);
    }

    if guest.is_leaving() {
        check_if_lost(guest, ctx);
        check_cant_find_exit(guest);
    } else if guest.heading_to_ride.is_some() {
        check_if_lost(guest, ctx);
        check_cant_find_ride(guest);
    }

    if find_bench(peep, guest, ctx) {
        return;
    }
    if find_bin(peep, guest, ctx) {
        return;
    }
    break_scenery(peep, guest, ctx);
    if peep.state != PeepState::Walking {
        return;
    }
    find_something_to_watch(peep, guest, ctx);
}

fn handle_interaction(
    peep: &mut Peep,
    guest: &mut GuestData,
    interaction: PathInteraction,
    ctx: &mut TickContext,
) {
    match interaction {
        PathInteraction::QueueEntrance { ride, station } => {
            if try_join(guest, ride, station, true, ctx) {
                guest.time_in_queue = 0;
                peep.destination.tolerance = 2;
                peep.set_state(PeepState::Queuing(RideVisit::new(ride, station)));
            } else {
                return_to_centre_of_tile(peep);
            }
        }
        PathInteraction::RideEntrance { ride, station } => {
            if try_join(guest, ride, station, false, ctx) {
                peep.set_state(PeepState::QueuingFront(RideVisit::new(ride, station)));
            } else {
                return_to_centre_of_tile(peep);
            }
        }
        PathInteraction::Shop(ride) => interact_with_shop(peep, guest, ride, ctx),
        PathInteraction::ParkEntrance => walk_into_park_entrance(peep, guest, ctx),
        PathInteraction::RideExit { .. } => return_to_centre_of_tile(peep),
    }
}

/// Decide at a queue or entrance, and join the line when keen
fn try_join(
    guest: &mut GuestData,
    ride_id: RideId,
    station: StationIndex,
    at_queue: bool,
    ctx: &mut TickContext,
) -> bool {
    let Some(ride) = ctx.park.ride(ride_id).cloned() else {
        tracing::warn!("Guest {:?} reached missing ride {:?}", ctx.handle, ride_id);
        return false;
    };
    if !should_go_on_ride(guest, &ride, station, at_queue, false, ctx) {
        return false;
    }

    ctx.park.join_queue(ride_id, station, ctx.handle);
    if guest.flags.contains(GuestFlags::TRACKING) {
        ctx.post(Notification::GuestJoinedQueue {
            guest: ctx.handle,
            ride: ride_id,
        });
    }
    ctx.emit(SimulationEvent::JoinedQueue {
        guest: ctx.handle,
        ride: ride_id,
    });
    true
}

/// Shift one step's sighting into a history byte and maybe complain
///
/// The low six bits hold two bits per recent step; the top two bits are a
/// cooldown before the same complaint repeats.
fn update_history(
    history: u8,
    seen: u8,
    thought: ThoughtType,
    guest: &mut GuestData,
    ctx: &mut TickContext,
) -> u8 {
    let cooldown = history & 0xC0;
    let counts = ((history & 0xF) << 2) | seen.min(3);
    let mut history = counts | cooldown;

    if cooldown != 0 && ctx.rand16() <= 4369 {
        history -= 0x40;
    } else {
        let total: u8 = (0..3).map(|step| (counts >> (2 * step)) & 3).sum();
        if total >= 3 && ctx.rand16() <= 10922 {
            guest.thoughts.insert(thought, ThoughtSubject::None);
            guest.needs.adjust_happiness_target(-17);
            history |= 0xC0;
        }
    }
    history
}

/// React to vandalism, crowds, vomit and litter on the tile being entered
fn observe_footpath(guest: &mut GuestData, tile: CoordsXYZ, ctx: &mut TickContext) {
    let vandalised = ctx.park.path_at(tile).is_some_and(|path| {
        path.edges != 0xF && path.addition.is_some_and(|addition| addition.broken)
    });

    let mut timeout = (guest.vandalism_seen & 0xC0) >> 6;
    let mut seen = (guest.vandalism_seen << 1) & 0x3F;
    if vandalised {
        seen |= 1;
        if seen & 0x3E != 0 && timeout == 0 {
            if ctx.rand16() <= 10922 {
                guest
                    .thoughts
                    .insert(ThoughtType::Vandalism, ThoughtSubject::None);
                guest.needs.adjust_happiness_target(-17);
            }
            timeout = 3;
        }
    }
    if timeout != 0 && ctx.rand16() <= 4369 {
        timeout -= 1;
    }
    guest.vandalism_seen = (timeout << 6) | seen;

    let grid = tile.tile();
    let crowd = ctx
        .agents
        .iter()
        .filter(|(_, agent)| {
            agent.peep.state == PeepState::Walking
                && agent.peep.position.tile() == grid
                && (agent.peep.position.z - tile.z).abs() <= 16
        })
        .count();

    let mut litter = 0u8;
    let mut sick = 0u8;
    for item in ctx.park.litter_on_tile(grid) {
        if (item.loc.z - tile.z).abs() > 16 {
            continue;
        }
        if item.kind.is_vomit() {
            sick = sick.saturating_add(1);
        } else {
            litter = litter.saturating_add(1);
        }
    }

    if crowd >= CROWD_SIZE && ctx.rand16() <= 21845 {
        guest.thoughts.insert(ThoughtType::Crowded, ThoughtSubject::None);
        guest.needs.adjust_happiness_target(-14);
    }

    guest.disgusting_count =
        update_history(guest.disgusting_count, sick, ThoughtType::PathDisgusting, guest, ctx);
    guest.litter_count = update_history(guest.litter_count, litter, ThoughtType::BadLitter, guest, ctx);
}

/// Every other step, a guest in a big park may realise they are lost
fn check_if_lost(guest: &mut GuestData, ctx: &mut TickContext) {
    if !guest.flags.contains(GuestFlags::LOST) {
        if ctx.park.ride_ids().len() < 2 {
            return;
        }
        guest.flags.toggle(GuestFlags::LOST_TOGGLE);
        if !guest.flags.contains(GuestFlags::LOST_TOGGLE) {
            return;
        }
        guest.time_lost = guest.time_lost.wrapping_add(1);
        if guest.time_lost != 254 {
            return;
        }
        guest.time_lost = 230;
    }
    guest.thoughts.insert(ThoughtType::Lost, ThoughtSubject::None);
    guest.needs.adjust_happiness_target(-30);
}

/// Complain twice about a ride that cannot be found, then give up on it
fn check_cant_find_ride(guest: &mut GuestData) {
    let Some(ride) = guest.heading_to_ride else {
        return;
    };
    if guest.lost_countdown == 30 || guest.lost_countdown == 60 {
        guest
            .thoughts
            .insert(ThoughtType::CantFind, ThoughtSubject::Ride(ride));
        guest.needs.adjust_happiness_target(-30);
    }
    guest.lost_countdown = guest.lost_countdown.wrapping_sub(1);
    if guest.lost_countdown == 0 {
        guest.heading_to_ride = None;
    }
}

fn check_cant_find_exit(guest: &mut GuestData) {
    if guest.lost_countdown == 1 {
        guest
            .thoughts
            .insert(ThoughtType::CantFindExit, ThoughtSubject::None);
        guest.needs.adjust_happiness_target(-30);
    }
    guest.lost_countdown = guest.lost_countdown.wrapping_sub(1);
    if guest.lost_countdown == 0 {
        guest.lost_countdown = 90;
    }
}

fn should_find_bench(peep: &Peep, guest: &GuestData) -> bool {
    if guest.is_leaving() {
        return false;
    }
    let on_flat_path = !peep.next.on_surface && !peep.next.sloped;
    if guest.items.has_food_or_drink()
        && (guest.needs.hunger < 128 || guest.needs.happiness < 128)
        && on_flat_path
    {
        return true;
    }
    if guest.needs.nausea <= 170 && peep.energy > 50 {
        return false;
    }
    on_flat_path
}

/// Sit down on a free bench seat on this tile
fn find_bench(peep: &mut Peep, guest: &GuestData, ctx: &mut TickContext) -> bool {
    if !should_find_bench(peep, guest) {
        return false;
    }
    let Some(path) = ctx.park.path_at(peep.next.loc) else {
        return false;
    };
    if !path
        .addition
        .is_some_and(|addition| addition.is_usable(AdditionKind::Bench))
    {
        return false;
    }
    let edges = path.edges ^ 0xF;
    if edges == 0 {
        return false;
    }
    let edge = rotate_to_edge(edges, ctx.rand() as u8);

    let mut free = 3u8;
    for state in states_on_tile(ctx, peep.position.tile(), peep.position.z) {
        if let PeepState::Sitting { seat, .. } = state {
            if seat & 3 == edge {
                free &= !(1 << ((seat & 4) >> 2));
            }
        }
    }
    if free == 0 {
        return false;
    }
    free ^= 3;
    if free == 0 && ctx.rand() & 0x0800_0000 != 0 {
        free = 1;
    }

    let seat = ((free & 1) << 2) | edge;
    let spot = peep.position.xy().to_tile_start() + BENCH_USE_OFFSETS[seat as usize & 7];
    peep.set_destination(spot, 3);
    peep.set_state(PeepState::Sitting {
        sub: SittingSubState::TryingToSit,
        seat,
        time_left: 0,
    });
    true
}

/// Head for a bin corner with space to throw empty containers away
fn find_bin(peep: &mut Peep, guest: &GuestData, ctx: &mut TickContext) -> bool {
    if peep.state != PeepState::Walking
        || peep.next.on_surface
        || !guest.items.has_empty_container()
    {
        return false;
    }
    let Some(path) = ctx.park.path_at(peep.next.loc) else {
        return false;
    };
    let Some(bin) = path
        .addition
        .filter(|addition| addition.is_usable(AdditionKind::Bin))
    else {
        return false;
    };
    let edges = path.edges ^ 0xF;
    if edges == 0 {
        return false;
    }

    let mut edge = (ctx.rand() & 3) as u8;
    let mut space = bin.status.rotate_right(2 * edge as u32);
    let mut found = None;
    for _ in 0..4 {
        if space & 3 != 0 && edges & (1 << edge) != 0 {
            found = Some(edge);
            break;
        }
        edge = (edge + 1) & 3;
        space = space.rotate_right(2);
    }
    let Some(slot) = found else {
        return false;
    };

    let spot = peep.position.xy().to_tile_start() + BIN_USE_OFFSETS[slot as usize];
    peep.set_destination(spot, 3);
    peep.set_state(PeepState::UsingBin {
        sub: UsingBinSubState::WalkingToBin,
        slot,
    });
    true
}

/// Unhappy guests who have seen too much mess smash benches, bins and lamps
fn break_scenery(peep: &Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if !guest.flags.contains(GuestFlags::ANGRY) {
        if guest.needs.happiness >= 48 || peep.energy < 85 || peep.state != PeepState::Walking {
            return;
        }
        if guest.litter_count & 0xC0 != 0xC0 && guest.disgusting_count & 0xC0 != 0xC0 {
            return;
        }
        if ctx.rand16() > 3276 {
            return;
        }
    }
    if peep.next.on_surface {
        return;
    }

    let loc = peep.next.loc;
    let Some(path) = ctx.park.path_at(loc) else {
        return;
    };
    let Some(addition) = path.addition else {
        return;
    };
    if !addition.kind.is_breakable() || addition.broken || path.edges == 0xF {
        return;
    }

    let sitting = states_on_tile(ctx, peep.position.tile(), peep.position.z)
        .iter()
        .any(|state| matches!(state, PeepState::Sitting { .. }));
    if sitting {
        return;
    }

    let here = peep.position.xy();
    let guard = ctx.agents.iter().find_map(|(handle, agent)| {
        (agent.is_staff_type(StaffType::Security)
            && agent.peep.position.xy().chebyshev(here) < SECURITY_RANGE)
            .then_some(handle)
    });
    if let Some(guard) = guard {
        if let Some(staff) = ctx.agents.get_mut(guard).and_then(|a| a.staff_mut()) {
            staff.stats.vandals_stopped += 1;
        }
        tracing::debug!("Guard {:?} stopped guest {:?} vandalising", guard, ctx.handle);
        ctx.emit(SimulationEvent::VandalismStopped {
            guest: ctx.handle,
            guard,
        });
        return;
    }

    ctx.park.break_addition(loc);
    guest.angriness = 16;
    ctx.counters.vandalism_incidents += 1;
    tracing::debug!("Guest {:?} vandalised {:?} at {:?}", ctx.handle, addition.kind, loc);
    ctx.emit(SimulationEvent::PathVandalised {
        guest: ctx.handle,
        at: loc,
    });
}

/// Stop at the side of the path to watch a ride or enjoy the scenery
fn find_something_to_watch(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if guest.is_leaving()
        || guest.needs.nausea > 140
        || guest.needs.happiness < 120
        || guest.needs.toilet > 140
    {
        return;
    }
    let chance = if guest.items.has_food_or_drink() {
        13107
    } else {
        2849
    };
    if ctx.rand16() > chance {
        return;
    }
    if peep.next.on_surface || peep.next.sloped {
        return;
    }
    let Some(path) = ctx.park.path_at(peep.next.loc) else {
        return;
    };

    let mut positions_free = 15u8;
    if let Some(addition) = path.addition {
        if addition.kind != AdditionKind::Bench {
            positions_free = 9;
        }
    }

    let edges = path.edges ^ 0xF;
    if edges == 0 {
        return;
    }
    let edge = rotate_to_edge(edges, ctx.rand() as u8);

    let Some(view) = ctx.park.view_from_edge(peep.next.loc, edge) else {
        return;
    };

    for state in states_on_tile(ctx, peep.position.tile(), peep.position.z) {
        if let PeepState::Watching { spot, .. } = state {
            if spot & 3 == edge {
                positions_free &= !(1 << ((spot & 0x1C) >> 2));
            }
        }
    }
    if positions_free == 0 {
        return;
    }
    let position = rotate_to_edge(positions_free, ctx.rand() as u8);

    let spot = edge | (position << 2);
    let target = peep.position.xy().to_tile_start() + WATCHING_OFFSETS[spot as usize & 0x1F];
    peep.set_destination(target, 3);
    peep.set_state(PeepState::Watching {
        ride: view.ride,
        sub: WatchingSubState::Approach,
        spot,
        time_left: 0,
        tick_toggle: false,
        new_ride: view.is_new_ride,
    });

    if let Some(ride) = view.ride {
        if view.is_new_ride {
            guest
                .thoughts
                .insert(ThoughtType::NewRide, ThoughtSubject::Ride(ride));
        }
    } else {
        guest
            .thoughts
            .insert(ThoughtType::Scenery, ThoughtSubject::None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::needs::GuestNeeds;

    #[test]
    fn test_walking_goal() {
        let mut guest = GuestData::new(GuestNeeds::default());
        assert_eq!(walking_goal(&guest), PathGoal::Wander);
        guest.heading_to_ride = Some(RideId(3));
        assert_eq!(walking_goal(&guest), PathGoal::Ride(RideId(3)));
        guest.flags.insert(GuestFlags::LEAVING_PARK);
        assert_eq!(walking_goal(&guest), PathGoal::ParkExit);
    }

    #[test]
    fn test_rotate_to_edge_wraps() {
        assert_eq!(rotate_to_edge(0b0001, 2), 0);
        assert_eq!(rotate_to_edge(0b0100, 2), 2);
        assert_eq!(rotate_to_edge(0b1010, 0), 1);
    }

    #[test]
    fn test_cant_find_ride_gives_up() {
        let mut guest = GuestData::new(GuestNeeds::default());
        guest.heading_to_ride = Some(RideId(1));
        guest.lost_countdown = 61;
        for _ in 0..60 {
            check_cant_find_ride(&mut guest);
        }
        assert_eq!(guest.heading_to_ride, Some(RideId(1)));
        assert!(guest.thoughts.contains(ThoughtType::CantFind));
        check_cant_find_ride(&mut guest);
        assert_eq!(guest.heading_to_ride, None);
        assert_eq!(guest.needs.happiness_target, 128 - 60);
    }

    #[test]
    fn test_cant_find_exit_restarts_countdown() {
        let mut guest = GuestData::new(GuestNeeds::default());
        guest.flags.insert(GuestFlags::LEAVING_PARK);
        guest.lost_countdown = 1;
        check_cant_find_exit(&mut guest);
        assert!(guest.thoughts.contains(ThoughtType::CantFindExit));
        assert_eq!(guest.lost_countdown, 90);
    }

    #[test]
    fn test_bench_wanted_when_tired_or_snacking() {
        let mut peep = Peep::new(CoordsXYZ::new(16, 16, 0), PeepState::Walking);
        let mut guest = GuestData::new(GuestNeeds::default());
        peep.energy = 100;
        assert!(!should_find_bench(&peep, &guest));

        peep.energy = 40;
        assert!(should_find_bench(&peep, &guest));

        peep.energy = 100;
        guest.items.give(crate::entity::items::ShopItem::Burger);
        guest.needs.hunger = 100;
        assert!(should_find_bench(&peep, &guest));

        peep.next.sloped = true;
        assert!(!should_find_bench(&peep, &guest));
    }
}
