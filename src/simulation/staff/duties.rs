//! Handyman duties: sweeping, mowing, watering and emptying bins
//!
//! A patrolling handyman looks for work each time they reach a tile centre.
//! The `find_*` checks run in order and the first that matches switches the
//! handyman into the matching state.

use crate::core::types::{CoordsXY, NEIGHBOUR_DELTAS};
use crate::entity::agent::{ActionKind, DutySubState, Peep, PeepState};
use crate::entity::staff::{StaffData, StaffOrders};
use crate::park::map::{
    AdditionKind, GRASS_LENGTH_CLEAR_1, SCENERY_WITHER_AGE_THRESHOLD_1,
    SCENERY_WITHER_AGE_THRESHOLD_2,
};
use crate::simulation::context::TickContext;
use crate::simulation::guest::walking::BIN_USE_OFFSETS;
use crate::simulation::movement::{check_for_path, update_action, ActionStep};
use crate::simulation::staff::patrol::MOWING_TIMEOUT;

/// Path the mower follows across a lawn tile, relative to its corner
pub const MOWING_WAYPOINTS: [CoordsXY; 8] = [
    CoordsXY::new(28, 28),
    CoordsXY::new(28, 4),
    CoordsXY::new(20, 4),
    CoordsXY::new(20, 28),
    CoordsXY::new(12, 28),
    CoordsXY::new(12, 4),
    CoordsXY::new(4, 4),
    CoordsXY::new(4, 28),
];

/// Where to stand to water scenery on each of the eight neighbours
pub const WATERING_USE_OFFSETS: [CoordsXY; 8] = [
    CoordsXY::new(3, 16),
    CoordsXY::new(16, 29),
    CoordsXY::new(29, 16),
    CoordsXY::new(16, 3),
    CoordsXY::new(3, 29),
    CoordsXY::new(29, 29),
    CoordsXY::new(29, 3),
    CoordsXY::new(3, 3),
];

/// Litter within this height of the handyman can be swept
const SWEEP_REACH_Z: i32 = 16;

const SWEEP_FRAME: u8 = 8;
const EMPTY_BIN_FRAME: u8 = 11;

pub fn find_sweeping(peep: &mut Peep, staff: &StaffData, ctx: &mut TickContext) -> bool {
    if !staff.orders.contains(StaffOrders::SWEEPING) {
        return false;
    }
    let here = peep.position;
    let litter = ctx
        .park
        .litter_on_tile(here.tile())
        .into_iter()
        .find(|l| (l.loc.z - here.z).abs() < SWEEP_REACH_Z);
    let Some(litter) = litter else {
        return false;
    };
    peep.set_state(PeepState::Sweeping { passes: 0 });
    peep.set_destination(litter.loc.xy(), 5);
    true
}

pub fn find_grass(peep: &mut Peep, staff: &StaffData, ctx: &mut TickContext) -> bool {
    if !staff.orders.contains(StaffOrders::MOWING) || staff.mowing_timeout < MOWING_TIMEOUT {
        return false;
    }
    if !peep.next.on_surface {
        return false;
    }
    let long = ctx
        .park
        .grass_length(peep.next.loc.tile())
        .is_some_and(|length| length >= GRASS_LENGTH_CLEAR_1);
    if !long {
        return false;
    }
    peep.set_state(PeepState::Mowing { waypoint: 0 });
    peep.set_destination(MOWING_WAYPOINTS[0] + peep.next.loc.xy(), 3);
    true
}

/// First corner of the path tile with a full bin and no path edge
fn full_bin_slot(edges: u8, status: u8) -> Option<u8> {
    (0..4u8).find(|slot| edges & (1 << slot) == 0 && (status >> (slot * 2)) & 3 == 0)
}

pub fn find_bin(peep: &mut Peep, staff: &StaffData, ctx: &mut TickContext) -> bool {
    if !staff.orders.contains(StaffOrders::EMPTY_BINS) || peep.next.on_surface {
        return false;
    }
    let Some(path) = ctx.park.path_at(peep.next.loc) else {
        return false;
    };
    let Some(addition) = path.addition.filter(|a| a.is_usable(AdditionKind::Bin)) else {
        return false;
    };
    let Some(slot) = full_bin_slot(path.edges, addition.status) else {
        return false;
    };
    peep.set_state(PeepState::EmptyingBin {
        sub: DutySubState::Approach,
        slot,
    });
    let corner = peep.position.xy().to_tile_start();
    peep.set_destination(BIN_USE_OFFSETS[slot as usize] + corner, 3);
    true
}

pub fn find_watering(peep: &mut Peep, staff: &StaffData, ctx: &mut TickContext) -> bool {
    if !staff.orders.contains(StaffOrders::WATER_FLOWERS) {
        return false;
    }
    let here = peep.next.loc;
    let start = (ctx.rand() & 7) as usize;
    for i in 0..NEIGHBOUR_DELTAS.len() {
        let target = (start + i) & 7;
        let tile = (here.xy() + NEIGHBOUR_DELTAS[target]).tile();
        let Some(age) = ctx.park.scenery_age(tile, here.z) else {
            continue;
        };
        // Diagonal plants are only watered once they are wilting badly
        if age < SCENERY_WITHER_AGE_THRESHOLD_2
            && (target >= 4 || age < SCENERY_WITHER_AGE_THRESHOLD_1)
        {
            continue;
        }
        peep.set_state(PeepState::Watering {
            sub: DutySubState::Approach,
            target: target as u8,
        });
        let corner = peep.position.xy().to_tile_start();
        peep.set_destination(WATERING_USE_OFFSETS[target] + corner, 3);
        return true;
    }
    false
}

pub fn update_mowing(peep: &mut Peep, staff: &mut StaffData, ctx: &mut TickContext) {
    if !check_for_path(peep, &*ctx.park) {
        return;
    }
    loop {
        if update_action(peep) != ActionStep::Arrived {
            return;
        }
        let PeepState::Mowing { waypoint } = peep.state else {
            return;
        };
        let waypoint = waypoint + 1;
        if waypoint as usize == MOWING_WAYPOINTS.len() {
            peep.set_state(PeepState::Falling);
            return;
        }
        peep.set_state(PeepState::Mowing { waypoint });
        let tolerance = peep.destination.tolerance;
        peep.set_destination(
            MOWING_WAYPOINTS[waypoint as usize] + peep.next.loc.xy(),
            tolerance,
        );
        if waypoint as usize == MOWING_WAYPOINTS.len() - 1 {
            ctx.park.mow(peep.next.loc.tile());
            staff.stats.lawns_mown = staff.stats.lawns_mown.saturating_add(1);
        }
    }
}

pub fn update_sweeping(peep: &mut Peep, staff: &mut StaffData, passes: u8, ctx: &mut TickContext) {
    staff.mowing_timeout = 0;
    if !check_for_path(peep, &*ctx.park) {
        return;
    }
    if peep.current_action() == Some(ActionKind::StaffSweep) && peep.action_frame() == Some(SWEEP_FRAME) {
        let swept = ctx.park.remove_litter_at(peep.position);
        if swept > 0 {
            staff.stats.litter_swept = staff.stats.litter_swept.saturating_add(1);
        }
    }
    if update_action(peep) != ActionStep::Arrived {
        return;
    }
    let passes = passes + 1;
    if passes == 2 {
        peep.set_state(PeepState::Falling);
        return;
    }
    peep.set_state(PeepState::Sweeping { passes });
    peep.start_action(ActionKind::StaffSweep);
}

pub fn update_watering(
    peep: &mut Peep,
    staff: &mut StaffData,
    sub: DutySubState,
    target: u8,
    ctx: &mut TickContext,
) {
    staff.mowing_timeout = 0;
    match sub {
        DutySubState::Approach => {
            if !check_for_path(peep, &*ctx.park) {
                return;
            }
            if update_action(peep) != ActionStep::Arrived {
                return;
            }
            peep.direction = target & 3;
            peep.start_action(ActionKind::StaffWatering);
            peep.set_state(PeepState::Watering {
                sub: DutySubState::Working,
                target,
            });
        }
        DutySubState::Working => {
            if !peep.is_action_walking() {
                update_action(peep);
                return;
            }
            let here = peep.next.loc;
            let tile = (here.xy() + NEIGHBOUR_DELTAS[target as usize & 7]).tile();
            let watered = ctx.park.water_scenery(tile, here.z);
            staff.stats.gardens_watered = staff.stats.gardens_watered.saturating_add(watered);
            peep.set_state(PeepState::Falling);
        }
    }
}

pub fn update_emptying_bin(
    peep: &mut Peep,
    staff: &mut StaffData,
    sub: DutySubState,
    slot: u8,
    ctx: &mut TickContext,
) {
    staff.mowing_timeout = 0;
    match sub {
        DutySubState::Approach => {
            if !check_for_path(peep, &*ctx.park) {
                return;
            }
            if update_action(peep) != ActionStep::Arrived {
                return;
            }
            peep.direction = slot & 3;
            peep.start_action(ActionKind::StaffEmptyBin);
            peep.set_state(PeepState::EmptyingBin {
                sub: DutySubState::Working,
                slot,
            });
        }
        DutySubState::Working => {
            if peep.is_action_walking() {
                peep.set_state(PeepState::Falling);
                return;
            }
            update_action(peep);
            if peep.action_frame() != Some(EMPTY_BIN_FRAME) {
                return;
            }
            let loc = peep.next.loc;
            let bin = ctx
                .park
                .path_at(loc)
                .and_then(|path| path.addition)
                .filter(|a| a.is_usable(AdditionKind::Bin));
            let Some(bin) = bin else {
                peep.set_state(PeepState::Falling);
                return;
            };
            ctx.park
                .set_addition_status(loc, bin.status | (3 << (2 * (slot & 3))));
            staff.stats.bins_emptied = staff.stats.bins_emptied.saturating_add(1);
        }
    }
}
