//! Sitting on benches, watching rides and using bins

use crate::entity::agent::{
    ActionKind, Peep, PeepState, SittingSubState, UsingBinSubState, WatchingSubState,
};
use crate::entity::guest::GuestData;
use crate::entity::items::ShopItem;
use crate::park::map::AdditionKind;
use crate::simulation::context::TickContext;
use crate::simulation::guest::walking::{drop_litter, BENCH_USE_OFFSETS};
use crate::simulation::movement::{check_for_path, update_action, ActionStep};

/// Rest a guest with `energy` wants before moving on
fn rest_wanted(energy: u8) -> i32 {
    (129 - energy as i32) * 16 + 50
}

/// Bench time, clamped to the byte counter
pub fn sit_time(energy: u8) -> u8 {
    rest_wanted(energy).clamp(0, 255) as u8
}

/// Standing time is half the resting time
pub fn watch_time(energy: u8) -> u8 {
    (rest_wanted(energy) / 2).clamp(0, 255) as u8
}

fn stand_up(peep: &mut Peep) {
    let centre = peep.position.xy().to_tile_centre();
    peep.set_destination(centre, 5);
    peep.set_state(PeepState::Walking);
}

pub fn update_sitting(
    peep: &mut Peep,
    guest: &mut GuestData,
    sub: SittingSubState,
    seat: u8,
    time_left: u8,
    ctx: &mut TickContext,
) {
    match sub {
        SittingSubState::TryingToSit => {
            if !check_for_path(peep, &*ctx.park) {
                return;
            }
            if update_action(peep) != ActionStep::Arrived {
                return;
            }
            let spot = peep.position.xy().to_tile_start() + BENCH_USE_OFFSETS[seat as usize & 7];
            peep.position.x = spot.x;
            peep.position.y = spot.y;
            peep.set_destination(spot, 0);
            peep.direction = (seat + 2) & 3;
            peep.set_state(PeepState::Sitting {
                sub: SittingSubState::SatDown,
                seat,
                time_left: sit_time(peep.energy),
            });
        }
        SittingSubState::SatDown | SittingSubState::TryGetUp => {
            if !peep.is_action_walking() {
                update_action(peep);
                if !peep.is_action_walking() {
                    return;
                }
                try_get_up(peep, guest, seat, time_left);
                return;
            }

            if guest.is_leaving() {
                stand_up(peep);
                return;
            }

            if guest.items.has_food_or_drink() {
                if ctx.rand16() > 1310 {
                    try_get_up(peep, guest, seat, time_left);
                    return;
                }
                peep.start_action(ActionKind::SittingEatFood);
                return;
            }

            let roll = ctx.rand();
            if roll & 0xFFFF > 131 {
                try_get_up(peep, guest, seat, time_left);
                return;
            }
            if guest.items.has(ShopItem::Balloon) || guest.items.has(ShopItem::Hat) {
                try_get_up(peep, guest, seat, time_left);
                return;
            }
            let look = if roll & 0x4000_0000 != 0 {
                ActionKind::CheckTime
            } else if roll & 0x8000_0000 != 0 {
                ActionKind::SittingLookAroundRight
            } else {
                ActionKind::SittingLookAroundLeft
            };
            peep.start_action(look);
        }
    }
}

/// Count down the rest; stand up once it runs out
fn try_get_up(peep: &mut Peep, guest: &GuestData, seat: u8, time_left: u8) {
    if guest.items.has_food_or_drink() {
        return;
    }
    let time_left = time_left.saturating_sub(1);
    if time_left == 0 {
        stand_up(peep);
        return;
    }
    peep.set_state(PeepState::Sitting {
        sub: SittingSubState::TryGetUp,
        seat,
        time_left,
    });
}

pub fn update_watching(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    let PeepState::Watching {
        ride,
        sub,
        spot,
        time_left,
        tick_toggle,
        new_ride,
    } = peep.state
    else {
        return;
    };

    match sub {
        WatchingSubState::Approach => {
            if !check_for_path(peep, &*ctx.park) {
                return;
            }
            if update_action(peep) != ActionStep::Arrived {
                return;
            }
            let here = peep.position.xy();
            peep.set_destination(here, 0);
            peep.direction = spot & 3;
            peep.set_state(PeepState::Watching {
                ride,
                sub: WatchingSubState::Watching,
                spot,
                time_left: watch_time(peep.energy),
                tick_toggle,
                new_ride,
            });
        }
        WatchingSubState::Watching => {
            if !peep.is_action_walking() {
                update_action(peep);
                if !peep.is_action_walking() {
                    return;
                }
            } else {
                if guest.items.has_food_or_drink() && ctx.rand16() <= 1310 {
                    peep.start_action(ActionKind::EatFood);
                    return;
                }
                if ctx.rand16() <= 655 {
                    peep.start_action(ActionKind::TakePhoto);
                    return;
                }
                if new_ride && ctx.rand16() <= 655 {
                    peep.start_action(ActionKind::Wave);
                    return;
                }
            }

            let tick_toggle = !tick_toggle;
            let mut time_left = time_left;
            if tick_toggle {
                time_left = time_left.saturating_sub(1);
                if time_left == 0 {
                    let centre = peep.position.xy().to_tile_centre();
                    peep.set_destination(centre, 5);
                    peep.set_state(PeepState::Walking);
                    return;
                }
            }
            peep.set_state(PeepState::Watching {
                ride,
                sub,
                spot,
                time_left,
                tick_toggle,
                new_ride,
            });
        }
    }
}

pub fn update_using_bin(
    peep: &mut Peep,
    guest: &mut GuestData,
    sub: UsingBinSubState,
    slot: u8,
    ctx: &mut TickContext,
) {
    match sub {
        UsingBinSubState::WalkingToBin => {
            if !check_for_path(peep, &*ctx.park) {
                return;
            }
            if update_action(peep) != ActionStep::Arrived {
                return;
            }
            peep.set_state(PeepState::UsingBin {
                sub: UsingBinSubState::GoingBack,
                slot,
            });
        }
        UsingBinSubState::GoingBack => {
            if !peep.is_action_walking() {
                update_action(peep);
                return;
            }

            let loc = peep.next.loc;
            let bin = ctx.park.path_at(loc).and_then(|path| path.addition);
            let Some(bin) = bin.filter(|bin| bin.is_usable(AdditionKind::Bin)) else {
                peep.set_state(PeepState::Falling);
                return;
            };

            let shift = 2 * (slot as u32 & 3);
            let mut space = (bin.status >> shift) & 3;
            for container in guest.items.empty_containers() {
                if space > 0 {
                    if ctx.rand() & 7 == 0 {
                        space -= 1;
                    }
                } else {
                    drop_litter(peep.position, container.descriptor().litter, ctx);
                }
                guest.items.remove(container);
            }

            let status = (bin.status & !(3 << shift)) | (space << shift);
            ctx.park.set_addition_status(loc, status);
            peep.set_state(PeepState::Falling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sit_time_clamps_for_tired_guests() {
        assert_eq!(sit_time(128), 66);
        assert_eq!(sit_time(120), 194);
        assert_eq!(sit_time(32), 255);
    }

    #[test]
    fn test_watch_time_halves_before_clamping() {
        assert_eq!(watch_time(128), 33);
        assert_eq!(watch_time(32), 255);
    }
}
