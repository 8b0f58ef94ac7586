//! Choosing rides and facilities to visit
//!
//! [`should_go_on_ride`] is asked both while a guest is merely thinking
//! about a ride and when they stand at its queue. Only the second case
//! produces thoughts, popularity votes and the "just refused this" memory.

use crate::core::types::{RideId, RideRating, StationIndex, COORDS_XY_STEP};
use crate::entity::agent::{ActionKind, Peep, PeepState};
use crate::entity::guest::{GuestData, GuestFlags};
use crate::entity::items::ShopItem;
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::rides::{rating, RideClass, RideFlags, RideInfo};
use crate::simulation::context::TickContext;

/// Rides this close are noticed without a map
pub const RIDE_SEARCH_RADIUS: i32 = 10 * COORDS_XY_STEP;

/// Tall rides are seen from anywhere in the park
const VISIBLE_DROP_HEIGHT: u8 = 66;
const VISIBLE_EXCITEMENT: RideRating = rating(8, 0);

/// Ceiling on the preferred intensity before happiness widens it
pub const MAX_PREFERRED_INTENSITY: RideRating = rating(10, 0);

/// Highest nausea rating each tolerance accepts, before happiness
pub const NAUSEA_MAX_THRESHOLDS: [i32; 4] = [300, 600, 800, 1000];

/// Nausea rating above which a queasy guest only wants gentle rides
const QUEASY_RIDE_NAUSEA: RideRating = rating(1, 40);

/// Chance out of 65536 an unrated g-force ride gets a look
const UNRATED_RIDE_CHANCE: u32 = 0x1999;

/// What a guest is looking for when they head for the nearest facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    FoodStall,
    DrinkStall,
    Toilets,
    FirstAid,
    CashMachine,
}

impl Facility {
    pub fn matches(self, ride: &RideInfo) -> bool {
        match self {
            Facility::FoodStall => sells(ride, ShopItem::is_food),
            Facility::DrinkStall => sells(ride, ShopItem::is_drink),
            Facility::Toilets => ride.class == RideClass::Toilets,
            Facility::FirstAid => ride.class == RideClass::FirstAid,
            Facility::CashMachine => ride.class == RideClass::CashMachine,
        }
    }
}

fn sells(ride: &RideInfo, test: fn(ShopItem) -> bool) -> bool {
    ride.class == RideClass::Shop && ride.items.iter().flatten().any(|item| test(*item))
}

/// Forget the ride the guest was walking to
pub fn reset_ride_heading(guest: &mut GuestData) {
    guest.heading_to_ride = None;
}

/// Remember a refusal so the guest does not retry the same ride at once
pub fn chose_not_to_go_on_ride(guest: &mut GuestData, ride: RideId, at_ride: bool, update_last: bool) {
    if at_ride && update_last {
        guest.previous_ride = Some(ride);
        guest.previous_ride_timeout = 0;
    }
    if guest.heading_to_ride == Some(ride) {
        reset_ride_heading(guest);
    }
}

/// Refusal with a thought, a happiness penalty and a popularity vote
///
/// Only a guest standing at the ride reacts; the memory of refusing is
/// kept either way.
fn disappointed(
    guest: &mut GuestData,
    ride: RideId,
    thought: ThoughtType,
    at_ride: bool,
    ctx: &mut TickContext,
) {
    let (floor, penalty) = match thought {
        ThoughtType::BadValue | ThoughtType::NotPaying => (60, 16),
        _ => (64, 8),
    };
    if at_ride {
        guest.thoughts.insert(thought, ThoughtSubject::Ride(ride));
        if guest.needs.happiness_target >= floor {
            guest.needs.happiness_target -= penalty;
        }
        ctx.park.update_popularity(ride, false);
    }
    chose_not_to_go_on_ride(guest, ride, at_ride, true);
}

fn cannot_afford(guest: &mut GuestData, ride: RideId, at_ride: bool) {
    if at_ride {
        if guest.cash_in_pocket <= 0 {
            guest
                .thoughts
                .insert(ThoughtType::SpentMoney, ThoughtSubject::None);
        } else {
            guest
                .thoughts
                .insert(ThoughtType::CantAffordRide, ThoughtSubject::Ride(ride));
        }
    }
    chose_not_to_go_on_ride(guest, ride, at_ride, true);
}

fn tried_full_queue(guest: &mut GuestData, ride: RideId, ctx: &mut TickContext) {
    ctx.park.set_queue_full(ride, true);
    guest.previous_ride = Some(ride);
    guest.previous_ride_timeout = 0;
    if guest.heading_to_ride == Some(ride) {
        reset_ride_heading(guest);
    }
}

/// Free transport rides skip every preference check
fn is_free_transport(ride: &RideInfo) -> bool {
    ride.flags.contains(RideFlags::TRANSPORT) && ride.value.is_some() && ride.ride_price() == 0
}

fn should_ride_while_raining(guest: &GuestData, ride: &RideInfo, ctx: &mut TickContext) -> bool {
    if ride.sheltered_eighths >= 3 {
        return true;
    }
    guest.items.has(ShopItem::Umbrella)
        && ride.flags.contains(RideFlags::UMBRELLA_OK)
        && ctx.rand() & 2 == 0
}

/// Decide whether the guest wants to ride `ride`
///
/// `at_queue` is set when the guest is at a queue entrance rather than a
/// queueless entrance; `thinking` when they are only considering it.
pub fn should_go_on_ride(
    guest: &mut GuestData,
    ride: &RideInfo,
    station: StationIndex,
    at_queue: bool,
    thinking: bool,
    ctx: &mut TickContext,
) -> bool {
    let at_ride = !thinking;
    let id = ride.id;

    if !ride.is_open() || ride.flags.contains(RideFlags::BROKEN_DOWN) {
        chose_not_to_go_on_ride(guest, id, at_ride, false);
        return false;
    }

    let free_transport = is_free_transport(ride);
    if !free_transport && guest.is_leaving() {
        chose_not_to_go_on_ride(guest, id, at_ride, false);
        return false;
    }

    if !ride.class.is_ride() {
        return should_go_to_shop(guest, ride, at_ride, ctx);
    }

    if at_ride {
        let queue_length = ride.station(station).map_or(0, |s| s.queue_length);
        let full = if at_queue {
            queue_length >= ctx.config.max_queue_length
        } else {
            queue_length > 0
        };
        if full {
            tried_full_queue(guest, id, ctx);
            return false;
        }
    }

    if !free_transport {
        if guest.previous_ride == Some(id) {
            chose_not_to_go_on_ride(guest, id, at_ride, false);
            return false;
        }

        let price = ride.ride_price();
        let voucher = guest.has_ride_voucher(id);
        if price != 0 && !voucher && !ctx.no_money() && price > guest.cash_in_pocket {
            cannot_afford(guest, id, at_ride);
            return false;
        }

        if ride.flags.contains(RideFlags::CRASHED) && guest.needs.happiness < 225 {
            disappointed(guest, id, ThoughtType::NotSafe, at_ride, ctx);
            return false;
        }

        if let Some(ratings) = ride.ratings {
            if guest.heading_to_ride == Some(id) && ratings.intensity > MAX_PREFERRED_INTENSITY {
                disappointed(guest, id, ThoughtType::Intense, at_ride, ctx);
                return false;
            }

            if ctx.raining() && !should_ride_while_raining(guest, ride, ctx) {
                disappointed(guest, id, ThoughtType::NotWhileRaining, at_ride, ctx);
                return false;
            }

            let happiness = guest.needs.happiness as i32;
            let intensity = ratings.intensity as i32;
            let max_intensity =
                (guest.intensity.max as i32 * 100).min(MAX_PREFERRED_INTENSITY as i32) + happiness;
            let min_intensity = guest.intensity.min as i32 * 100 - happiness;
            if intensity < min_intensity {
                disappointed(guest, id, ThoughtType::MoreThrilling, at_ride, ctx);
                return false;
            }
            if intensity > max_intensity {
                disappointed(guest, id, ThoughtType::Intense, at_ride, ctx);
                return false;
            }

            let max_nausea = NAUSEA_MAX_THRESHOLDS[guest.nausea_tolerance.index()] + happiness;
            if ratings.nausea as i32 > max_nausea {
                disappointed(guest, id, ThoughtType::Sickening, at_ride, ctx);
                return false;
            }

            if ratings.nausea >= QUEASY_RIDE_NAUSEA && guest.needs.nausea > 160 {
                chose_not_to_go_on_ride(guest, id, at_ride, false);
                return false;
            }
        } else if ride.flags.contains(RideFlags::CHECK_G_FORCES) {
            if ctx.rand16() > UNRATED_RIDE_CHANCE {
                chose_not_to_go_on_ride(guest, id, at_ride, false);
                return false;
            }
            if ride.flags.contains(RideFlags::G_FORCES_TOO_HIGH) {
                chose_not_to_go_on_ride(guest, id, at_ride, false);
                return false;
            }
        }

        if let Some(mut value) = ride.value {
            if !voucher && !ctx.no_money() {
                let paid_entry = guest.flags.contains(GuestFlags::HAS_PAID_FOR_PARK_ENTRY);
                if paid_entry {
                    value /= 4;
                }

                if price > value * 2 {
                    disappointed(guest, id, ThoughtType::BadValue, at_ride, ctx);
                    return false;
                }

                if price <= value / 2 && at_ride && !paid_entry {
                    guest
                        .thoughts
                        .insert(ThoughtType::GoodValue, ThoughtSubject::Ride(id));
                }
            }
        }
    }

    if at_ride {
        ctx.park.update_popularity(id, true);
    }
    if guest.heading_to_ride == Some(id) {
        reset_ride_heading(guest);
    }
    if ride.flags.contains(RideFlags::QUEUE_FULL) {
        ctx.park.set_queue_full(id, false);
    }
    true
}

/// Decide whether to use a stall or facility
pub fn should_go_to_shop(
    guest: &mut GuestData,
    ride: &RideInfo,
    at_shop: bool,
    ctx: &mut TickContext,
) -> bool {
    let id = ride.id;
    if guest.previous_ride == Some(id) {
        chose_not_to_go_on_ride(guest, id, at_shop, true);
        return false;
    }

    let price = ride.ride_price();
    match ride.class {
        RideClass::Toilets => {
            if guest.needs.toilet < 70 {
                chose_not_to_go_on_ride(guest, id, at_shop, true);
                return false;
            }
            // Willingness to pay scales with how badly they need to go
            if price * 40 > guest.needs.toilet as i32 {
                disappointed(guest, id, ThoughtType::NotPaying, at_shop, ctx);
                return false;
            }
        }
        RideClass::FirstAid => {
            if guest.needs.nausea < 128 {
                chose_not_to_go_on_ride(guest, id, at_shop, true);
                return false;
            }
        }
        _ => {}
    }

    if price != 0 && price > guest.cash_in_pocket {
        cannot_afford(guest, id, at_shop);
        return false;
    }

    if at_shop {
        ctx.park.update_popularity(id, true);
        if guest.heading_to_ride == Some(id) {
            reset_ride_heading(guest);
        }
    }
    true
}

/// Rides the guest is aware of, in id order
fn rides_in_view(peep: &Peep, guest: &GuestData, ctx: &TickContext) -> Vec<RideId> {
    let here = peep.position.xy().to_tile_start();
    ctx.park
        .ride_ids()
        .into_iter()
        .filter(|id| {
            let Some(ride) = ctx.park.ride(*id) else {
                return false;
            };
            if guest.items.has(ShopItem::Map) {
                return !guest.has_ridden(*id);
            }
            let nearby = ride
                .location()
                .is_some_and(|loc| loc.chebyshev(here) <= RIDE_SEARCH_RADIUS);
            let visible = ride.highest_drop_height > VISIBLE_DROP_HEIGHT
                || ride
                    .ratings
                    .is_some_and(|r| r.excitement >= VISIBLE_EXCITEMENT);
            nearby || visible
        })
        .collect()
}

/// Most exciting acceptable ride; the lowest id wins a tie
pub fn find_best_ride_to_go_on(
    peep: &Peep,
    guest: &mut GuestData,
    ctx: &mut TickContext,
) -> Option<RideId> {
    let mut best: Option<(RideId, RideRating)> = None;
    for id in rides_in_view(peep, guest, ctx) {
        let Some(ride) = ctx.park.ride(id).cloned() else {
            continue;
        };
        if ride.flags.contains(RideFlags::QUEUE_FULL) {
            continue;
        }
        if !should_go_on_ride(guest, &ride, StationIndex(0), false, true, ctx) {
            continue;
        }
        let Some(ratings) = ride.ratings else {
            continue;
        };
        if best.map_or(true, |(_, excitement)| ratings.excitement > excitement) {
            best = Some((id, ratings.excitement));
        }
    }
    best.map(|(id, _)| id)
}

/// Pick something exciting to ride and start heading for it
pub fn pick_ride_to_go_on(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if peep.state != PeepState::Walking
        || guest.heading_to_ride.is_some()
        || guest.is_leaving()
        || guest.items.has_food_or_drink()
    {
        return;
    }

    if let Some(ride) = find_best_ride_to_go_on(peep, guest, ctx) {
        guest.heading_to_ride = Some(ride);
        guest.lost_countdown = 200;
        tracing::trace!("Guest {:?} heading for {:?}", ctx.handle, ride);
        if guest.items.has(ShopItem::Map) && peep.is_action_walking() {
            peep.start_action(ActionKind::ReadMap);
        }
    }
}

/// Head for the closest facility of a kind
///
/// With a map the whole park is searched unless `only_close` is set.
pub fn head_for_nearest_facility(
    peep: &Peep,
    guest: &mut GuestData,
    facility: Facility,
    only_close: bool,
    ctx: &mut TickContext,
) {
    if !matches!(
        peep.state,
        PeepState::Sitting { .. } | PeepState::Watching { .. } | PeepState::Walking
    ) || guest.is_leaving()
    {
        return;
    }
    if facility == Facility::Toilets && guest.items.has_food_or_drink() {
        return;
    }
    if let Some(current) = guest.heading_to_ride.and_then(|id| ctx.park.ride(id)) {
        if facility.matches(current) {
            return;
        }
    }

    let here = peep.position.xy();
    let tile = here.to_tile_start();
    let whole_park = !only_close && guest.items.has(ShopItem::Map);
    let mut closest: Option<(RideId, i32)> = None;
    for id in ctx.park.ride_ids() {
        let Some(ride) = ctx.park.ride(id).cloned() else {
            continue;
        };
        if !facility.matches(&ride) || ride.flags.contains(RideFlags::QUEUE_FULL) {
            continue;
        }
        let Some(loc) = ride.location() else {
            continue;
        };
        if !whole_park && loc.chebyshev(tile) > RIDE_SEARCH_RADIUS {
            continue;
        }
        if !should_go_on_ride(guest, &ride, StationIndex(0), false, true, ctx) {
            continue;
        }
        let distance = loc.manhattan(here);
        if closest.map_or(true, |(_, best)| distance < best) {
            closest = Some((id, distance));
        }
    }

    if let Some((ride, _)) = closest {
        guest.heading_to_ride = Some(ride);
        guest.lost_countdown = 200;
        guest.time_lost = 0;
    }
}

/// Drop the craving a visit to `ride` has satisfied
pub fn stop_purchase_thought(guest: &mut GuestData, ride: &RideInfo) {
    let thought = if Facility::FoodStall.matches(ride) {
        ThoughtType::Hungry
    } else if Facility::DrinkStall.matches(ride) {
        ThoughtType::Thirsty
    } else if ride.class == RideClass::CashMachine {
        ThoughtType::RunningOut
    } else if ride.class == RideClass::Toilets {
        ThoughtType::Toilet
    } else {
        return;
    };
    guest.thoughts.remove_kind(thought);
}
