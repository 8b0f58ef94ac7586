//! Queuing, boarding, riding and leaving rides and facilities

use crate::core::types::{direction_reverse, RideId, DIRECTION_OFFSETS};
use crate::entity::agent::{ActionKind, Peep, PeepState, RideSubState, RideVisit};
use crate::entity::guest::{GuestData, GuestFlags, SpendCategory};
use crate::entity::needs::clamp_u8;
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::notify::Notification;
use crate::park::pathing::{PathGoal, PathInteraction};
use crate::park::rides::{rating, ExpenditureType, RideClass, RideInfo, RiderStatus};
use crate::simulation::context::TickContext;
use crate::simulation::guest::purchase::{decide_and_buy_item, spend_money};
use crate::simulation::guest::ride_select::{stop_purchase_thought, NAUSEA_MAX_THRESHOLDS};
use crate::simulation::movement::{
    check_for_path, perform_next_action, refresh_current_tile, return_to_centre_of_tile,
    update_action, ActionStep, ALL_DIRECTIONS,
};
use crate::simulation::tick::SimulationEvent;

/// Lowest nausea rating each tolerance enjoys
const NAUSEA_MIN_THRESHOLDS: [i32; 4] = [0, 0, 200, 400];

/// Rides above this intensity never earn a repeat visit or a "was great"
const REPEAT_RIDE_MAX_INTENSITY: i16 = rating(10, 0);

/// Queue ticks before a guest may snack while waiting
const QUEUE_SNACK_TIME: u16 = 2000;
/// Queue ticks before the "queuing for ages" thought
const QUEUE_AGES_TIME: u16 = 3500;

/// Closer than this to the guest ahead and the guest always waits
const QUEUE_CLOSE_GAP: i32 = 7;
/// Further than this and the guest only waits when sharing a tile
const QUEUE_FAR_GAP: i32 = 13;
/// Height difference beyond which the guest ahead is on another level
const QUEUE_LEVEL_GAP: i32 = 10;

fn arrived(peep: &mut Peep) -> bool {
    update_action(peep) == ActionStep::Arrived
}

fn leave_queue(peep: &mut Peep, visit: RideVisit, ctx: &mut TickContext) {
    ctx.park.leave_queue(visit.ride, visit.station, ctx.handle);
    let here = peep.position.xy();
    peep.set_destination(here, 10);
    peep.set_state(PeepState::Walking);
}

/// Whether the guest should hold still behind the one ahead of them
fn update_queue_position(peep: &mut Peep, guest: &mut GuestData, visit: RideVisit, ctx: &mut TickContext) -> bool {
    guest.time_in_queue = guest.time_in_queue.saturating_add(1);

    let Some(ahead) = ctx
        .park
        .guest_ahead(visit.ride, visit.station, ctx.handle)
        .and_then(|handle| ctx.agents.get(handle))
    else {
        return false;
    };
    let ahead = &ahead.peep;
    if (ahead.position.z - peep.position.z).abs() > QUEUE_LEVEL_GAP {
        return false;
    }

    let dx = (ahead.position.x - peep.position.x).abs();
    let dy = (ahead.position.y - peep.position.y).abs();
    let gap = dx.max(dy) + dx.min(dy) / 2;
    if gap > QUEUE_CLOSE_GAP {
        let same_tile = ahead.position.tile() == peep.position.tile();
        if gap > QUEUE_FAR_GAP && !same_tile {
            return false;
        }
        if ahead.direction != peep.direction {
            return false;
        }
        let facing = DIRECTION_OFFSETS[peep.direction as usize & 3];
        let along = (ahead.position.x - peep.position.x) * facing.x
            + (ahead.position.y - peep.position.y) * facing.y;
        if along <= 0 {
            return false;
        }
    }

    if !peep.is_action_walking() {
        update_action(peep);
    }
    true
}

/// A guest in a queue line shuffling toward the ride
pub fn update_queuing(peep: &mut Peep, guest: &mut GuestData, visit: RideVisit, ctx: &mut TickContext) {
    if !check_for_path(peep, &*ctx.park) {
        ctx.park.leave_queue(visit.ride, visit.station, ctx.handle);
        return;
    }

    let open = ctx.park.ride(visit.ride).is_some_and(RideInfo::is_open);
    if !open {
        leave_queue(peep, visit, ctx);
        return;
    }

    if update_queue_position(peep, guest, visit, ctx) {
        return;
    }

    let outcome = perform_next_action(
        peep,
        PathGoal::Ride(visit.ride),
        ALL_DIRECTIONS,
        false,
        ctx.park,
        ctx.rng,
    );
    if let Some(PathInteraction::RideEntrance { ride, .. }) = outcome.interaction {
        if ride == visit.ride && ctx.park.queue_front(visit.ride, visit.station) == Some(ctx.handle) {
            peep.set_state(PeepState::QueuingFront(visit));
        } else {
            return_to_centre_of_tile(peep);
        }
        return;
    }

    if !peep.is_action_walking() {
        return;
    }
    if guest.time_in_queue >= QUEUE_SNACK_TIME && ctx.rand16() <= 119 {
        peep.start_action(ActionKind::EatFood);
    }
    if guest.time_in_queue >= QUEUE_AGES_TIME && ctx.rand16() <= 93 {
        guest
            .thoughts
            .insert(ThoughtType::QueuingAges, ThoughtSubject::Ride(visit.ride));
    }

    if guest.time_in_queue >= ctx.config.queue_give_up_time
        && guest.needs.happiness <= 65
        && ctx.rand16() < 2184
    {
        tracing::trace!("Guest {:?} gave up queuing for {:?}", ctx.handle, visit.ride);
        peep.direction = direction_reverse(peep.direction);
        leave_queue(peep, visit, ctx);
    }
}

/// Leave the entrance once fully inside it
fn try_leave_entrance(peep: &mut Peep, visit: RideVisit, ctx: &mut TickContext) {
    if peep.destination.tolerance == 0 {
        ctx.park.leave_queue(visit.ride, visit.station, ctx.handle);
        peep.set_state(PeepState::Falling);
    }
}

/// Last look at the fee before boarding
fn check_price_at_entrance(
    peep: &mut Peep,
    guest: &mut GuestData,
    ride: &RideInfo,
    visit: RideVisit,
    ctx: &mut TickContext,
) -> bool {
    let price = ride.ride_price();
    if price == 0 || ctx.no_money() || guest.has_ride_voucher(ride.id) {
        return true;
    }

    let refusal = if guest.cash_in_pocket <= 0 {
        Some((ThoughtType::SpentMoney, ThoughtSubject::None))
    } else if price > guest.cash_in_pocket {
        Some((ThoughtType::CantAffordRide, ThoughtSubject::Ride(ride.id)))
    } else if ride.value.is_some_and(|value| value * 2 < price) {
        Some((ThoughtType::BadValue, ThoughtSubject::Ride(ride.id)))
    } else {
        None
    };
    match refusal {
        Some((thought, subject)) => {
            guest.thoughts.insert(thought, subject);
            try_leave_entrance(peep, visit, ctx);
            false
        }
        None => true,
    }
}

/// First in line: step fully into the entrance, then wait for a seat
pub fn update_queuing_front(peep: &mut Peep, guest: &mut GuestData, visit: RideVisit, ctx: &mut TickContext) {
    if peep.destination.tolerance != 0 && update_action(peep) == ActionStep::Arrived {
        peep.destination.tolerance = 0;
    }

    let Some(ride) = ctx.park.ride(visit.ride).cloned() else {
        try_leave_entrance(peep, visit, ctx);
        return;
    };
    if !ride.is_open() {
        try_leave_entrance(peep, visit, ctx);
        return;
    }
    if ride.is_broken() {
        return;
    }
    if !check_price_at_entrance(peep, guest, &ride, visit, ctx) {
        return;
    }

    let Some(seat) = ctx.park.try_board(visit.ride, visit.station, ctx.handle, ctx.tick) else {
        return;
    };
    guest.seat = seat;
    if let Some(station) = ride.station(visit.station) {
        peep.set_destination(station.start.xy().to_tile_centre(), 2);
    }
    peep.set_state(PeepState::EnteringRide {
        visit,
        sub: RideSubState::InEntrance,
    });
}

/// Pay at the gate and settle the satisfaction of the visit
fn pay_and_board(guest: &mut GuestData, ride: &RideInfo, ctx: &mut TickContext) {
    let price = ride.ride_price();
    if price != 0 {
        if guest.has_ride_voucher(ride.id) {
            guest.remove_voucher();
        } else if !ctx.no_money() {
            ctx.park.add_income(ride.id, price);
            spend_money(
                guest,
                price,
                SpendCategory::Rides,
                ExpenditureType::ParkRideTickets,
                ctx,
            );
        }
    }

    on_enter_ride(guest, ride, ctx);
    if guest.flags.contains(GuestFlags::TRACKING) {
        ctx.post(Notification::GuestOnRide {
            guest: ctx.handle,
            ride: ride.id,
        });
    }
}

pub fn update_entering_ride(
    peep: &mut Peep,
    guest: &mut GuestData,
    visit: RideVisit,
    sub: RideSubState,
    ctx: &mut TickContext,
) {
    let entering = |sub| PeepState::EnteringRide { visit, sub };
    match sub {
        RideSubState::InEntrance => {
            if arrived(peep) {
                peep.set_state(entering(RideSubState::FreeVehicleCheck));
            }
        }
        RideSubState::FreeVehicleCheck => {
            let Some(ride) = ctx.park.ride(visit.ride).cloned() else {
                peep.set_state(PeepState::Falling);
                return;
            };
            pay_and_board(guest, &ride, ctx);
            let platform = ride
                .station(visit.station)
                .map_or(peep.position.xy(), |s| s.start.xy().to_tile_centre());
            peep.set_destination(platform, 1);
            peep.set_state(entering(RideSubState::ApproachVehicle));
        }
        RideSubState::ApproachVehicle => {
            if arrived(peep) {
                peep.set_state(entering(RideSubState::EnterVehicle));
            }
        }
        RideSubState::EnterVehicle => {
            guest.time_on_ride = 0;
            peep.set_state(PeepState::OnRide(visit));
            ctx.emit(SimulationEvent::RideEntered {
                guest: ctx.handle,
                ride: visit.ride,
            });
        }
        RideSubState::ApproachShop => {
            if arrived(peep) {
                peep.set_state(entering(RideSubState::InteractShop));
            }
        }
        RideSubState::InteractShop => interact_with_facility(peep, guest, visit, ctx),
        RideSubState::LeaveShop => leave_facility(peep, guest, visit, ctx),
        // Leaving sub-states never appear while entering
        _ => peep.set_state(PeepState::Falling),
    }
}

/// Ride along until the ride lets its passengers off
pub fn update_on_ride(peep: &mut Peep, visit: RideVisit, ctx: &mut TickContext) {
    if ctx.park.rider_status(visit.ride, ctx.handle, ctx.tick) == RiderStatus::Riding {
        return;
    }
    ctx.park.leave_vehicle(visit.ride, ctx.handle);
    peep.set_state(PeepState::LeavingRide {
        visit,
        sub: RideSubState::LeaveVehicle,
    });
}

pub fn update_leaving_ride(
    peep: &mut Peep,
    guest: &mut GuestData,
    visit: RideVisit,
    sub: RideSubState,
    ctx: &mut TickContext,
) {
    let leaving = |sub| PeepState::LeavingRide { visit, sub };
    match sub {
        RideSubState::LeaveVehicle => {
            let exit = ctx.park.ride(visit.ride).and_then(|r| r.station(visit.station)).map(|s| {
                s.exit.unwrap_or(s.start).xy().to_tile_centre()
            });
            let exit = exit.unwrap_or_else(|| peep.position.xy());
            peep.set_destination(exit, 2);
            peep.set_state(leaving(RideSubState::ApproachExit));
        }
        RideSubState::ApproachExit => {
            if arrived(peep) {
                peep.set_state(leaving(RideSubState::InExit));
            }
        }
        RideSubState::InExit => {
            buy_ride_photo(guest, visit.ride, ctx);
            peep.set_state(leaving(RideSubState::LeaveExit));
        }
        RideSubState::LeaveExit => {
            if !arrived(peep) {
                return;
            }
            let ride = ctx.park.ride(visit.ride).cloned();
            on_exit_ride(guest, peep.energy, ride.as_ref(), ctx);
            refresh_current_tile(peep, &*ctx.park);
            peep.set_state(PeepState::Falling);
        }
        _ => peep.set_state(PeepState::Falling),
    }
}

/// On-ride photo sold at the exit
fn buy_ride_photo(guest: &mut GuestData, ride_id: RideId, ctx: &mut TickContext) {
    let Some(ride) = ctx.park.ride(ride_id).cloned() else {
        return;
    };
    if !ride.class.is_ride() {
        return;
    }
    if let Some(item) = ride.items[1] {
        if decide_and_buy_item(guest, &ride, item, ride.price[1], ctx) {
            ctx.park.record_sale(ride_id, true);
        }
    }
}

fn interact_with_facility(peep: &mut Peep, guest: &mut GuestData, visit: RideVisit, ctx: &mut TickContext) {
    let Some(ride) = ctx.park.ride(visit.ride).cloned() else {
        return;
    };
    let needs = &mut guest.needs;

    if ride.class == RideClass::FirstAid {
        if needs.nausea <= 35 {
            needs.happiness_target = needs.happiness_target.saturating_add(30);
            needs.happiness = needs.happiness_target;
        } else {
            needs.nausea -= 1;
            needs.nausea_target = needs.nausea;
            return;
        }
    } else {
        if needs.toilet != 0 {
            needs.toilet -= 1;
            return;
        }
        needs.happiness_target = needs.happiness_target.saturating_add(30);
        needs.happiness = needs.happiness_target;
        stop_purchase_thought(guest, &ride);
    }

    let doorway = peep.next.loc.xy().to_tile_centre();
    peep.set_destination(doorway, 3);
    peep.set_state(PeepState::EnteringRide {
        visit,
        sub: RideSubState::LeaveShop,
    });
}

fn leave_facility(peep: &mut Peep, guest: &mut GuestData, visit: RideVisit, ctx: &mut TickContext) {
    if update_action(peep) != ActionStep::Arrived {
        let here = peep.position.xy().to_tile_start();
        if here != peep.next.loc.xy() {
            return;
        }
    }

    peep.set_state(PeepState::Falling);
    ctx.park.add_customer(visit.ride);
    ctx.park.update_satisfaction(visit.ride, guest.needs.happiness / 64);
}

// ============================================================================
// Satisfaction
// ============================================================================

fn value_satisfaction(guest: &GuestData, ride: &RideInfo, no_money: bool) -> i32 {
    let Some(value) = ride.value.filter(|_| !no_money) else {
        return -30;
    };
    let price = ride.ride_price();
    if value >= price {
        return -5;
    }
    if value + value * guest.needs.happiness as i32 / 256 >= price {
        return -30;
    }
    0
}

/// Three widening windows; each one the rating falls inside lowers the tier
fn window_tier(rating: i32, mut min: i32, mut max: i32, happiness: i32) -> u8 {
    let mut tier = 3;
    for _ in 0..3 {
        if (min..=max).contains(&rating) {
            tier -= 1;
        }
        min -= happiness * 2;
        max += happiness;
    }
    tier
}

fn intensity_nausea_satisfaction(guest: &GuestData, ride: &RideInfo) -> i32 {
    let Some(ratings) = ride.ratings else {
        return 70;
    };
    let happiness = guest.needs.happiness as i32;
    let intensity = window_tier(
        ratings.intensity as i32,
        guest.intensity.min as i32 * 100,
        guest.intensity.max as i32 * 100,
        happiness,
    );
    let tolerance = guest.nausea_tolerance.index();
    let nausea = window_tier(
        ratings.nausea as i32,
        NAUSEA_MIN_THRESHOLDS[tolerance],
        NAUSEA_MAX_THRESHOLDS[tolerance],
        happiness,
    );

    match (intensity.max(nausea), intensity.min(nausea)) {
        (0, _) => 70,
        (1, 0) => 50,
        (1, _) => 35,
        (2, 0) => 35,
        (2, 1) => 20,
        (2, _) => 10,
        (_, 0) => -35,
        (_, 1) => -50,
        _ => -60,
    }
}

/// How much the guest enjoyed the ride they just boarded, -140 to +105
pub fn ride_satisfaction(guest: &GuestData, ride: &RideInfo, no_money: bool) -> i32 {
    let mut satisfaction = value_satisfaction(guest, ride, no_money);
    satisfaction += intensity_nausea_satisfaction(guest, ride);

    satisfaction += match guest.time_in_queue {
        t if t >= 4500 => -35,
        t if t >= 2250 => -10,
        t if t <= 750 => 10,
        _ => 0,
    };
    if guest.has_ridden_type(ride.ride_type) {
        satisfaction += 10;
    }
    if guest.has_ridden(ride.id) {
        satisfaction += 10;
    }
    satisfaction
}

fn update_favourite_ride(guest: &mut GuestData, ride: &RideInfo) {
    guest.flags.remove(GuestFlags::RIDE_SHOULD_BE_MARKED_AS_FAVOURITE);
    let excitement = ride.ratings.map_or(0, |r| r.excitement as i32);
    let score = clamp_u8(excitement / 4 + guest.needs.happiness as i32);
    if score >= guest.favourite_ride_rating
        && guest.needs.happiness >= 160
        && guest.needs.happiness_target >= 160
    {
        guest.favourite_ride_rating = score;
        guest
            .flags
            .insert(GuestFlags::RIDE_SHOULD_BE_MARKED_AS_FAVOURITE);
    }
}

fn update_nausea_growth(guest: &mut GuestData, ride: &RideInfo) {
    let nausea = ride.ratings.map_or(0, |r| r.nausea.max(0) as u32);
    let multiplier = (256 - guest.needs.happiness_target as i32).clamp(64, 200) as u32;
    let mut growth = nausea * multiplier / 512;
    growth *= (guest.needs.hunger.max(128) / 64) as u32;
    growth >>= guest.nausea_tolerance.index();
    guest.needs.nausea_target = (guest.needs.nausea_target as u32 + growth).min(255) as u8;
}

/// Stats bookkeeping as the guest boards
pub fn on_enter_ride(guest: &mut GuestData, ride: &RideInfo, ctx: &mut TickContext) {
    let satisfaction = ride_satisfaction(guest, ride, ctx.no_money());
    let tier = match satisfaction {
        s if s >= 40 => 3,
        s if s >= 20 => 2,
        s if s >= 0 => 1,
        _ => 0,
    };
    ctx.park.update_satisfaction(ride.id, tier);

    guest.num_rides = guest.num_rides.saturating_add(1);
    guest.set_has_ridden(ride.id, ride.ride_type);
    update_favourite_ride(guest, ride);
    guest.needs.adjust_happiness_target(satisfaction);
    update_nausea_growth(guest, ride);
    tracing::trace!(
        "Guest {:?} boarded {:?}, satisfaction {}",
        ctx.handle,
        ride.id,
        satisfaction
    );
}

fn should_ride_again(guest: &GuestData, energy: u8, ride: &RideInfo, ctx: &mut TickContext) -> bool {
    let Some(ratings) = ride.ratings else {
        return false;
    };
    let needs = &guest.needs;
    if ratings.intensity > REPEAT_RIDE_MAX_INTENSITY
        || needs.happiness < 180
        || energy < 100
        || needs.nausea > 160
        || needs.hunger < 30
        || needs.thirst < 20
        || needs.toilet > 170
    {
        return false;
    }

    let roll = ctx.rand() & 0xFF;
    if roll <= 128 && (guest.num_rides > 7 || roll > 64) {
        return false;
    }
    true
}

fn should_prefer_more_intensity(guest: &GuestData, ctx: &mut TickContext) -> bool {
    if ctx.config.park.prefer_less_intense_rides || guest.needs.happiness < 200 {
        return false;
    }
    let packed = (guest.intensity.max << 4) | guest.intensity.min;
    (ctx.rand() & 0xFF) >= packed as u32
}

fn really_liked_ride(guest: &GuestData, ride: &RideInfo) -> bool {
    guest.needs.happiness >= 215
        && guest.needs.nausea <= 120
        && ride
            .ratings
            .is_some_and(|r| r.intensity <= REPEAT_RIDE_MAX_INTENSITY)
}

/// Stats bookkeeping as the guest steps out of the exit
pub fn on_exit_ride(guest: &mut GuestData, energy: u8, ride: Option<&RideInfo>, ctx: &mut TickContext) {
    if guest
        .flags
        .contains(GuestFlags::RIDE_SHOULD_BE_MARKED_AS_FAVOURITE)
    {
        guest
            .flags
            .remove(GuestFlags::RIDE_SHOULD_BE_MARKED_AS_FAVOURITE);
        guest.favourite_ride = ride.map(|r| r.id);
    }
    guest.needs.happiness = guest.needs.happiness_target;
    guest.needs.nausea = guest.needs.nausea_target;

    if guest.is_leaving() {
        guest.flags.remove(GuestFlags::PARK_ENTRANCE_CHOSEN);
    }

    if let Some(ride) = ride {
        if should_ride_again(guest, energy, ride, ctx) {
            guest.heading_to_ride = Some(ride.id);
            guest.lost_countdown = 200;
        }
    }

    if should_prefer_more_intensity(guest, ctx) && guest.intensity.max < 15 {
        guest.intensity.max += 1;
    }

    if let Some(ride) = ride {
        if really_liked_ride(guest, ride) {
            guest
                .thoughts
                .insert(ThoughtType::WasGreat, ThoughtSubject::Ride(ride.id));
        }
        ctx.park.add_customer(ride.id);
        ctx.emit(SimulationEvent::RideExited {
            guest: ctx.handle,
            ride: ride.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RideTypeId, StationIndex, TileCoords};
    use crate::entity::agent::{Agent, AgentKind};
    use crate::park::rides::RideEconomy;
    use crate::park::sandbox::{ride_plot, shop_plot};
    use crate::simulation::fixture::Fixture;

    fn gentle_ride() -> RideInfo {
        ride_plot(RideId(1), RideTypeId(1), 6, 4)
    }

    fn visit() -> RideVisit {
        RideVisit::new(RideId(1), StationIndex(0))
    }

    #[test]
    fn test_fair_gentle_ride_satisfaction() {
        let ride = gentle_ride();
        let mut guest = Fixture::guest();
        // -5 for fair value, 70 inside every window, 10 for a short queue
        assert_eq!(ride_satisfaction(&guest, &ride, false), 75);
        assert_eq!(ride_satisfaction(&guest, &ride, true), 50);

        guest.set_has_ridden(ride.id, ride.ride_type);
        assert_eq!(ride_satisfaction(&guest, &ride, false), 95);

        guest.time_in_queue = 5000;
        assert_eq!(ride_satisfaction(&guest, &ride, false), 50);
    }

    #[test]
    fn test_boarding_records_the_visit() {
        let mut fx = Fixture::new();
        let ride = gentle_ride();
        fx.park.add_ride(ride.clone());
        let mut guest = Fixture::guest();
        {
            let mut ctx = fx.ctx();
            on_enter_ride(&mut guest, &ride, &mut ctx);
        }
        assert_eq!(guest.num_rides, 1);
        assert!(guest.has_ridden(ride.id));
        assert_eq!(guest.needs.happiness_target, 203);
        // 200 nausea, 64 multiplier, x3 for hunger, halved twice for tolerance
        assert_eq!(guest.needs.nausea_target, 18);
        let stats = fx.park.stats(ride.id).copied().unwrap_or_default();
        assert_eq!(stats.satisfaction_votes, 1);
        assert_eq!(stats.satisfaction_total, 3);
    }

    #[test]
    fn test_front_of_queue_boards() {
        let mut fx = Fixture::new();
        fx.park.add_ride(gentle_ride());
        let handle = fx.handle;
        fx.park.join_queue(RideId(1), StationIndex(0), handle);
        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        peep.set_state(PeepState::QueuingFront(visit()));
        let mut guest = Fixture::guest();

        let mut ctx = fx.ctx();
        update_queuing_front(&mut peep, &mut guest, visit(), &mut ctx);
        assert_eq!(
            peep.state,
            PeepState::EnteringRide {
                visit: visit(),
                sub: RideSubState::InEntrance,
            }
        );
        assert_eq!(ctx.park.queue_front(RideId(1), StationIndex(0)), None);
    }

    /// Queue a guest facing east with another guest `offset` units further
    /// east, facing `ahead_direction`; returns whether the guest holds still
    fn holds_behind(offset: i32, ahead_direction: u8) -> bool {
        let mut fx = Fixture::new();
        fx.park.add_ride(gentle_ride());
        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        peep.direction = 2;
        let mut ahead = peep.clone();
        ahead.position.x += offset;
        ahead.direction = ahead_direction;
        let ahead = fx
            .agents
            .allocate(Agent {
                peep: ahead,
                kind: AgentKind::Guest(Fixture::guest()),
            })
            .unwrap();
        fx.handle = fx
            .agents
            .allocate(Agent {
                peep: peep.clone(),
                kind: AgentKind::Guest(Fixture::guest()),
            })
            .unwrap();
        fx.park.join_queue(RideId(1), StationIndex(0), ahead);
        fx.park.join_queue(RideId(1), StationIndex(0), fx.handle);
        let mut guest = Fixture::guest();

        let mut ctx = fx.ctx();
        update_queue_position(&mut peep, &mut guest, visit(), &mut ctx)
    }

    #[test]
    fn test_queue_spacing() {
        // Close enough and the ahead guest's heading does not matter
        assert!(holds_behind(7, 0));
        assert!(!holds_behind(8, 0));
        // Further out only a guest walking the same way holds the line
        assert!(holds_behind(8, 2));
        assert!(holds_behind(12, 2));
        assert!(!holds_behind(20, 2));
    }

    #[test]
    fn test_broken_ride_keeps_guest_waiting() {
        let mut fx = Fixture::new();
        fx.park.add_ride(gentle_ride());
        fx.park
            .break_down(RideId(1), crate::park::rides::BreakdownReason::SafetyCutOut);
        let handle = fx.handle;
        fx.park.join_queue(RideId(1), StationIndex(0), handle);
        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        peep.set_state(PeepState::QueuingFront(visit()));
        let mut guest = Fixture::guest();

        let mut ctx = fx.ctx();
        update_queuing_front(&mut peep, &mut guest, visit(), &mut ctx);
        assert_eq!(peep.state, PeepState::QueuingFront(visit()));
    }

    #[test]
    fn test_free_vehicle_check_takes_the_fare() {
        let mut fx = Fixture::new();
        fx.park.add_ride(gentle_ride());
        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        let mut guest = Fixture::guest();
        {
            let mut ctx = fx.ctx();
            update_entering_ride(
                &mut peep,
                &mut guest,
                visit(),
                RideSubState::FreeVehicleCheck,
                &mut ctx,
            );
        }
        assert_eq!(guest.cash_in_pocket, 480);
        assert_eq!(guest.num_rides, 1);
        assert_eq!(fx.park.stats(RideId(1)).map(|s| s.income), Some(20));
        assert_eq!(
            peep.state,
            PeepState::EnteringRide {
                visit: visit(),
                sub: RideSubState::ApproachVehicle,
            }
        );
    }

    #[test]
    fn test_riders_stay_on_until_the_ride_finishes() {
        let mut fx = Fixture::new();
        fx.park.add_ride(gentle_ride());
        let handle = fx.handle;
        fx.park.join_queue(RideId(1), StationIndex(0), handle);
        assert!(fx.park.try_board(RideId(1), StationIndex(0), handle, 0).is_some());

        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        let mut guest = Fixture::guest();
        {
            let mut ctx = fx.ctx();
            update_entering_ride(&mut peep, &mut guest, visit(), RideSubState::EnterVehicle, &mut ctx);
        }
        assert_eq!(peep.state, PeepState::OnRide(visit()));
        assert!(fx.events.contains(&SimulationEvent::RideEntered {
            guest: handle,
            ride: RideId(1),
        }));

        fx.tick = 100;
        update_on_ride(&mut peep, visit(), &mut fx.ctx());
        assert_eq!(peep.state, PeepState::OnRide(visit()));

        fx.tick = crate::park::sandbox::DEFAULT_RIDE_DURATION;
        update_on_ride(&mut peep, visit(), &mut fx.ctx());
        assert_eq!(
            peep.state,
            PeepState::LeavingRide {
                visit: visit(),
                sub: RideSubState::LeaveVehicle,
            }
        );
    }

    #[test]
    fn test_exit_counts_the_customer() {
        let mut fx = Fixture::new();
        let ride = gentle_ride();
        fx.park.add_ride(ride.clone());
        let mut guest = Fixture::guest();
        {
            let mut ctx = fx.ctx();
            on_exit_ride(&mut guest, 50, Some(&ride), &mut ctx);
        }
        assert_eq!(fx.park.stats(ride.id).map(|s| s.customers), Some(1));
        assert_eq!(guest.heading_to_ride, None);
        assert!(fx.events.contains(&SimulationEvent::RideExited {
            guest: fx.handle,
            ride: ride.id,
        }));
    }

    #[test]
    fn test_toilet_visit_takes_time() {
        let mut fx = Fixture::new();
        let toilets = shop_plot(RideId(1), RideClass::Toilets, TileCoords::new(3, 5), [None, None]);
        fx.park.add_ride(toilets);
        let mut peep = fx.walking_peep(TileCoords::new(3, 4));
        let interacting = PeepState::EnteringRide {
            visit: visit(),
            sub: RideSubState::InteractShop,
        };
        peep.set_state(interacting);
        let mut guest = Fixture::guest();
        guest.needs.toilet = 2;

        let mut ctx = fx.ctx();
        update_entering_ride(&mut peep, &mut guest, visit(), RideSubState::InteractShop, &mut ctx);
        assert_eq!(guest.needs.toilet, 1);
        assert_eq!(peep.state, interacting);

        update_entering_ride(&mut peep, &mut guest, visit(), RideSubState::InteractShop, &mut ctx);
        update_entering_ride(&mut peep, &mut guest, visit(), RideSubState::InteractShop, &mut ctx);
        assert_eq!(guest.needs.toilet, 0);
        assert_eq!(guest.needs.happiness_target, 158);
        assert_eq!(
            peep.state,
            PeepState::EnteringRide {
                visit: visit(),
                sub: RideSubState::LeaveShop,
            }
        );
    }
}
