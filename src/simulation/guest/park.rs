//! Guest creation, admission and departure

use crate::core::config::ParkSettings;
use crate::core::rng::ScenarioRng;
use crate::core::types::DIRECTION_DELTAS;
use crate::entity::agent::{Peep, PeepState};
use crate::entity::guest::{GuestData, GuestFlags, SpendCategory};
use crate::entity::needs::{clamp_u8, GuestNeeds, IntensityRange, NauseaTolerance};
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::notify::Notification;
use crate::park::pathing::{PathGoal, PathInteraction, PathingFlags};
use crate::park::rides::ExpenditureType;
use crate::simulation::context::{Fate, TickContext};
use crate::simulation::guest::purchase::spend_money;
use crate::simulation::movement::{
    perform_next_action, return_to_centre_of_tile, update_action, ActionStep, ALL_DIRECTIONS,
};
use crate::simulation::tick::SimulationEvent;

const TSHIRT_COLOURS: u32 = 32;
const TROUSER_COLOURS: u32 = 16;

/// Lost countdown given to a guest who has just decided to go home
const LEAVING_LOST_COUNTDOWN: u8 = 254;

/// Roll a new guest's attributes and starting energy
///
/// The draw order is fixed: mass, intensity, nausea tolerance, happiness,
/// hunger, thirst, cash, shirt, trousers, energy.
pub fn generate_guest(rng: &mut ScenarioRng, settings: &ParkSettings) -> (GuestData, u8) {
    let mass = (rng.next() & 0x1F) as u8 + 45;

    let highest = (rng.next() & 7) as u8 + 3;
    let lowest = highest.min(7) - 3;
    let highest = if highest >= 7 { 15 } else { highest };
    let intensity = match (
        settings.prefer_less_intense_rides,
        settings.prefer_more_intense_rides,
    ) {
        (true, true) => IntensityRange::new(0, 15),
        (true, false) => IntensityRange::new(0, 4),
        (false, true) => IntensityRange::new(9, 15),
        (false, false) => IntensityRange::new(lowest, highest),
    };

    let mut tolerance_roll = (rng.next() & 7) as usize;
    if settings.prefer_more_intense_rides {
        tolerance_roll += 4;
    }
    let nausea_tolerance = NauseaTolerance::DISTRIBUTION[tolerance_roll];

    let base_happiness = match settings.guest_initial_happiness {
        0 => 128,
        h => h,
    };
    let happiness = vary(rng, base_happiness);
    let hunger = vary(rng, settings.guest_initial_hunger);
    let thirst = vary(rng, settings.guest_initial_thirst);

    let roll = (rng.next() & 3) as i32;
    let mut cash = (roll * 100 - 100 + settings.guest_initial_cash).max(0);
    if settings.guest_initial_cash == 0 {
        cash = 500;
    }
    if settings.no_money {
        cash = 0;
    }

    let mut guest = GuestData::new(GuestNeeds {
        happiness,
        happiness_target: happiness,
        nausea: 0,
        nausea_target: 0,
        hunger,
        thirst,
        toilet: 0,
    });
    guest.intensity = intensity;
    guest.nausea_tolerance = nausea_tolerance;
    guest.cash_in_pocket = cash;
    guest.appearance.mass = mass;
    guest.appearance.tshirt_colour = (rng.next() % TSHIRT_COLOURS) as u8;
    guest.appearance.trousers_colour = (rng.next() % TROUSER_COLOURS) as u8;

    let energy = (rng.next() % 64) as u8 + 65;
    (guest, energy)
}

/// Starting need plus a -15..=16 spread
fn vary(rng: &mut ScenarioRng, base: u8) -> u8 {
    let delta = (rng.next() & 0x1F) as i32 - 15;
    clamp_u8(base as i32 + delta)
}

/// Walk toward the entrance, or through it once admitted
pub fn update_entering_park(
    peep: &mut Peep,
    guest: &mut GuestData,
    ctx: &mut TickContext,
    admitted: bool,
) -> Fate {
    if !admitted {
        let outcome = perform_next_action(
            peep,
            PathGoal::ParkEntrance,
            ALL_DIRECTIONS,
            false,
            ctx.park,
            ctx.rng,
        );
        if outcome.flags.contains(PathingFlags::OUTSIDE_PARK) {
            ctx.counters.guests_heading_for_park =
                ctx.counters.guests_heading_for_park.saturating_sub(1);
            return Fate::Remove;
        }
        if outcome.interaction == Some(PathInteraction::ParkEntrance) {
            admit(peep, guest, ctx);
        }
        return Fate::Alive;
    }

    if update_action(peep) != ActionStep::Arrived {
        return Fate::Alive;
    }

    peep.set_state(PeepState::Falling);
    guest.outside_park = false;
    guest.park_entry_tick = Some(ctx.tick);
    ctx.counters.guests_in_park += 1;
    ctx.counters.guests_heading_for_park = ctx.counters.guests_heading_for_park.saturating_sub(1);
    tracing::debug!("Guest {:?} entered the park", ctx.handle);
    ctx.emit(SimulationEvent::GuestAdmitted { guest: ctx.handle });
    Fate::Alive
}

/// Pay the entrance fee and step through, or be turned away
fn admit(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    let fee = ctx.config.park.entrance_fee;
    if !ctx.no_money() && fee > 0 {
        if fee > guest.cash_in_pocket {
            guest
                .thoughts
                .insert(ThoughtType::CantAffordRide, ThoughtSubject::None);
            turn_away(peep, ctx);
            return;
        }
        ctx.counters.admission_income += fee;
        spend_money(
            guest,
            fee,
            SpendCategory::ParkEntry,
            ExpenditureType::ParkEntranceTickets,
            ctx,
        );
        guest.flags.insert(GuestFlags::HAS_PAID_FOR_PARK_ENTRY);
    }

    ctx.counters.total_admissions += 1;
    let through = peep.destination.loc + DIRECTION_DELTAS[peep.direction as usize & 3];
    peep.set_destination(through, 7);
    peep.set_state(PeepState::EnteringPark { admitted: true });
}

/// Send a guest who cannot get in back off the map
fn turn_away(peep: &mut Peep, ctx: &mut TickContext) {
    ctx.counters.guests_turned_away += 1;
    ctx.counters.guests_heading_for_park = ctx.counters.guests_heading_for_park.saturating_sub(1);
    tracing::debug!("Guest {:?} turned away at the entrance", ctx.handle);
    ctx.emit(SimulationEvent::GuestTurnedAway { guest: ctx.handle });
    return_to_centre_of_tile(peep);
    peep.set_state(PeepState::LeavingPark);
}

/// Walk out through the entrance, then off the map
pub fn update_leaving_park(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) -> Fate {
    if !guest.outside_park {
        if update_action(peep) != ActionStep::Arrived {
            return Fate::Alive;
        }
        guest.outside_park = true;
        peep.destination.tolerance = 5;
        ctx.counters.guests_in_park = ctx.counters.guests_in_park.saturating_sub(1);
        ctx.counters.guests_left += 1;
        tracing::debug!("Guest {:?} left the park", ctx.handle);
        ctx.emit(SimulationEvent::GuestLeftPark { guest: ctx.handle });
    }

    let outcome = perform_next_action(
        peep,
        PathGoal::ParkExit,
        ALL_DIRECTIONS,
        false,
        ctx.park,
        ctx.rng,
    );
    if outcome.flags.contains(PathingFlags::OUTSIDE_PARK) {
        return Fate::Remove;
    }
    Fate::Alive
}

/// A walking guest steps onto the park entrance tile
///
/// Guests on their way out pass through; everyone else turns back.
pub fn walk_into_park_entrance(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if !guest.is_leaving() {
        return_to_centre_of_tile(peep);
        return;
    }

    let through = peep.destination.loc + DIRECTION_DELTAS[peep.direction as usize & 3];
    peep.set_destination(through, 9);
    peep.set_state(PeepState::LeavingPark);
    if guest.flags.contains(GuestFlags::TRACKING) {
        ctx.post(Notification::GuestLeftPark { guest: ctx.handle });
    }
}

/// Decide to go home
pub fn leave_park(guest: &mut GuestData) {
    guest.heading_to_ride = None;
    if guest.is_leaving() {
        if guest.lost_countdown < 60 {
            return;
        }
    } else {
        guest.lost_countdown = LEAVING_LOST_COUNTDOWN;
        guest.flags.insert(GuestFlags::LEAVING_PARK);
        guest.flags.remove(GuestFlags::PARK_ENTRANCE_CHOSEN);
    }

    guest
        .thoughts
        .insert(ThoughtType::GoHome, ThoughtSubject::None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_respects_park_flags() {
        let settings = ParkSettings {
            prefer_more_intense_rides: true,
            ..ParkSettings::default()
        };
        let mut rng = ScenarioRng::from_state(7, 11);
        for _ in 0..50 {
            let (guest, energy) = generate_guest(&mut rng, &settings);
            assert_eq!(guest.intensity, IntensityRange::new(9, 15));
            assert!(guest.nausea_tolerance.index() >= 2);
            assert!((65..=128).contains(&energy));
            assert!((45..=76).contains(&guest.appearance.mass));
        }
    }

    #[test]
    fn test_default_intensity_window() {
        let mut rng = ScenarioRng::from_state(3, 5);
        for _ in 0..50 {
            let (guest, _) = generate_guest(&mut rng, &ParkSettings::default());
            assert!(guest.intensity.min <= 4);
            assert!(guest.intensity.max >= 3);
            assert!(guest.intensity.max <= 6 || guest.intensity.max == 15);
        }
    }

    #[test]
    fn test_cash_spread_and_no_money() {
        let mut rng = ScenarioRng::from_state(1, 2);
        for _ in 0..50 {
            let (guest, _) = generate_guest(&mut rng, &ParkSettings::default());
            assert!([400, 500, 600, 700].contains(&guest.cash_in_pocket));
            assert!(guest.outside_park);
        }

        let no_money = ParkSettings {
            no_money: true,
            ..ParkSettings::default()
        };
        let (guest, _) = generate_guest(&mut rng, &no_money);
        assert_eq!(guest.cash_in_pocket, 0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut a = ScenarioRng::from_state(9, 9);
        let mut b = ScenarioRng::from_state(9, 9);
        let settings = ParkSettings::default();
        assert_eq!(
            generate_guest(&mut a, &settings),
            generate_guest(&mut b, &settings)
        );
        assert_eq!(a.draws(), 10);
    }

    #[test]
    fn test_leave_park_sets_flag_and_thought() {
        let mut guest = GuestData::new(GuestNeeds::default());
        guest.heading_to_ride = Some(crate::core::types::RideId(1));
        leave_park(&mut guest);
        assert!(guest.is_leaving());
        assert_eq!(guest.heading_to_ride, None);
        assert_eq!(guest.lost_countdown, LEAVING_LOST_COUNTDOWN);
        assert_eq!(guest.thoughts.newest().map(|t| t.kind), Some(ThoughtType::GoHome));
    }
}
