//! Slow guest update: needs, idle thoughts and the decision to go home
//!
//! Runs once every 128 ticks per guest, staggered by pool slot so the whole
//! crowd does not re-evaluate on the same tick. Every fourth pass does the
//! heavier bookkeeping and every eighth rolls for a "possible thought".

use crate::core::types::Money;
use crate::entity::agent::{ActionKind, Peep, PeepState};
use crate::entity::guest::{GuestData, GuestFlags};
use crate::entity::items::ShopItem;
use crate::entity::needs::{step_toward, MAX_ENERGY, MIN_ENERGY};
use crate::entity::thoughts::{ThoughtSubject, ThoughtType};
use crate::park::map::AdditionKind;
use crate::park::rides::RideFlags;
use crate::simulation::context::{Fate, TickContext};
use crate::simulation::guest::park::leave_park;
use crate::simulation::guest::ride_select::{head_for_nearest_facility, pick_ride_to_go_on, Facility};

/// Slow-update period mask
pub const SLOW_UPDATE_MASK: u64 = 0x7F;
const HOUSEKEEPING_MASK: u64 = 0x1FF;
const POSSIBLE_THOUGHT_MASK: u64 = 0x3FF;

/// Highest energy target a guest can build up
const MAX_ENERGY_TARGET: u8 = 255;

/// Cash below which a guest starts to worry about running out
const LOW_CASH: Money = 90;

/// Passes of the housekeeping block between surroundings assessments
const SURROUNDINGS_INTERVAL: u8 = 18;

/// Ticks without a ride, in units of 2048, before a guest gives up on the park
const NO_RIDE_GIVE_UP: u64 = 5;

const CROWDED_THOUGHTS: [Option<ThoughtType>; 16] = [
    Some(ThoughtType::Lost),
    Some(ThoughtType::Tired),
    Some(ThoughtType::BadLitter),
    Some(ThoughtType::Hungry),
    Some(ThoughtType::Thirsty),
    Some(ThoughtType::VeryClean),
    Some(ThoughtType::Crowded),
    Some(ThoughtType::Scenery),
    Some(ThoughtType::VeryClean),
    Some(ThoughtType::Music),
    Some(ThoughtType::Watched),
    Some(ThoughtType::NotHungry),
    Some(ThoughtType::NotThirsty),
    Some(ThoughtType::Toilet),
    None,
    None,
];

/// Whether the guest in `slot` gets its slow update this tick
pub fn is_slow_update_due(slot: u32, tick: u64) -> bool {
    slot as u64 & SLOW_UPDATE_MASK == tick & SLOW_UPDATE_MASK
}

pub fn slow_update(peep: &mut Peep, guest: &mut GuestData, slot: u32, ctx: &mut TickContext) -> Fate {
    let slot = slot as u64;
    if slot & HOUSEKEEPING_MASK == ctx.tick & HOUSEKEEPING_MASK {
        if housekeeping(peep, guest, slot, ctx) == Fate::Remove {
            return Fate::Remove;
        }
    }
    consume_and_converge(peep, guest);
    Fate::Alive
}

fn housekeeping(peep: &mut Peep, guest: &mut GuestData, slot: u64, ctx: &mut TickContext) -> Fate {
    if guest.flags.contains(GuestFlags::CROWDED) {
        if let Some(thought) = CROWDED_THOUGHTS[(ctx.rand() & 0xF) as usize] {
            guest.thoughts.insert(thought, ThoughtSubject::None);
        }
    }

    if guest.flags.contains(GuestFlags::EXPLODE) {
        if matches!(peep.state, PeepState::Walking | PeepState::Sitting { .. }) {
            tracing::debug!("Guest {:?} exploded", ctx.handle);
            return Fate::Remove;
        }
        guest.flags.remove(GuestFlags::EXPLODE);
    }

    apply_debug_flags(guest);
    guest.angriness = guest.angriness.saturating_sub(1);

    if matches!(peep.state, PeepState::Walking | PeepState::Sitting { .. }) {
        guest.surroundings_thought_timeout += 1;
        if guest.surroundings_thought_timeout >= SURROUNDINGS_INTERVAL {
            guest.surroundings_thought_timeout = 0;
            if let Some(thought) = assess_surroundings(peep, ctx) {
                guest.thoughts.insert(thought, ThoughtSubject::None);
                guest.needs.adjust_happiness_target(45);
            }
        }
    }

    if matches!(peep.state, PeepState::OnRide(_) | PeepState::EnteringRide { .. }) {
        ride_boredom(peep, guest, ctx);
    }

    if peep.state == PeepState::Walking
        && !guest.outside_park
        && !guest.is_leaving()
        && guest.num_rides == 0
        && guest.heading_to_ride.is_none()
    {
        let waited = ctx.tick.saturating_sub(guest.park_entry_tick.unwrap_or(ctx.tick)) / 2048;
        if waited >= NO_RIDE_GIVE_UP {
            pick_ride_to_go_on(peep, guest, ctx);
            if guest.heading_to_ride.is_none() {
                tracing::debug!("Guest {:?} found nothing to ride and is going home", ctx.handle);
                guest.needs.adjust_happiness_target(-128);
                leave_park(guest);
                update_hunger(peep, guest);
                idle_drift(peep, guest, ctx);
                return Fate::Alive;
            }
        }
    }

    let pick_chance = if guest.items.has(ShopItem::Map) {
        8192
    } else {
        2184
    };
    if ctx.rand16() <= pick_chance {
        pick_ride_to_go_on(peep, guest, ctx);
    }

    if slot & POSSIBLE_THOUGHT_MASK == ctx.tick & POSSIBLE_THOUGHT_MASK {
        possible_thought(peep, guest, ctx);
    } else if guest.needs.nausea >= 140 {
        let thought = if guest.needs.nausea >= 200 {
            head_for_nearest_facility(peep, guest, Facility::FirstAid, false, ctx);
            ThoughtType::VerySick
        } else {
            ThoughtType::Sick
        };
        guest.thoughts.insert(thought, ThoughtSubject::None);
    }

    state_decay(peep, guest, ctx);
    idle_drift(peep, guest, ctx);
    Fate::Alive
}

/// Cheat flags that force a need every housekeeping pass
fn apply_debug_flags(guest: &mut GuestData) {
    let needs = &mut guest.needs;
    if guest.flags.contains(GuestFlags::HUNGER) && needs.hunger >= 15 {
        needs.hunger -= 15;
    }
    if guest.flags.contains(GuestFlags::TOILET) && needs.toilet <= 180 {
        needs.toilet += 50;
    }
    if guest.flags.contains(GuestFlags::HAPPINESS) {
        needs.happiness_target = 5;
    }
    if guest.flags.contains(GuestFlags::NAUSEA) {
        needs.nausea_target = 200;
        needs.nausea = needs.nausea.max(130);
    }
}

/// Thought prompted by the area around a guest standing at ground level
fn assess_surroundings(peep: &Peep, ctx: &TickContext) -> Option<ThoughtType> {
    let here = peep.position.xy().to_tile_start();
    if ctx
        .park
        .surface_height(here)
        .is_some_and(|ground| ground > peep.position.z)
    {
        return None;
    }

    let around = ctx.park.surroundings(here.with_z(peep.position.z));
    if around.fountains >= 5 && around.rubbish < 20 {
        Some(ThoughtType::Fountains)
    } else if around.scenery >= 40 && around.rubbish < 8 {
        Some(ThoughtType::Scenery)
    } else if around.music && around.rubbish < 20 {
        Some(ThoughtType::Music)
    } else if around.rubbish < 2 {
        Some(ThoughtType::VeryClean)
    } else {
        None
    }
}

/// Long rides wear thin
fn ride_boredom(peep: &Peep, guest: &mut GuestData, ctx: &TickContext) {
    guest.time_on_ride = guest.time_on_ride.saturating_add(1);
    if guest.flags.contains(GuestFlags::WOW) {
        guest.thoughts.insert(ThoughtType::Wow, ThoughtSubject::None);
    }
    if guest.time_on_ride <= 15 {
        return;
    }
    guest.needs.adjust_happiness_target(-5);
    if guest.time_on_ride <= 22 {
        return;
    }
    let Some(ride) = peep.state.ride().and_then(|id| ctx.park.ride(id)) else {
        return;
    };
    let thought = if ride.flags.contains(RideFlags::IN_RIDE) {
        ThoughtType::GetOut
    } else {
        ThoughtType::GetOff
    };
    guest.thoughts.insert(thought, ThoughtSubject::Ride(ride.id));
}

/// Pick one pressing need to think about and go looking for a fix
fn possible_thought(peep: &Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if guest.outside_park || !matches!(peep.state, PeepState::Walking | PeepState::Sitting { .. }) {
        return;
    }

    let mut candidates = Vec::with_capacity(5);
    if guest.is_leaving() {
        candidates.push(ThoughtType::GoHome);
    } else {
        let needs = guest.needs;
        let snacking = guest.items.has_food_or_drink();
        if peep.energy <= 70 && needs.happiness < 128 {
            candidates.push(ThoughtType::Tired);
        }
        if needs.hunger <= 10 && !snacking {
            candidates.push(ThoughtType::Hungry);
        }
        if needs.thirst <= 25 && !snacking {
            candidates.push(ThoughtType::Thirsty);
        }
        if needs.toilet >= 160 {
            candidates.push(ThoughtType::Toilet);
        }
        if !ctx.no_money()
            && guest.cash_in_pocket <= LOW_CASH
            && needs.happiness >= 105
            && peep.energy >= 70
        {
            candidates.push(ThoughtType::RunningOut);
        }
    }
    if candidates.is_empty() {
        return;
    }

    let chosen = candidates[ctx.rand() as usize % candidates.len()];
    guest.thoughts.insert(chosen, ThoughtSubject::None);
    let facility = match chosen {
        ThoughtType::Hungry => Facility::FoodStall,
        ThoughtType::Thirsty => Facility::DrinkStall,
        ThoughtType::Toilet => Facility::Toilets,
        ThoughtType::RunningOut => Facility::CashMachine,
        _ => return,
    };
    head_for_nearest_facility(peep, guest, facility, false, ctx);
}

fn state_decay(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    match peep.state {
        PeepState::Walking | PeepState::LeavingPark | PeepState::EnteringPark { .. } => {
            decide_whether_to_leave_park(peep, guest, ctx);
            update_hunger(peep, guest);
        }
        PeepState::Sitting { .. } => {
            if peep.energy_target <= 135 {
                peep.energy_target += 5;
            }
            let needs = &mut guest.needs;
            if needs.thirst >= 5 {
                needs.thirst -= 4;
                needs.toilet = needs.toilet.saturating_add(3);
            }
            if needs.nausea_target >= 50 {
                needs.nausea_target -= 6;
            }
            update_hunger(peep, guest);
        }
        PeepState::Queuing(_) | PeepState::QueuingFront(_) => {
            if guest.time_in_queue >= 2000 {
                let screen = ctx
                    .park
                    .path_at(peep.next.loc)
                    .and_then(|path| path.addition)
                    .is_some_and(|addition| addition.is_usable(AdditionKind::QueueScreen));
                let needs = &mut guest.needs;
                if screen {
                    needs.happiness_target = needs.happiness_target.max(90);
                    if needs.happiness_target < 165 {
                        needs.happiness_target += 2;
                    }
                } else {
                    needs.adjust_happiness_target(-4);
                }
            }
            update_hunger(peep, guest);
        }
        PeepState::EnteringRide { .. } => update_hunger(peep, guest),
        _ => {}
    }
}

/// Digesting turns food into energy
pub fn update_hunger(peep: &mut Peep, guest: &mut GuestData) {
    if guest.needs.hunger >= 3 {
        guest.needs.hunger -= 2;
        peep.energy_target = peep.energy_target.saturating_add(2).min(MAX_ENERGY_TARGET);
        guest.needs.toilet = guest.needs.toilet.saturating_add(1);
    }
}

/// Tired, unhappy or broke guests have a small chance each pass to head home
pub fn decide_whether_to_leave_park(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    if peep.energy_target >= 33 {
        peep.energy_target -= 2;
    }
    if ctx.temperature() >= 21 && guest.needs.thirst >= 5 {
        guest.needs.thirst -= 1;
    }
    if guest.outside_park {
        return;
    }

    if !guest.is_leaving() {
        let content = if ctx.no_money() {
            peep.energy >= 70 && guest.needs.happiness >= 60
        } else {
            peep.energy >= 55 && guest.needs.happiness >= 45 && guest.cash_in_pocket >= 50
        };
        if content {
            return;
        }
    }

    if ctx.rand16() > 3276 {
        return;
    }
    tracing::debug!("Guest {:?} decided to leave the park", ctx.handle);
    leave_park(guest);
}

/// Targets relax toward neutral; very low needs sink further
fn idle_drift(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) {
    let needs = &mut guest.needs;
    if needs.happiness_target >= 128 {
        needs.happiness_target -= 1;
    } else {
        needs.happiness_target += 1;
    }
    needs.nausea_target = needs.nausea_target.saturating_sub(2);

    if peep.energy <= 50 {
        peep.energy = peep.energy.saturating_sub(2).max(MIN_ENERGY);
    }
    if needs.hunger < 10 {
        needs.hunger = needs.hunger.saturating_sub(1);
    }
    if needs.thirst < 10 {
        needs.thirst = needs.thirst.saturating_sub(1);
    }
    if needs.toilet >= 195 {
        needs.toilet -= 1;
    }

    if peep.state == PeepState::Walking && needs.nausea_target >= 128 {
        // Below 128 nausea the threshold wraps to a large byte
        let threshold = ((needs.nausea as i32 - 128) / 2) as u8;
        if ctx.rand() & 0xFF <= threshold as u32 && peep.is_action_walking() {
            peep.start_action(ActionKind::ThrowUp);
        }
    }
}

/// Finish food and drink over time, then move energy, happiness and nausea
/// toward their targets
fn consume_and_converge(peep: &mut Peep, guest: &mut GuestData) {
    if guest.time_to_consume == 0 && guest.items.has_food_or_drink() {
        guest.time_to_consume += 3;
    }

    if guest.time_to_consume != 0 && !matches!(peep.state, PeepState::OnRide(_)) {
        guest.time_to_consume = guest.time_to_consume.saturating_sub(3);
        let needs = &mut guest.needs;
        if guest.items.has_drink() {
            needs.thirst = needs.thirst.saturating_add(7);
        } else {
            needs.hunger = needs.hunger.saturating_add(7);
            needs.thirst = needs.thirst.saturating_sub(3);
            needs.toilet = needs.toilet.saturating_add(2);
        }

        if guest.time_to_consume == 0 {
            if let Some(food) = guest.items.food_or_drink() {
                guest.items.remove(food);
                if let Some(container) = food.descriptor().discard_container {
                    guest.items.give(container);
                }
            }
        }
    }

    peep.energy = converge_energy(peep.energy, peep.energy_target);
    guest.needs.converge();
}

/// Energy falls by 2 or rises by 4 toward its target, kept within the
/// walking range
pub fn converge_energy(energy: u8, target: u8) -> u8 {
    let next = if energy >= target {
        step_toward(energy, target, 2, 0)
    } else {
        energy.saturating_add(4).min(MAX_ENERGY_TARGET).min(target)
    };
    next.clamp(MIN_ENERGY, MAX_ENERGY)
}
