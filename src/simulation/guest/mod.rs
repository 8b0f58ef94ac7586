//! Guest behaviour
//!
//! [`update_guest`] runs once per tick for every guest. It does the cheap
//! per-tick bookkeeping, gates the state step on the walking-speed
//! accumulator and dispatches on [`PeepState`]. The coarse needs pass lives
//! in [`decay`] and is driven by the scheduler.

pub mod decay;
pub mod leisure;
pub mod park;
pub mod purchase;
pub mod ride_select;
pub mod riding;
pub mod walking;

use crate::entity::agent::{ActionKind, Peep, PeepAction, PeepState};
use crate::entity::guest::{GuestData, GuestFlags};
use crate::park::map::{Litter, LitterKind};
use crate::simulation::context::{Fate, TickContext};
use crate::simulation::movement::update_falling;

pub use decay::{is_slow_update_due, slow_update};
pub use park::generate_guest;

/// Ticks before a guest will consider the ride they just left again
const PREVIOUS_RIDE_TIMEOUT: u16 = 720;

/// Queuing guests shuffle forward at least this fast
const MIN_QUEUE_STEPS: u32 = 95;

/// Frame of the throw-up animation where the guest is actually sick
const THROW_UP_FRAME: u8 = 15;

/// Steps a guest takes this tick, before the accumulator
fn steps_to_take(peep: &Peep, guest: &GuestData) -> u32 {
    let queuing = matches!(peep.state, PeepState::Queuing(_));
    let mut steps = peep.energy as u32;
    if queuing && steps < MIN_QUEUE_STEPS {
        steps = MIN_QUEUE_STEPS;
    }
    if guest.flags.contains(GuestFlags::SLOW_WALK) && !queuing {
        steps /= 2;
    }
    if peep.is_action_walking() && peep.next.sloped {
        steps /= 2;
        if queuing {
            steps += steps / 2;
        }
    }
    steps
}

/// One tick of a guest
pub fn update_guest(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) -> Fate {
    if guest.previous_ride.is_some() {
        guest.previous_ride_timeout += 1;
        if guest.previous_ride_timeout >= PREVIOUS_RIDE_TIMEOUT {
            guest.previous_ride = None;
        }
    }
    guest.thoughts.update();

    let progress = peep.step_progress as u32 + steps_to_take(peep, guest);
    peep.step_progress = progress as u8;
    if progress <= 0xFF {
        return Fate::Alive;
    }

    let action_before = peep.action;
    let fate = step_state(peep, guest, ctx);
    if fate == Fate::Alive {
        check_throw_up(peep, guest, action_before, ctx);
    }
    fate
}

fn step_state(peep: &mut Peep, guest: &mut GuestData, ctx: &mut TickContext) -> Fate {
    match peep.state {
        PeepState::Falling => return update_falling(peep, false, &*ctx.park),
        PeepState::EnteringPark { admitted } => {
            return park::update_entering_park(peep, guest, ctx, admitted)
        }
        PeepState::LeavingPark => return park::update_leaving_park(peep, guest, ctx),
        PeepState::Walking => walking::update_walking(peep, guest, ctx),
        PeepState::Queuing(visit) => riding::update_queuing(peep, guest, visit, ctx),
        PeepState::QueuingFront(visit) => riding::update_queuing_front(peep, guest, visit, ctx),
        PeepState::EnteringRide { visit, sub } => {
            riding::update_entering_ride(peep, guest, visit, sub, ctx)
        }
        PeepState::OnRide(visit) => riding::update_on_ride(peep, visit, ctx),
        PeepState::LeavingRide { visit, sub } => {
            riding::update_leaving_ride(peep, guest, visit, sub, ctx)
        }
        PeepState::Sitting {
            sub,
            seat,
            time_left,
        } => leisure::update_sitting(peep, guest, sub, seat, time_left, ctx),
        PeepState::Buying { ride, resolved } => {
            purchase::update_buying(peep, guest, ctx, ride, resolved)
        }
        PeepState::Watching { .. } => leisure::update_watching(peep, guest, ctx),
        PeepState::UsingBin { sub, slot } => leisure::update_using_bin(peep, guest, sub, slot, ctx),
        state => {
            tracing::warn!("Guest {:?} in staff state {:?}", ctx.handle, state);
            peep.set_state(PeepState::Falling);
        }
    }
    Fate::Alive
}

/// Apply the effect of being sick once the animation reaches that frame
fn check_throw_up(peep: &Peep, guest: &mut GuestData, before: PeepAction, ctx: &mut TickContext) {
    let PeepAction::Animation {
        kind: ActionKind::ThrowUp,
        frame: THROW_UP_FRAME,
    } = peep.action
    else {
        return;
    };
    if before == peep.action {
        return;
    }

    let needs = &mut guest.needs;
    needs.hunger /= 2;
    needs.nausea_target /= 2;
    needs.nausea = needs.nausea.saturating_sub(30);

    let kind = if ctx.handle.index() & 1 != 0 {
        LitterKind::VomitAlt
    } else {
        LitterKind::Vomit
    };
    ctx.park.place_litter(Litter {
        loc: peep.position,
        direction: peep.direction,
        kind,
    });
    tracing::trace!("Guest {:?} threw up", ctx.handle);
}
