//! Staff behaviour
//!
//! [`update_staff`] runs once per tick for every hired staff member. Staff
//! have no needs pass; they walk at a fixed energy and only run their state
//! step when the walking accumulator wraps.

pub mod duties;
pub mod fixing;
pub mod mechanic;
pub mod patrol;

use crate::entity::agent::{Peep, PeepState};
use crate::entity::staff::StaffData;
use crate::simulation::context::{Fate, TickContext};
use crate::simulation::movement::update_falling;

pub use mechanic::dispatch_mechanics;

fn steps_to_take(peep: &Peep) -> u32 {
    let mut steps = peep.energy as u32;
    if peep.is_action_walking() && peep.next.sloped {
        steps /= 2;
    }
    steps
}

/// One tick of a staff member
pub fn update_staff(peep: &mut Peep, staff: &mut StaffData, ctx: &mut TickContext) -> Fate {
    let steps = steps_to_take(peep);
    let progress = peep.step_progress as u32 + steps;
    peep.step_progress = progress as u8;
    if progress <= 0xFF {
        return Fate::Alive;
    }

    match peep.state {
        PeepState::Falling => return update_falling(peep, true, &*ctx.park),
        PeepState::Patrolling => patrol::update_patrolling(peep, staff, ctx),
        PeepState::Mowing { .. } => duties::update_mowing(peep, staff, ctx),
        PeepState::Sweeping { passes } => duties::update_sweeping(peep, staff, passes, ctx),
        PeepState::Watering { sub, target } => {
            duties::update_watering(peep, staff, sub, target, ctx)
        }
        PeepState::EmptyingBin { sub, slot } => {
            duties::update_emptying_bin(peep, staff, sub, slot, ctx)
        }
        PeepState::Answering { visit, sub } => {
            mechanic::update_answering(peep, staff, visit, sub, ctx)
        }
        PeepState::HeadingToInspection { visit, sub } => {
            mechanic::update_heading_to_inspection(peep, staff, visit, sub, ctx)
        }
        PeepState::Fixing { .. } | PeepState::Inspecting { .. } => {
            fixing::update_fixing(peep, staff, steps, ctx)
        }
        state => {
            tracing::warn!("Staff {:?} in guest state {:?}", ctx.handle, state);
            peep.set_state(PeepState::Falling);
        }
    }
    Fate::Alive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TileCoords;
    use crate::entity::staff::{StaffType, STAFF_ENERGY};
    use crate::simulation::fixture::Fixture;

    fn staff_peep(fx: &Fixture, state: PeepState) -> Peep {
        let mut peep = fx.walking_peep(TileCoords::new(6, 4));
        peep.energy = STAFF_ENERGY;
        peep.energy_target = STAFF_ENERGY;
        peep.set_state(state);
        peep
    }

    #[test]
    fn test_staff_step_waits_for_accumulator() {
        let mut fx = Fixture::new();
        let mut staff = StaffData::new(StaffType::Security, None, 0);
        let mut peep = staff_peep(&fx, PeepState::Falling);
        let mut ctx = fx.ctx();

        // 0x60 per tick: the third tick wraps
        update_staff(&mut peep, &mut staff, &mut ctx);
        update_staff(&mut peep, &mut staff, &mut ctx);
        assert_eq!(peep.state, PeepState::Falling);
        update_staff(&mut peep, &mut staff, &mut ctx);
        assert_eq!(peep.state, PeepState::Patrolling);
    }

    #[test]
    fn test_staff_in_guest_state_resets() {
        let mut fx = Fixture::new();
        let mut staff = StaffData::new(StaffType::Handyman, None, 0);
        let mut peep = staff_peep(&fx, PeepState::Walking);
        peep.step_progress = 0xF0;
        let mut ctx = fx.ctx();
        update_staff(&mut peep, &mut staff, &mut ctx);
        assert_eq!(peep.state, PeepState::Falling);
    }

    #[test]
    fn test_falling_staff_off_map_are_removed() {
        let mut fx = Fixture::new();
        let mut staff = StaffData::new(StaffType::Entertainer, None, 0);
        let mut peep = staff_peep(&fx, PeepState::Falling);
        peep.position.x = -100;
        peep.step_progress = 0xF0;
        let mut ctx = fx.ctx();
        assert_eq!(update_staff(&mut peep, &mut staff, &mut ctx), Fate::Remove);
    }
}
