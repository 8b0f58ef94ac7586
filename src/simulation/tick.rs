//! Tick system - orchestrates simulation updates
//!
//! Each tick walks every agent in slot order. An agent is checked out of
//! the pool while its state machine runs so it can see and nudge the others
//! through the [`TickContext`]. Guests get their coarse needs pass on their
//! staggered slow-update tick first. Mechanic dispatch runs after the agent
//! pass every few ticks.

use serde::{Deserialize, Serialize};

use crate::core::types::{CoordsXYZ, Money, RideId};
use crate::ecs::pool::Handle;
use crate::ecs::world::SimulationWorld;
use crate::entity::agent::{Agent, AgentKind};
use crate::entity::items::ShopItem;
use crate::park::ParkServices;
use crate::simulation::context::{Fate, TickContext};
use crate::simulation::guest::{is_slow_update_due, slow_update, update_guest};
use crate::simulation::staff::{dispatch_mechanics, update_staff};

/// Events generated during a simulation tick
///
/// These are returned by [`run_simulation_tick`] for the host to log or
/// display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// Paid at the gate and walked in
    GuestAdmitted { guest: Handle },
    /// Could not afford the entrance fee
    GuestTurnedAway { guest: Handle },
    GuestLeftPark { guest: Handle },
    /// The guest is gone from the pool
    GuestRemoved { guest: Handle },
    ItemBought {
        guest: Handle,
        ride: RideId,
        item: ShopItem,
        price: Money,
    },
    JoinedQueue { guest: Handle, ride: RideId },
    RideEntered { guest: Handle, ride: RideId },
    RideExited { guest: Handle, ride: RideId },
    /// A security guard nearby stopped an angry guest
    VandalismStopped { guest: Handle, guard: Handle },
    PathVandalised { guest: Handle, at: CoordsXYZ },
    MechanicDispatched {
        mechanic: Handle,
        ride: RideId,
        inspection: bool,
    },
    MechanicCallTimedOut { mechanic: Handle, ride: RideId },
    RideFixed { mechanic: Handle, ride: RideId },
    RideInspected { mechanic: Handle, ride: RideId },
    /// A staff member fell off the map
    StaffRemoved { staff: Handle },
}

/// Run a single simulation tick
///
/// 1. Update every agent in slot order (guests: slow update when due, then
///    the per-tick update; staff: the per-tick update)
/// 2. Drop agents whose update removed them
/// 3. Dispatch mechanics every `mechanic_dispatch_interval` ticks
/// 4. Advance the tick counter
///
/// Returns the events that occurred during this tick.
pub fn run_simulation_tick(
    world: &mut SimulationWorld,
    park: &mut dyn ParkServices,
) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    for handle in world.agents.handles() {
        let Some(mut agent) = world.agents.take(handle) else {
            continue;
        };
        let fate = update_agent(&mut agent, handle, world, park, &mut events);
        match fate {
            Fate::Alive => {
                if let Err(err) = world.agents.restore(handle, agent) {
                    tracing::error!("Could not return {:?} to the pool: {}", handle, err);
                }
            }
            Fate::Remove => remove_agent(world, handle, agent, &mut events),
        }
    }

    let interval = world.config.mechanic_dispatch_interval.max(1);
    if world.current_tick % interval == 0 {
        dispatch_mechanics(&mut world.agents, park, &mut events);
    }

    world.current_tick += 1;
    events
}

fn update_agent(
    agent: &mut Agent,
    handle: Handle,
    world: &mut SimulationWorld,
    park: &mut dyn ParkServices,
    events: &mut Vec<SimulationEvent>,
) -> Fate {
    let mut ctx = TickContext {
        handle,
        tick: world.current_tick,
        rng: &mut world.rng,
        config: &world.config,
        agents: &mut world.agents,
        counters: &mut world.counters,
        park,
        events,
    };

    let Agent { peep, kind } = agent;
    match kind {
        AgentKind::Guest(guest) => {
            if is_slow_update_due(handle.index(), ctx.tick)
                && slow_update(peep, guest, handle.index(), &mut ctx) == Fate::Remove
            {
                return Fate::Remove;
            }
            update_guest(peep, guest, &mut ctx)
        }
        AgentKind::Staff(staff) => update_staff(peep, staff, &mut ctx),
    }
}

fn remove_agent(
    world: &mut SimulationWorld,
    handle: Handle,
    agent: Agent,
    events: &mut Vec<SimulationEvent>,
) {
    if let Err(err) = world.agents.release(handle) {
        tracing::warn!("Removing agent: {}", err);
    }
    match agent.kind {
        AgentKind::Guest(guest) => {
            if !guest.outside_park {
                world.counters.guests_in_park = world.counters.guests_in_park.saturating_sub(1);
            }
            tracing::debug!("Removed guest {:?}", handle);
            events.push(SimulationEvent::GuestRemoved { guest: handle });
        }
        AgentKind::Staff(staff) => {
            world.recompute_patrol_aggregate(staff.staff_type);
            tracing::warn!("Removed {:?} {:?}", staff.staff_type, handle);
            events.push(SimulationEvent::StaffRemoved { staff: handle });
        }
    }
}
