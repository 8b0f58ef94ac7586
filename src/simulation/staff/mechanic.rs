//! Mechanic dispatch and the walk to a broken or due ride
//!
//! Rides that need a mechanic sit in [`MechanicStatus::Calling`] until
//! [`dispatch_mechanics`] assigns the closest free one. The mechanic then
//! walks to the station exit (or entrance), steps onto the platform and
//! hands over to the fixing phases.

use tracing::{debug, warn};

use crate::core::types::{direction_from_to, CoordsXY, CoordsXYZ, RideId, StationIndex};
use crate::ecs::pool::{EntityPool, Handle};
use crate::entity::agent::{ActionKind, Agent, CallSubState, FixPhase, Peep, PeepState, RideVisit};
use crate::entity::staff::{StaffData, StaffOrders};
use crate::park::notify::Notification;
use crate::park::pathing::PathGoal;
use crate::park::rides::{MechanicStatus, RideFlags, RideInfo, StationInfo};
use crate::park::ParkServices;
use crate::simulation::context::TickContext;
use crate::simulation::movement::{
    check_for_path, perform_next_action, update_action, ActionStep, ALL_DIRECTIONS,
};
use crate::simulation::staff::patrol::{is_location_in_patrol, step_toward_chosen_tile};
use crate::simulation::tick::SimulationEvent;

/// Tile a mechanic walks to before stepping onto the platform
pub fn station_door(station: &StationInfo) -> Option<CoordsXYZ> {
    station.exit.or(station.entrance)
}

/// Whether the mechanic still holds the ride's call
fn holds_call(ride: &RideInfo, handle: Handle) -> bool {
    ride.mechanic_status == MechanicStatus::Heading && ride.mechanic == handle
}

pub fn update_answering(
    peep: &mut Peep,
    staff: &mut StaffData,
    visit: RideVisit,
    sub: CallSubState,
    ctx: &mut TickContext,
) {
    let holds = ctx
        .park
        .ride(visit.ride)
        .is_some_and(|ride| holds_call(ride, ctx.handle));
    if !holds {
        warn!("Mechanic {:?} lost the call to {:?}", ctx.handle, visit.ride);
        peep.set_state(PeepState::Falling);
        return;
    }

    match sub {
        CallSubState::Acknowledge => {
            if peep.is_action_walking() {
                staff.mechanic_time_since_call = 0;
                peep.set_state(PeepState::Answering {
                    visit,
                    sub: CallSubState::Heading,
                });
            } else {
                update_action(peep);
            }
        }
        CallSubState::Heading => head_to_ride(peep, staff, visit, false, ctx),
        CallSubState::EnterPlatform => enter_platform(peep, visit, false),
    }
}

pub fn update_heading_to_inspection(
    peep: &mut Peep,
    staff: &mut StaffData,
    visit: RideVisit,
    sub: CallSubState,
    ctx: &mut TickContext,
) {
    let Some(ride) = ctx.park.ride(visit.ride) else {
        peep.set_state(PeepState::Falling);
        return;
    };
    let has_exit = ride.station(visit.station).is_some_and(|s| s.exit.is_some());
    if !has_exit {
        // Nothing to inspect without a way onto the platform
        ctx.park.mark_inspected(visit.ride, 0);
        peep.set_state(PeepState::Falling);
        return;
    }
    if !holds_call(ride, ctx.handle) || !ride.flags.contains(RideFlags::DUE_INSPECTION) {
        peep.set_state(PeepState::Falling);
        return;
    }

    match sub {
        CallSubState::Acknowledge | CallSubState::Heading => {
            head_to_ride(peep, staff, visit, true, ctx)
        }
        CallSubState::EnterPlatform => enter_platform(peep, visit, true),
    }
}

fn calling_state(visit: RideVisit, sub: CallSubState, inspection: bool) -> PeepState {
    if inspection {
        PeepState::HeadingToInspection { visit, sub }
    } else {
        PeepState::Answering { visit, sub }
    }
}

/// Walk toward the station door; once there aim for the platform
fn head_to_ride(
    peep: &mut Peep,
    staff: &mut StaffData,
    visit: RideVisit,
    inspection: bool,
    ctx: &mut TickContext,
) {
    staff.mechanic_time_since_call = staff.mechanic_time_since_call.saturating_add(1);
    if staff.mechanic_time_since_call > ctx.config.mechanic_call_timeout {
        give_up_call(peep, visit, inspection, ctx);
        return;
    }
    if !check_for_path(peep, &*ctx.park) {
        return;
    }

    let station = ctx
        .park
        .ride(visit.ride)
        .and_then(|ride| ride.station(visit.station))
        .copied();
    let Some((station, door)) = station.and_then(|s| station_door(&s).map(|door| (s, door))) else {
        peep.set_state(PeepState::Falling);
        return;
    };

    let outcome = perform_next_action(
        peep,
        PathGoal::Location(door),
        ALL_DIRECTIONS,
        true,
        ctx.park,
        ctx.rng,
    );
    if !outcome.reached() {
        return;
    }

    if peep.next.loc.tile() == door.tile() {
        let platform = station.start.xy().to_tile_centre();
        peep.direction = direction_from_to(peep.position.xy(), platform);
        peep.position.z = station.start.z;
        peep.set_destination(platform, 2);
        peep.set_state(calling_state(visit, CallSubState::EnterPlatform, inspection));
        enter_platform(peep, visit, inspection);
    } else if outcome.next.is_none() {
        step_toward_chosen_tile(peep, staff, ctx);
    }
}

fn enter_platform(peep: &mut Peep, visit: RideVisit, inspection: bool) {
    if update_action(peep) != ActionStep::Arrived {
        return;
    }
    let phase = FixPhase::EnterStation;
    peep.set_state(if inspection {
        PeepState::Inspecting { visit, phase }
    } else {
        PeepState::Fixing { visit, phase }
    });
}

/// The call took too long; release the ride so another mechanic can go
fn give_up_call(peep: &mut Peep, visit: RideVisit, inspection: bool, ctx: &mut TickContext) {
    ctx.park
        .set_mechanic_status(visit.ride, MechanicStatus::Calling, Handle::NULL);
    if !inspection {
        ctx.post(Notification::MechanicNotAnswering { ride: visit.ride });
    }
    warn!("Mechanic {:?} gave up on {:?}", ctx.handle, visit.ride);
    ctx.emit(SimulationEvent::MechanicCallTimedOut {
        mechanic: ctx.handle,
        ride: visit.ride,
    });
    peep.set_state(PeepState::Falling);
}

/// Whether the mechanic recorded on a ride is actually working on it
fn mechanic_on_ride(agents: &EntityPool<Agent>, ride: &RideInfo) -> bool {
    let Some(agent) = agents.get(ride.mechanic) else {
        return false;
    };
    let status = ride.mechanic_status;
    match agent.peep.state {
        PeepState::Answering { visit, .. } | PeepState::HeadingToInspection { visit, .. } => {
            status == MechanicStatus::Heading && visit.ride == ride.id
        }
        PeepState::Fixing { visit, .. } | PeepState::Inspecting { visit, .. } => {
            matches!(
                status,
                MechanicStatus::Fixing | MechanicStatus::HasFixedStationBrakes
            ) && visit.ride == ride.id
        }
        _ => false,
    }
}

/// Assign mechanics to rides that need one and re-call those whose
/// mechanic wandered off
pub fn dispatch_mechanics(
    agents: &mut EntityPool<Agent>,
    park: &mut dyn ParkServices,
    events: &mut Vec<SimulationEvent>,
) {
    for id in park.ride_ids() {
        let Some(ride) = park.ride(id) else {
            continue;
        };
        let broken = ride.is_broken();
        let due = ride.flags.contains(RideFlags::DUE_INSPECTION);
        let status = ride.mechanic_status;
        let attended = mechanic_on_ride(agents, ride);
        match status {
            MechanicStatus::Undefined => {
                if broken {
                    park.set_mechanic_status(id, MechanicStatus::Calling, Handle::NULL);
                }
            }
            MechanicStatus::Calling => {
                if !broken && !due {
                    park.set_mechanic_status(id, MechanicStatus::Undefined, Handle::NULL);
                } else {
                    call_closest_mechanic(agents, park, id, !broken, events);
                }
            }
            MechanicStatus::Heading
            | MechanicStatus::Fixing
            | MechanicStatus::HasFixedStationBrakes => {
                if !attended {
                    park.set_mechanic_status(id, MechanicStatus::Calling, Handle::NULL);
                    call_closest_mechanic(agents, park, id, !broken, events);
                }
            }
        }
    }
}

/// Station a dispatched mechanic goes to and its location for distances
fn dispatch_station(ride: &RideInfo) -> Option<(RideVisit, CoordsXY)> {
    ride.stations.iter().enumerate().find_map(|(index, station)| {
        let door = station.exit.or(station.entrance)?;
        let visit = RideVisit::new(ride.id, StationIndex(index as u8));
        Some((visit, door.xy().to_tile_centre()))
    })
}

/// Closest free mechanic, preferring one whose patrol covers the ride
pub fn find_closest_mechanic(
    agents: &EntityPool<Agent>,
    park: &dyn ParkServices,
    target: CoordsXY,
    for_inspection: bool,
) -> Option<Handle> {
    let order = if for_inspection {
        StaffOrders::INSPECT_RIDES
    } else {
        StaffOrders::FIX_RIDES
    };
    let candidates: Vec<(Handle, i32, bool)> = agents
        .iter()
        .filter_map(|(handle, agent)| {
            let staff = agent.staff()?;
            if !staff.is_mechanic()
                || !staff.orders.contains(order)
                || !agent.peep.state.is_available_for_call(for_inspection)
            {
                return None;
            }
            let distance = agent.peep.position.xy().manhattan(target);
            let covers = is_location_in_patrol(staff, target, park);
            Some((handle, distance, covers))
        })
        .collect();

    let closest = |covering_only: bool| {
        candidates
            .iter()
            .filter(|(_, _, covers)| !covering_only || *covers)
            .min_by_key(|(_, distance, _)| *distance)
            .map(|(handle, _, _)| *handle)
    };
    closest(true).or_else(|| closest(false))
}

fn call_closest_mechanic(
    agents: &mut EntityPool<Agent>,
    park: &mut dyn ParkServices,
    id: RideId,
    for_inspection: bool,
    events: &mut Vec<SimulationEvent>,
) {
    let Some((visit, target)) = park.ride(id).and_then(dispatch_station) else {
        return;
    };
    let Some(handle) = find_closest_mechanic(agents, &*park, target, for_inspection) else {
        return;
    };
    let Some(agent) = agents.get_mut(handle) else {
        return;
    };
    let Some(staff) = agent.staff_mut() else {
        return;
    };
    staff.mechanic_time_since_call = 0;

    let peep = &mut agent.peep;
    if for_inspection {
        peep.set_state(PeepState::HeadingToInspection {
            visit,
            sub: CallSubState::Heading,
        });
    } else {
        peep.set_state(PeepState::Answering {
            visit,
            sub: CallSubState::Acknowledge,
        });
        peep.start_action(ActionKind::StaffAnswerCall);
    }
    park.set_mechanic_status(id, MechanicStatus::Heading, handle);
    debug!(
        "Dispatched mechanic {:?} to {:?} (inspection: {})",
        handle, id, for_inspection
    );
    events.push(SimulationEvent::MechanicDispatched {
        mechanic: handle,
        ride: id,
        inspection: for_inspection,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RideTypeId, TileCoords};
    use crate::ecs::patrol::PatrolArea;
    use crate::entity::agent::AgentKind;
    use crate::entity::staff::{StaffType, STAFF_ENERGY};
    use crate::park::rides::{BreakdownReason, RideEconomy};
    use crate::park::sandbox::{ride_plot, SandboxPark};
    use crate::simulation::fixture::Fixture;

    const RIDE: RideId = RideId(1);

    fn park_with_ride() -> SandboxPark {
        let mut park = SandboxPark::new(TileCoords::new(0, 0), TileCoords::new(39, 39));
        park.add_path_line(TileCoords::new(1, 4), TileCoords::new(30, 4));
        park.add_ride_plot(ride_plot(RIDE, RideTypeId(1), 10, 4), 10, 4);
        park
    }

    fn mechanic_at(agents: &mut EntityPool<Agent>, tile: TileCoords) -> Handle {
        let staff = StaffData::new(StaffType::Mechanic, None, 0);
        let mut agent = Agent::new(tile.centre().with_z(0), PeepState::Patrolling, AgentKind::Staff(staff));
        agent.peep.energy = STAFF_ENERGY;
        agents.allocate(agent).unwrap()
    }

    #[test]
    fn test_dispatch_picks_closest_mechanic() {
        let mut park = park_with_ride();
        park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        let mut agents = EntityPool::with_capacity(8);
        let far = mechanic_at(&mut agents, TileCoords::new(25, 4));
        let near = mechanic_at(&mut agents, TileCoords::new(12, 4));
        let mut events = Vec::new();

        dispatch_mechanics(&mut agents, &mut park, &mut events);

        let ride = park.ride(RIDE).unwrap();
        assert_eq!(ride.mechanic_status, MechanicStatus::Heading);
        assert_eq!(ride.mechanic, near);
        assert!(matches!(
            agents.get(near).unwrap().peep.state,
            PeepState::Answering { sub: CallSubState::Acknowledge, .. }
        ));
        assert_eq!(agents.get(far).unwrap().peep.state, PeepState::Patrolling);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_dispatch_prefers_mechanic_patrolling_the_ride() {
        let mut park = park_with_ride();
        park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        let mut agents = EntityPool::with_capacity(8);
        let near = mechanic_at(&mut agents, TileCoords::new(13, 4));
        let patrolling = mechanic_at(&mut agents, TileCoords::new(25, 4));

        // Near mechanic patrols elsewhere, the far one covers the ride
        let mut elsewhere = PatrolArea::new();
        elsewhere.set_tile(TileCoords::new(30, 30), true);
        let mut covering = PatrolArea::new();
        covering.set_rect(TileCoords::new(8, 4), TileCoords::new(15, 11), true);
        agents.get_mut(near).unwrap().staff_mut().unwrap().patrol = Some(elsewhere);
        agents.get_mut(patrolling).unwrap().staff_mut().unwrap().patrol = Some(covering);

        let mut events = Vec::new();
        dispatch_mechanics(&mut agents, &mut park, &mut events);
        assert_eq!(park.ride(RIDE).unwrap().mechanic, patrolling);
    }

    #[test]
    fn test_dispatch_skips_mechanics_without_orders() {
        let mut park = park_with_ride();
        park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        let mut agents = EntityPool::with_capacity(8);
        let handle = mechanic_at(&mut agents, TileCoords::new(12, 4));
        agents
            .get_mut(handle)
            .unwrap()
            .staff_mut()
            .unwrap()
            .orders
            .remove(StaffOrders::FIX_RIDES);

        let mut events = Vec::new();
        dispatch_mechanics(&mut agents, &mut park, &mut events);
        assert_eq!(park.ride(RIDE).unwrap().mechanic_status, MechanicStatus::Calling);
        assert!(events.is_empty());
    }

    #[test]
    fn test_lost_mechanic_is_recalled() {
        let mut park = park_with_ride();
        park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        let mut agents = EntityPool::with_capacity(8);
        let handle = mechanic_at(&mut agents, TileCoords::new(12, 4));
        // Recorded as heading but actually patrolling
        park.set_mechanic_status(RIDE, MechanicStatus::Heading, handle);

        let mut events = Vec::new();
        dispatch_mechanics(&mut agents, &mut park, &mut events);
        assert!(matches!(
            agents.get(handle).unwrap().peep.state,
            PeepState::Answering { .. }
        ));
        assert_eq!(park.ride(RIDE).unwrap().mechanic, handle);
    }

    #[test]
    fn test_answering_call_times_out() {
        let mut fx = Fixture::new();
        fx.park = park_with_ride();
        fx.park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        fx.park
            .set_mechanic_status(RIDE, MechanicStatus::Heading, fx.handle);
        let visit = RideVisit::new(RIDE, StationIndex(0));
        let mut staff = StaffData::new(StaffType::Mechanic, None, 0);
        staff.mechanic_time_since_call = fx.config.mechanic_call_timeout;
        let mut peep = fx.walking_peep(TileCoords::new(2, 4));
        peep.set_state(PeepState::Answering {
            visit,
            sub: CallSubState::Heading,
        });

        {
            let mut ctx = fx.ctx();
            update_answering(&mut peep, &mut staff, visit, CallSubState::Heading, &mut ctx);
        }
        assert_eq!(peep.state, PeepState::Falling);
        let ride = fx.park.ride(RIDE).unwrap();
        assert_eq!(ride.mechanic_status, MechanicStatus::Calling);
        assert!(fx
            .park
            .notifications()
            .contains(&Notification::MechanicNotAnswering { ride: RIDE }));
        assert!(matches!(
            fx.events.last(),
            Some(SimulationEvent::MechanicCallTimedOut { .. })
        ));
    }

    #[test]
    fn test_answering_mechanic_reaches_platform() {
        let mut fx = Fixture::new();
        fx.park = park_with_ride();
        fx.park.break_down(RIDE, BreakdownReason::SafetyCutOut);
        fx.park
            .set_mechanic_status(RIDE, MechanicStatus::Heading, fx.handle);
        let visit = RideVisit::new(RIDE, StationIndex(0));
        let mut staff = StaffData::new(StaffType::Mechanic, None, 0);
        let mut peep = fx.walking_peep(TileCoords::new(5, 4));
        peep.set_state(PeepState::Answering {
            visit,
            sub: CallSubState::Heading,
        });

        for _ in 0..2000 {
            let PeepState::Answering { sub, .. } = peep.state else {
                break;
            };
            let mut ctx = fx.ctx();
            update_answering(&mut peep, &mut staff, visit, sub, &mut ctx);
        }
        assert_eq!(
            peep.state,
            PeepState::Fixing {
                visit,
                phase: FixPhase::EnterStation
            }
        );
        assert_eq!(peep.position.tile(), TileCoords::new(10, 8));
    }
}
