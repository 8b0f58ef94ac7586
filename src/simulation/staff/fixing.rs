//! Fixing and inspecting a ride once the mechanic is on the platform
//!
//! Both jobs walk through [`FixPhase`] in order. Which phases apply depends
//! on the breakdown: a stuck restraint is fixed at the broken car, failed
//! brakes at the station start and an inspection checks both ends of the
//! platform. Several phases can complete in one update.

use tracing::info;

use crate::core::types::{direction_from_to, CoordsXY, DIRECTION_OFFSETS};
use crate::ecs::pool::Handle;
use crate::entity::agent::{ActionKind, FixPhase, Peep, PeepState, RideVisit};
use crate::entity::staff::StaffData;
use crate::park::notify::Notification;
use crate::park::rides::{BreakdownReason, MechanicStatus, RideFlags, RideInfo, StationInfo};
use crate::simulation::context::TickContext;
use crate::simulation::movement::{update_action, ActionStep};
use crate::simulation::staff::mechanic::station_door;
use crate::simulation::tick::SimulationEvent;

const fn phases(list: &[FixPhase]) -> u16 {
    let mut mask = 0;
    let mut i = 0;
    while i < list.len() {
        mask |= 1 << (list[i] as u8);
        i += 1;
    }
    mask
}

/// Check both ends of the station, then leave
pub const STATION_PHASES: u16 = phases(&[
    FixPhase::MoveToStationEnd,
    FixPhase::FixStationEnd,
    FixPhase::MoveToStationStart,
    FixPhase::FixStationStart,
    FixPhase::MoveToStationExit,
    FixPhase::FinishFixOrInspect,
    FixPhase::LeaveByEntranceExit,
]);

const BRAKE_PHASES: u16 = phases(&[
    FixPhase::MoveToStationStart,
    FixPhase::FixStationBrakes,
    FixPhase::MoveToStationExit,
    FixPhase::FinishFixOrInspect,
    FixPhase::LeaveByEntranceExit,
]);

const fn vehicle_phases(fix: FixPhase) -> u16 {
    phases(&[
        FixPhase::MoveToBrokenDownVehicle,
        fix,
        FixPhase::MoveToStationExit,
        FixPhase::FinishFixOrInspect,
        FixPhase::LeaveByEntranceExit,
    ])
}

/// Phases a mechanic goes through for a breakdown, or for an inspection
/// when `reason` is `None`
pub fn phase_mask(reason: Option<BreakdownReason>) -> u16 {
    match reason {
        None | Some(BreakdownReason::SafetyCutOut) | Some(BreakdownReason::ControlFailure) => {
            STATION_PHASES
        }
        Some(BreakdownReason::RestraintsStuckClosed) => {
            vehicle_phases(FixPhase::FixVehicleClosedRestraints)
        }
        Some(BreakdownReason::RestraintsStuckOpen) => {
            vehicle_phases(FixPhase::FixVehicleOpenRestraints)
        }
        Some(BreakdownReason::DoorsStuckClosed) => vehicle_phases(FixPhase::FixVehicleClosedDoors),
        Some(BreakdownReason::DoorsStuckOpen) => vehicle_phases(FixPhase::FixVehicleOpenDoors),
        Some(BreakdownReason::VehicleMalfunction) => vehicle_phases(FixPhase::FixVehicleMalfunction),
        Some(BreakdownReason::BrakesFailure) => BRAKE_PHASES,
    }
}

/// Where a mechanic stands beside each end of the platform
const STATION_FIXING_OFFSETS: [CoordsXY; 4] = [
    CoordsXY::new(-12, 0),
    CoordsXY::new(0, 12),
    CoordsXY::new(12, 0),
    CoordsXY::new(0, -12),
];

/// Distance behind a broken car the mechanic works from
const VEHICLE_STANDOFF: i32 = 12;

const FIX_VEHICLE_FRAME: u8 = 0x25;
const FIX_VEHICLE_ALT_FRAME: u8 = 0x50;
const FIX_MALFUNCTION_FRAME: u8 = 0x65;
const FIX_BRAKES_FRAME: u8 = 0x28;

/// Reliability an inspection can restore, out of the missing percentage
fn inspection_gain(reliability: u8, roll: u32) -> u32 {
    let missing = 100u32.saturating_sub(reliability as u32);
    ((missing / 4) * (roll & 0xFF)) >> 8
}

/// Run the current fix or inspection phase and as many following ones as
/// complete straight away
pub fn update_fixing(peep: &mut Peep, staff: &mut StaffData, steps: u32, ctx: &mut TickContext) {
    let (visit, mut phase, mut inspecting) = match peep.state {
        PeepState::Fixing { visit, phase } => (visit, phase, false),
        PeepState::Inspecting { visit, phase } => (visit, phase, true),
        _ => return,
    };
    let Some(ride) = ctx.park.ride(visit.ride).cloned() else {
        peep.set_state(PeepState::Falling);
        return;
    };
    if inspecting && ride.is_broken() {
        // The ride broke down mid-inspection, fix it instead
        inspecting = false;
    }
    let mask = if inspecting {
        phase_mask(None)
    } else {
        phase_mask(ride.breakdown_reason)
    };
    let Some(station) = ride.station(visit.station).copied() else {
        peep.set_state(PeepState::Falling);
        return;
    };

    let mut entering = false;
    loop {
        let job = Job {
            ride: &ride,
            station: &station,
            visit,
            inspecting,
            entering,
        };
        let complete = run_phase(peep, staff, &job, phase, steps, ctx);
        if peep.state == PeepState::Falling {
            return;
        }
        if !complete {
            break;
        }
        match phase.next_in(mask) {
            Some(next) => phase = next,
            None => {
                peep.set_state(PeepState::Falling);
                return;
            }
        }
        entering = true;
    }

    peep.set_state(if inspecting {
        PeepState::Inspecting { visit, phase }
    } else {
        PeepState::Fixing { visit, phase }
    });
}

struct Job<'a> {
    ride: &'a RideInfo,
    station: &'a StationInfo,
    visit: RideVisit,
    inspecting: bool,
    /// The phase was reached during this update and needs setting up
    entering: bool,
}

impl Job<'_> {
    fn single_piece(&self) -> bool {
        self.ride.flags.contains(RideFlags::SINGLE_PIECE_STATION)
    }

    /// Direction from the station door onto the platform
    fn inward(&self) -> usize {
        let platform = self.station.start.xy().to_tile_centre();
        match station_door(self.station) {
            Some(door) => direction_from_to(door.xy().to_tile_centre(), platform) as usize,
            None => self.station.direction as usize & 3,
        }
    }
}

fn run_phase(
    peep: &mut Peep,
    staff: &mut StaffData,
    job: &Job,
    phase: FixPhase,
    steps: u32,
    ctx: &mut TickContext,
) -> bool {
    match phase {
        FixPhase::EnterStation => {
            peep.next.sloped = false;
            ctx.park
                .set_mechanic_status(job.visit.ride, MechanicStatus::Fixing, ctx.handle);
            true
        }
        FixPhase::MoveToBrokenDownVehicle => {
            if job.entering {
                let Some(car) = ctx.park.broken_vehicle_location(job.visit.ride) else {
                    return true;
                };
                let offset = DIRECTION_OFFSETS[job.station.direction as usize & 3];
                let stand = car.xy().offset(-offset.x * VEHICLE_STANDOFF, -offset.y * VEHICLE_STANDOFF);
                peep.set_destination(stand, 2);
            }
            update_action(peep) == ActionStep::Arrived
        }
        FixPhase::FixVehicleClosedRestraints
        | FixPhase::FixVehicleClosedDoors
        | FixPhase::FixVehicleOpenRestraints
        | FixPhase::FixVehicleOpenDoors => {
            if job.entering {
                peep.start_action(if ctx.rand() & 1 != 0 {
                    ActionKind::StaffFix2
                } else {
                    ActionKind::StaffFix
                });
            }
            work_on_vehicle(peep, job, ctx, |kind| {
                if kind == ActionKind::StaffFix {
                    FIX_VEHICLE_FRAME
                } else {
                    FIX_VEHICLE_ALT_FRAME
                }
            })
        }
        FixPhase::FixVehicleMalfunction => {
            if job.entering {
                peep.start_action(ActionKind::StaffFix3);
            }
            work_on_vehicle(peep, job, ctx, |_| FIX_MALFUNCTION_FRAME)
        }
        FixPhase::MoveToStationEnd => {
            if job.entering {
                if job.single_piece() {
                    return true;
                }
                let offset = STATION_FIXING_OFFSETS[job.station.direction as usize & 3];
                let end = job.station.end.xy().to_tile_centre();
                stand_beside(peep, end, offset);
            }
            update_action(peep) == ActionStep::Arrived
        }
        FixPhase::FixStationEnd => {
            if job.entering {
                peep.start_action(ActionKind::StaffCheckboard);
            }
            play_out(peep)
        }
        FixPhase::MoveToStationStart => {
            if job.entering {
                if job.single_piece() {
                    return true;
                }
                let offset = STATION_FIXING_OFFSETS[job.station.direction as usize & 3];
                let start = job.station.start.xy().to_tile_centre();
                stand_beside(peep, start, CoordsXY::new(-offset.x, -offset.y));
            }
            update_action(peep) == ActionStep::Arrived
        }
        FixPhase::FixStationStart => {
            if job.entering {
                if job.single_piece() {
                    return true;
                }
                peep.start_action(ActionKind::StaffFix);
            }
            play_out(peep)
        }
        FixPhase::FixStationBrakes => {
            if job.entering {
                peep.start_action(ActionKind::StaffFixGround);
            }
            if peep.is_action_walking() {
                return true;
            }
            update_action(peep);
            if peep.action_frame() == Some(FIX_BRAKES_FRAME) {
                ctx.park.set_mechanic_status(
                    job.visit.ride,
                    MechanicStatus::HasFixedStationBrakes,
                    ctx.handle,
                );
            }
            false
        }
        FixPhase::MoveToStationExit => {
            if job.entering {
                let Some(door) = station_door(job.station) else {
                    return true;
                };
                let inward = DIRECTION_OFFSETS[job.inward()];
                let stand = door.xy().to_tile_centre().offset(inward.x * 20, inward.y * 20);
                peep.set_destination(stand, 2);
            }
            update_action(peep) == ActionStep::Arrived
        }
        FixPhase::FinishFixOrInspect => finish(peep, staff, job, steps, ctx),
        FixPhase::LeaveByEntranceExit => {
            if job.entering {
                let Some(door) = station_door(job.station) else {
                    peep.set_state(PeepState::Falling);
                    return false;
                };
                let mut stand = door.xy().to_tile_centre();
                if ctx.park.path_at(door).is_none() {
                    let inward = DIRECTION_OFFSETS[job.inward()];
                    stand = stand.offset(inward.x * 19, inward.y * 19);
                }
                peep.set_destination(stand, 2);
            }
            update_action(peep) == ActionStep::Arrived
        }
    }
}

/// Aim for `centre + offset`, keeping the current destination on the axis
/// the offset leaves alone
fn stand_beside(peep: &mut Peep, centre: CoordsXY, offset: CoordsXY) {
    let current = peep.destination.loc;
    let x = if offset.x == 0 { current.x } else { centre.x + offset.x };
    let y = if offset.y == 0 { current.y } else { centre.y + offset.y };
    peep.set_destination(CoordsXY::new(x, y), 2);
}

/// Run an animation to its end
fn play_out(peep: &mut Peep) -> bool {
    if peep.is_action_walking() {
        return true;
    }
    update_action(peep);
    false
}

/// Play the repair animation, mending the car at `frame`
fn work_on_vehicle(
    peep: &mut Peep,
    job: &Job,
    ctx: &mut TickContext,
    frame: impl Fn(ActionKind) -> u8,
) -> bool {
    if peep.is_action_walking() {
        return true;
    }
    update_action(peep);
    let (Some(kind), Some(current)) = (peep.current_action(), peep.action_frame()) else {
        return false;
    };
    if current == frame(kind) && ctx.park.broken_vehicle_location(job.visit.ride).is_some() {
        ctx.park.fix_vehicle(job.visit.ride);
    }
    false
}

fn finish(peep: &mut Peep, staff: &mut StaffData, job: &Job, steps: u32, ctx: &mut TickContext) -> bool {
    let ride = job.visit.ride;
    if job.inspecting {
        let roll = ctx.rand();
        ctx.park
            .mark_inspected(ride, inspection_gain(job.ride.reliability_percentage, roll));
        ctx.park
            .set_mechanic_status(ride, MechanicStatus::Undefined, Handle::NULL);
        staff.stats.rides_inspected = staff.stats.rides_inspected.saturating_add(1);
        ctx.emit(SimulationEvent::RideInspected {
            mechanic: ctx.handle,
            ride,
        });
        return true;
    }

    if job.entering {
        peep.start_action(ActionKind::StaffAnswerCall2);
    }
    if !peep.is_action_walking() {
        update_action(peep);
        return false;
    }

    ctx.park.fix_breakdown(ride, steps);
    ctx.park
        .set_mechanic_status(ride, MechanicStatus::Undefined, Handle::NULL);
    staff.stats.rides_fixed = staff.stats.rides_fixed.saturating_add(1);
    ctx.post(Notification::RideFixed {
        ride,
        mechanic: ctx.handle,
    });
    ctx.emit(SimulationEvent::RideFixed {
        mechanic: ctx.handle,
        ride,
    });
    info!("Mechanic {:?} fixed {:?}", ctx.handle, ride);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RideId, RideTypeId, StationIndex, TileCoords};
    use crate::entity::staff::StaffType;
    use crate::park::rides::RideEconomy;
    use crate::park::sandbox::{ride_plot, SandboxPark};
    use crate::simulation::fixture::Fixture;

    const RIDE: RideId = RideId(1);

    fn fixture_with_broken_ride(reason: BreakdownReason) -> Fixture {
        let mut fx = Fixture::new();
        let mut park = SandboxPark::new(TileCoords::new(0, 0), TileCoords::new(39, 39));
        park.add_path_line(TileCoords::new(1, 4), TileCoords::new(30, 4));
        park.add_ride_plot(ride_plot(RIDE, RideTypeId(1), 10, 4), 10, 4);
        park.break_down(RIDE, reason);
        park.set_mechanic_status(RIDE, MechanicStatus::Heading, fx.handle);
        fx.park = park;
        fx
    }

    fn mechanic_on_platform(fx: &Fixture, visit: RideVisit) -> Peep {
        let mut peep = fx.walking_peep(TileCoords::new(10, 8));
        peep.set_state(PeepState::Fixing {
            visit,
            phase: FixPhase::EnterStation,
        });
        peep
    }

    /// Run the fix to completion, returning every phase seen
    fn run_fix(fx: &mut Fixture, peep: &mut Peep, staff: &mut StaffData) -> Vec<FixPhase> {
        let mut seen = Vec::new();
        for _ in 0..5000 {
            let phase = match peep.state {
                PeepState::Fixing { phase, .. } | PeepState::Inspecting { phase, .. } => phase,
                _ => break,
            };
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
            let mut ctx = fx.ctx();
            update_fixing(peep, staff, 20, &mut ctx);
        }
        seen
    }

    #[test]
    fn test_phase_masks() {
        let closed = phase_mask(Some(BreakdownReason::RestraintsStuckClosed));
        assert_eq!(closed, (1 << 1) | (1 << 2) | (1 << 12) | (1 << 13) | (1 << 14));
        let doors = phase_mask(Some(BreakdownReason::DoorsStuckOpen));
        assert_eq!(doors, (1 << 1) | (1 << 5) | (1 << 12) | (1 << 13) | (1 << 14));
        assert_eq!(phase_mask(Some(BreakdownReason::ControlFailure)), phase_mask(None));
        assert_eq!(
            phase_mask(Some(BreakdownReason::BrakesFailure)),
            (1 << 9) | (1 << 11) | (1 << 12) | (1 << 13) | (1 << 14)
        );
    }

    #[test]
    fn test_inspection_gain_scales_with_missing_reliability() {
        assert_eq!(inspection_gain(100, 0xFF), 0);
        assert_eq!(inspection_gain(60, 0x80), 5);
        assert_eq!(inspection_gain(0, 0xFF), 24);
    }

    #[test]
    fn test_brake_failure_walks_brake_phases() {
        let mut fx = fixture_with_broken_ride(BreakdownReason::BrakesFailure);
        let visit = RideVisit::new(RIDE, StationIndex(0));
        let mut staff = StaffData::new(StaffType::Mechanic, None, 0);
        let mut peep = mechanic_on_platform(&fx, visit);

        let seen = run_fix(&mut fx, &mut peep, &mut staff);

        assert_eq!(seen.first(), Some(&FixPhase::EnterStation));
        let after_entry: u16 = seen[1..].iter().fold(0, |mask, phase| mask | phase.bit());
        assert_eq!(after_entry, phase_mask(Some(BreakdownReason::BrakesFailure)));
        assert_eq!(peep.state, PeepState::Falling);

        let ride = fx.park.ride(RIDE).unwrap();
        assert!(!ride.is_broken());
        assert_eq!(ride.mechanic_status, MechanicStatus::Undefined);
        assert_eq!(staff.stats.rides_fixed, 1);
        assert!(fx
            .events
            .iter()
            .any(|e| matches!(e, SimulationEvent::RideFixed { .. })));
    }

    #[test]
    fn test_stuck_restraints_fixed_at_the_car() {
        let mut fx = fixture_with_broken_ride(BreakdownReason::RestraintsStuckClosed);
        assert!(fx.park.broken_vehicle_location(RIDE).is_some());
        let visit = RideVisit::new(RIDE, StationIndex(0));
        let mut staff = StaffData::new(StaffType::Mechanic, None, 0);
        let mut peep = mechanic_on_platform(&fx, visit);

        let seen = run_fix(&mut fx, &mut peep, &mut staff);

        assert!(seen.contains(&FixPhase::MoveToBrokenDownVehicle));
        assert!(seen.contains(&FixPhase::FixVehicleClosedRestraints));
        assert!(!seen.contains(&FixPhase::FixStationEnd));
        assert!(fx.park.broken_vehicle_location(RIDE).is_none());
        assert!(!fx.park.ride(RIDE).unwrap().is_broken());
    }

    #[test]
    fn test_inspection_clears_due_flag() {
        let mut fx = Fixture::new();
        let mut park = SandboxPark::new(TileCoords::new(0, 0), TileCoords::new(39, 39));
        park.add_path_line(TileCoords::new(1, 4), TileCoords::new(30, 4));
        park.add_ride_plot(ride_plot(RIDE, RideTypeId(1), 10, 4), 10, 4);
        park.request_inspection(RIDE);
        park.set_mechanic_status(RIDE, MechanicStatus::Heading, fx.handle);
        fx.park = park;

        let visit = RideVisit::new(RIDE, StationIndex(0));
        let mut staff = StaffData::new(StaffType::Mechanic, None, 0);
        let mut peep = fx.walking_peep(TileCoords::new(10, 8));
        peep.set_state(PeepState::Inspecting {
            visit,
            phase: FixPhase::EnterStation,
        });

        let seen = run_fix(&mut fx, &mut peep, &mut staff);

        assert!(seen.contains(&FixPhase::FixStationEnd));
        assert!(seen.contains(&FixPhase::FixStationStart));
        let ride = fx.park.ride(RIDE).unwrap();
        assert!(!ride.flags.contains(RideFlags::DUE_INSPECTION));
        assert_eq!(staff.stats.rides_inspected, 1);
    }
}
