//! Integration tests for hiring staff and mechanics answering rides
//!
//! These tests cover:
//! - Staff hiring limits, costumes and firing
//! - Patrol areas feeding the per-type aggregate
//! - A mechanic walking to a broken ride and fixing it

use park_agents::core::types::{RideId, TileCoords};
use park_agents::core::{ScenarioRng, SimError, SimulationConfig};
use park_agents::ecs::patrol::PatrolArea;
use park_agents::ecs::SimulationWorld;
use park_agents::entity::{PeepState, StaffType};
use park_agents::park::rides::{BreakdownReason, MechanicStatus};
use park_agents::park::{RideEconomy, SandboxPark};
use park_agents::simulation::{run_simulation_tick, SimulationEvent};
use rand::SeedableRng;

// ============================================================================
// Helpers
// ============================================================================

fn world_with(config: SimulationConfig) -> SimulationWorld {
    SimulationWorld::new(config, ScenarioRng::seed_from_u64(3)).unwrap()
}

fn gate(park: &SandboxPark) -> park_agents::core::types::CoordsXYZ {
    park.inside_entrance().unwrap()
}

// ============================================================================
// Hiring
// ============================================================================

#[test]
fn test_staff_limit_is_enforced() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig {
        max_staff: 2,
        ..SimulationConfig::default()
    });

    world.hire_staff(StaffType::Handyman, None, gate(&park)).unwrap();
    world.hire_staff(StaffType::Security, None, gate(&park)).unwrap();
    let third = world.hire_staff(StaffType::Mechanic, None, gate(&park));
    assert!(matches!(third, Err(SimError::StaffLimitReached(2))));
    assert_eq!(world.staff_count(), 2);
}

#[test]
fn test_hired_staff_start_falling() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    let handle = world.hire_staff(StaffType::Handyman, None, gate(&park)).unwrap();
    let agent = world.resolve(handle).unwrap();
    assert_eq!(agent.peep.state, PeepState::Falling);
    assert_eq!(agent.staff().map(|s| s.staff_type), Some(StaffType::Handyman));
}

#[test]
fn test_entertainer_costume_is_validated() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());

    let bad = world.hire_staff(StaffType::Entertainer, Some(200), gate(&park));
    assert!(matches!(bad, Err(SimError::InvalidCostume(200))));

    let handle = world
        .hire_staff(StaffType::Entertainer, Some(2), gate(&park))
        .unwrap();
    assert!(world.set_costume(handle, 4).is_ok());
    assert!(matches!(
        world.set_costume(handle, 99),
        Err(SimError::InvalidCostume(99))
    ));
}

#[test]
fn test_costume_only_fits_entertainers() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    let handle = world.hire_staff(StaffType::Security, None, gate(&park)).unwrap();

    let result = world.set_costume(handle, 1);
    assert!(matches!(
        result,
        Err(SimError::WrongStaffType {
            handle: h,
            expected: StaffType::Entertainer,
            found: StaffType::Security,
        }) if h == handle
    ));
    assert_eq!(world.resolve(handle).and_then(|a| a.staff()).map(|s| s.costume), Some(None));
}

#[test]
fn test_fired_staff_free_their_slot() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    let handle = world.hire_staff(StaffType::Mechanic, None, gate(&park)).unwrap();

    let staff = world.fire_staff(handle).unwrap();
    assert_eq!(staff.staff_type, StaffType::Mechanic);
    assert!(world.resolve(handle).is_none());
    assert!(matches!(
        world.fire_staff(handle),
        Err(SimError::InvalidHandle(_))
    ));
}

#[test]
fn test_patrol_areas_merge_per_type() {
    let park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    let a = world.hire_staff(StaffType::Handyman, None, gate(&park)).unwrap();
    let b = world.hire_staff(StaffType::Handyman, None, gate(&park)).unwrap();

    let mut north = PatrolArea::new();
    north.set_rect(TileCoords::new(0, 0), TileCoords::new(7, 7), true);
    let mut south = PatrolArea::new();
    south.set_rect(TileCoords::new(16, 16), TileCoords::new(23, 23), true);
    world.set_patrol_area(a, Some(north)).unwrap();
    world.set_patrol_area(b, Some(south)).unwrap();

    let merged = world.patrol_aggregate(StaffType::Handyman);
    assert!(merged.contains_tile(TileCoords::new(2, 2)));
    assert!(merged.contains_tile(TileCoords::new(20, 20)));
    assert!(!merged.contains_tile(TileCoords::new(12, 12)));
    assert!(world.patrol_aggregate(StaffType::Mechanic).is_empty());

    world.fire_staff(a).unwrap();
    let merged = world.patrol_aggregate(StaffType::Handyman);
    assert!(!merged.contains_tile(TileCoords::new(2, 2)));
    assert!(merged.contains_tile(TileCoords::new(20, 20)));
}

// ============================================================================
// Mechanics
// ============================================================================

#[test]
fn test_mechanic_fixes_broken_ride() {
    let mut park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    let mechanic = world.hire_staff(StaffType::Mechanic, None, gate(&park)).unwrap();

    let ride = RideId(1);
    park.break_down(ride, BreakdownReason::SafetyCutOut);
    assert!(park.ride(ride).unwrap().is_broken());

    let mut events = Vec::new();
    for _ in 0..30_000 {
        park.advance(world.current_tick);
        events.extend(run_simulation_tick(&mut world, &mut park));
        if events.contains(&SimulationEvent::RideFixed { mechanic, ride }) {
            break;
        }
    }

    assert!(events.contains(&SimulationEvent::MechanicDispatched {
        mechanic,
        ride,
        inspection: false,
    }));
    assert!(events.contains(&SimulationEvent::RideFixed { mechanic, ride }));
    let info = park.ride(ride).unwrap();
    assert!(!info.is_broken());
    assert_ne!(info.mechanic_status, MechanicStatus::Calling);
    let stats = world.resolve(mechanic).and_then(|a| a.staff()).map(|s| s.stats);
    assert_eq!(stats.map(|s| s.rides_fixed), Some(1));
}

#[test]
fn test_no_dispatch_without_mechanics() {
    let mut park = SandboxPark::generate(3);
    let mut world = world_with(SimulationConfig::default());
    world.hire_staff(StaffType::Handyman, None, gate(&park)).unwrap();
    park.break_down(RideId(0), BreakdownReason::BrakesFailure);

    let mut events = Vec::new();
    for _ in 0..200 {
        park.advance(world.current_tick);
        events.extend(run_simulation_tick(&mut world, &mut park));
    }
    assert!(!events
        .iter()
        .any(|e| matches!(e, SimulationEvent::MechanicDispatched { .. })));
    assert_eq!(
        park.ride(RideId(0)).map(|r| r.mechanic_status),
        Some(MechanicStatus::Calling)
    );
}
