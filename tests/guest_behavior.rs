//! Integration tests for guests walking through a generated park
//!
//! These tests drive the full tick loop against the sandbox park:
//! - Admission at the park gate, with and without an entrance fee
//! - Guests turned away leaving the map
//! - Guests finding their way to rides
//! - Unhappy guests giving up on a long queue
//! - Guests on their way out always leaving the pool

use park_agents::core::types::{RideId, RideTypeId, StationIndex, TileCoords};
use park_agents::core::{ScenarioRng, SimulationConfig};
use park_agents::ecs::world::ParkCounters;
use park_agents::ecs::{EntityPool, Handle, SimulationWorld};
use park_agents::entity::needs::GuestNeeds;
use park_agents::entity::{Agent, GuestData, Peep, PeepState, RideVisit};
use park_agents::park::sandbox::ride_plot;
use park_agents::park::{RideEconomy, SandboxPark};
use park_agents::simulation::guest::riding::update_queuing;
use park_agents::simulation::movement::refresh_current_tile;
use park_agents::simulation::{run_simulation_tick, SimulationEvent, TickContext};
use proptest::prelude::*;
use rand::SeedableRng;

// ============================================================================
// Helpers
// ============================================================================

fn setup(config: SimulationConfig, guests: usize) -> (SimulationWorld, SandboxPark) {
    let park = SandboxPark::generate(11);
    let mut world = SimulationWorld::new(config, ScenarioRng::seed_from_u64(11)).unwrap();
    let spawn = park.spawn_point().unwrap();
    for _ in 0..guests {
        world.spawn_guest(spawn).unwrap();
    }
    (world, park)
}

fn run(world: &mut SimulationWorld, park: &mut SandboxPark, ticks: u64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        park.advance(world.current_tick);
        events.extend(run_simulation_tick(world, park));
    }
    events
}

fn count(events: &[SimulationEvent], matches: fn(&SimulationEvent) -> bool) -> usize {
    events.iter().filter(|e| matches(e)).count()
}

// ============================================================================
// Admission
// ============================================================================

#[test]
fn test_guests_are_admitted_through_the_gate() {
    let (mut world, mut park) = setup(SimulationConfig::default(), 10);
    assert_eq!(world.counters.guests_heading_for_park, 10);

    let events = run(&mut world, &mut park, 2000);

    assert_eq!(world.counters.total_admissions, 10);
    assert_eq!(world.counters.guests_heading_for_park, 0);
    assert_eq!(
        count(&events, |e| matches!(e, SimulationEvent::GuestAdmitted { .. })),
        10
    );
    assert_eq!(world.counters.admission_income, 0);
}

#[test]
fn test_entrance_fee_is_collected() {
    let mut config = SimulationConfig::default();
    config.park.entrance_fee = 100;
    let (mut world, mut park) = setup(config, 5);

    run(&mut world, &mut park, 2000);

    assert_eq!(world.counters.total_admissions, 5);
    assert_eq!(world.counters.admission_income, 500);
    for (_, agent) in world.guests() {
        let guest = agent.guest().unwrap();
        assert!(guest.cash_spent >= 100);
    }
}

#[test]
fn test_unaffordable_fee_turns_guests_away() {
    let mut config = SimulationConfig::default();
    config.park.entrance_fee = 10_000;
    let (mut world, mut park) = setup(config, 5);

    let events = run(&mut world, &mut park, 2000);

    assert_eq!(world.counters.total_admissions, 0);
    assert_eq!(world.counters.guests_turned_away, 5);
    assert_eq!(world.counters.guests_in_park, 0);
    // Turned-away guests walk off the map and are dropped from the pool
    assert_eq!(world.guest_count(), 0);
    assert_eq!(
        count(&events, |e| matches!(e, SimulationEvent::GuestRemoved { .. })),
        5
    );
}

#[test]
fn test_no_money_park_ignores_the_fee() {
    let mut config = SimulationConfig::default();
    config.park.no_money = true;
    config.park.entrance_fee = 10_000;
    let (mut world, mut park) = setup(config, 5);

    run(&mut world, &mut park, 2000);

    assert_eq!(world.counters.total_admissions, 5);
    assert_eq!(world.counters.guests_turned_away, 0);
    assert_eq!(world.counters.admission_income, 0);
}

// ============================================================================
// Rides
// ============================================================================

#[test]
fn test_guests_find_rides() {
    let (mut world, mut park) = setup(SimulationConfig::default(), 30);

    let events = run(&mut world, &mut park, 20_000);

    let visits = count(&events, |e| {
        matches!(
            e,
            SimulationEvent::JoinedQueue { .. } | SimulationEvent::RideEntered { .. }
        )
    });
    assert!(visits > 0, "No guest went near a ride in 20000 ticks");
    assert!(world.counters.guests_in_park as usize <= world.guest_count());
}

// ============================================================================
// Queue give-up
// ============================================================================

const QUEUE_RIDE: RideId = RideId(1);

fn queue_visit() -> RideVisit {
    RideVisit::new(QUEUE_RIDE, StationIndex(0))
}

/// One guest standing in the queue of a ride whose entrance is out of reach,
/// so the guest never gets to the front
struct QueueScene {
    config: SimulationConfig,
    park: SandboxPark,
    rng: ScenarioRng,
    agents: EntityPool<Agent>,
    counters: ParkCounters,
    events: Vec<SimulationEvent>,
    peep: Peep,
    guest: GuestData,
}

fn queue_scene(time_in_queue: u16, happiness: u8) -> QueueScene {
    let mut park = SandboxPark::new(TileCoords::new(0, 0), TileCoords::new(19, 19));
    park.add_path_line(TileCoords::new(1, 4), TileCoords::new(12, 4));
    park.add_ride(ride_plot(QUEUE_RIDE, RideTypeId(1), 15, 10));
    park.join_queue(QUEUE_RIDE, StationIndex(0), Handle::from_bits(0));

    let position = TileCoords::new(6, 4).centre().with_z(0);
    let mut peep = Peep::new(position, PeepState::Queuing(queue_visit()));
    refresh_current_tile(&mut peep, &park);

    let mut guest = GuestData::new(GuestNeeds::default());
    guest.outside_park = false;
    guest.time_in_queue = time_in_queue;
    guest.needs.happiness = happiness;
    guest.needs.happiness_target = happiness;

    QueueScene {
        config: SimulationConfig::default(),
        park,
        rng: ScenarioRng::seed_from_u64(11),
        agents: EntityPool::with_capacity(8),
        counters: ParkCounters::default(),
        events: Vec::new(),
        peep,
        guest,
    }
}

/// Run queue steps until the guest leaves the line or `steps` run out
fn queue_for(scene: &mut QueueScene, steps: u32) {
    for tick in 0..steps {
        if !scene.peep.state.is_queuing() {
            break;
        }
        let mut ctx = TickContext {
            handle: Handle::from_bits(0),
            tick: tick as u64,
            rng: &mut scene.rng,
            config: &scene.config,
            agents: &mut scene.agents,
            counters: &mut scene.counters,
            park: &mut scene.park,
            events: &mut scene.events,
        };
        update_queuing(&mut scene.peep, &mut scene.guest, queue_visit(), &mut ctx);
    }
}

fn queue_length(park: &SandboxPark) -> Option<u16> {
    park.ride(QUEUE_RIDE).map(|r| r.stations[0].queue_length)
}

#[test]
fn test_unhappy_guest_gives_up_on_long_queue() {
    let mut scene = queue_scene(4500, 50);

    queue_for(&mut scene, 3000);

    assert_eq!(scene.peep.state, PeepState::Walking);
    assert_eq!(queue_length(&scene.park), Some(0));
    assert_eq!(scene.park.queue_front(QUEUE_RIDE, StationIndex(0)), None);
}

#[test]
fn test_content_guest_keeps_queuing() {
    let mut scene = queue_scene(4500, 100);

    queue_for(&mut scene, 3000);

    assert_eq!(scene.peep.state, PeepState::Queuing(queue_visit()));
    assert_eq!(queue_length(&scene.park), Some(1));
}

#[test]
fn test_short_wait_keeps_unhappy_guest_queuing() {
    let mut scene = queue_scene(4000, 50);

    queue_for(&mut scene, 250);

    assert_eq!(scene.peep.state, PeepState::Queuing(queue_visit()));
    assert_eq!(scene.guest.time_in_queue, 4250);
}

// ============================================================================
// Leaving
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_turned_away_guests_always_leave(seed in any::<u64>(), guests in 1usize..20) {
        let mut config = SimulationConfig::default();
        config.park.entrance_fee = 5_000;
        let mut park = SandboxPark::generate(seed);
        let mut world = SimulationWorld::new(config, ScenarioRng::seed_from_u64(seed)).unwrap();
        let spawn = park.spawn_point().unwrap();
        for _ in 0..guests {
            world.spawn_guest(spawn).unwrap();
        }

        run(&mut world, &mut park, 1500);

        prop_assert_eq!(world.counters.guests_turned_away as usize, guests);
        prop_assert_eq!(world.guest_count(), 0);
    }
}
