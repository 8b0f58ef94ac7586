//! Park Agents - headless runner
//!
//! Generates a sandbox park, hires a crew, lets guests in and runs the agent
//! simulation for a fixed number of ticks. Rides break down and fall due for
//! inspection along the way. A JSON summary is printed on stdout; logs go to
//! stderr.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use park_agents::core::types::{Money, Tick};
use park_agents::core::{Result, ScenarioRng, SimulationConfig};
use park_agents::ecs::world::ParkCounters;
use park_agents::ecs::SimulationWorld;
use park_agents::entity::staff::EntertainerCostume;
use park_agents::entity::StaffType;
use park_agents::park::rides::BreakdownReason;
use park_agents::park::{RideEconomy, SandboxPark};
use park_agents::simulation::{run_simulation_tick, SimulationEvent};

const BREAKDOWNS: [BreakdownReason; 8] = [
    BreakdownReason::SafetyCutOut,
    BreakdownReason::RestraintsStuckClosed,
    BreakdownReason::RestraintsStuckOpen,
    BreakdownReason::DoorsStuckClosed,
    BreakdownReason::DoorsStuckOpen,
    BreakdownReason::VehicleMalfunction,
    BreakdownReason::BrakesFailure,
    BreakdownReason::ControlFailure,
];

/// Headless park runner
#[derive(Parser, Debug)]
#[command(name = "park_agents")]
#[command(about = "Run guests and staff through a generated park and report what happened")]
struct Args {
    /// Ticks to simulate
    #[arg(long, default_value_t = 20_000)]
    ticks: u64,

    /// Guests to send toward the park
    #[arg(long, default_value_t = 200)]
    guests: u32,

    /// Ticks between guest arrivals
    #[arg(long, default_value_t = 16)]
    arrival_interval: u64,

    /// Staff hired of each type
    #[arg(long, default_value_t = 2)]
    staff: u32,

    /// Ticks between random breakdowns (0 disables them)
    #[arg(long, default_value_t = 1500)]
    breakdown_interval: u64,

    /// Ticks between inspection requests (0 disables them)
    #[arg(long, default_value_t = 2000)]
    inspection_interval: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file (see data/park.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RideSummary {
    ride: u16,
    customers: u32,
    income: Money,
    reliability: u8,
    broken: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    ticks: Tick,
    guests_spawned: u32,
    guests_remaining: usize,
    staff: usize,
    counters: ParkCounters,
    events: BTreeMap<&'static str, u32>,
    rides: Vec<RideSummary>,
    park_cash: Money,
    rng_draws: u64,
}

fn event_name(event: &SimulationEvent) -> &'static str {
    match event {
        SimulationEvent::GuestAdmitted { .. } => "guest_admitted",
        SimulationEvent::GuestTurnedAway { .. } => "guest_turned_away",
        SimulationEvent::GuestLeftPark { .. } => "guest_left_park",
        SimulationEvent::GuestRemoved { .. } => "guest_removed",
        SimulationEvent::ItemBought { .. } => "item_bought",
        SimulationEvent::JoinedQueue { .. } => "joined_queue",
        SimulationEvent::RideEntered { .. } => "ride_entered",
        SimulationEvent::RideExited { .. } => "ride_exited",
        SimulationEvent::VandalismStopped { .. } => "vandalism_stopped",
        SimulationEvent::PathVandalised { .. } => "path_vandalised",
        SimulationEvent::MechanicDispatched { .. } => "mechanic_dispatched",
        SimulationEvent::MechanicCallTimedOut { .. } => "mechanic_call_timed_out",
        SimulationEvent::RideFixed { .. } => "ride_fixed",
        SimulationEvent::RideInspected { .. } => "ride_inspected",
        SimulationEvent::StaffRemoved { .. } => "staff_removed",
    }
}

fn hire_crew(world: &mut SimulationWorld, park: &SandboxPark, per_type: u32) -> Result<()> {
    let Some(at) = park.inside_entrance() else {
        tracing::warn!("Park has no entrance; no staff hired");
        return Ok(());
    };
    for staff_type in StaffType::ALL {
        for i in 0..per_type {
            let costume = (staff_type == StaffType::Entertainer)
                .then(|| (i as usize % EntertainerCostume::ALL.len()) as u8);
            world.hire_staff(staff_type, costume, at)?;
        }
    }
    tracing::info!("Hired {} staff", world.staff_count());
    Ok(())
}

/// Break a random working ride, or flag one for inspection
fn upset_a_ride(park: &mut SandboxPark, rng: &mut ChaCha8Rng, inspection: bool) {
    let candidates: Vec<_> = park
        .ride_ids()
        .into_iter()
        .filter(|id| {
            park.ride(*id)
                .is_some_and(|ride| ride.class.is_ride() && !ride.is_broken())
        })
        .collect();
    let Some(&id) = candidates.choose(rng) else {
        return;
    };
    if inspection {
        tracing::debug!("{:?} due for inspection", id);
        park.request_inspection(id);
    } else {
        let reason = BREAKDOWNS[rng.gen_range(0..BREAKDOWNS.len())];
        tracing::info!("{:?} broke down: {:?}", id, reason);
        park.break_down(id, reason);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("park_agents=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };

    tracing::info!("Park Agents starting with seed {}", seed);

    let mut park = SandboxPark::generate(seed);
    let mut world = SimulationWorld::new(config, ScenarioRng::seed_from_u64(seed))?;
    let mut mishaps = ChaCha8Rng::seed_from_u64(seed ^ 0x5EED);

    hire_crew(&mut world, &park, args.staff)?;
    let spawn = park.spawn_point();
    if spawn.is_none() {
        tracing::warn!("Park has no entrance; no guests will arrive");
    }

    let mut events: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut guests_spawned = 0;

    for _ in 0..args.ticks {
        let tick = world.current_tick;

        if let Some(at) = spawn {
            if guests_spawned < args.guests && tick % args.arrival_interval.max(1) == 0 {
                match world.spawn_guest(at) {
                    Ok(_) => guests_spawned += 1,
                    Err(err) => tracing::warn!("Guest not spawned: {}", err),
                }
            }
        }
        if args.breakdown_interval > 0 && tick > 0 && tick % args.breakdown_interval == 0 {
            upset_a_ride(&mut park, &mut mishaps, false);
        }
        if args.inspection_interval > 0 && tick > 0 && tick % args.inspection_interval == 0 {
            upset_a_ride(&mut park, &mut mishaps, true);
        }

        park.advance(tick);
        for event in run_simulation_tick(&mut world, &mut park) {
            *events.entry(event_name(&event)).or_default() += 1;
        }

        if tick % 1000 == 0 {
            tracing::info!(
                "Tick {}: {} guests in park, {} admitted",
                tick,
                world.counters.guests_in_park,
                world.counters.total_admissions
            );
        }
    }

    let rides = park
        .ride_ids()
        .into_iter()
        .filter_map(|id| {
            let ride = park.ride(id)?;
            let stats = park.stats(id).copied().unwrap_or_default();
            Some(RideSummary {
                ride: id.0,
                customers: stats.customers,
                income: stats.income,
                reliability: ride.reliability_percentage,
                broken: ride.is_broken(),
            })
        })
        .collect();

    let summary = RunSummary {
        seed,
        ticks: world.current_tick,
        guests_spawned,
        guests_remaining: world.guest_count(),
        staff: world.staff_count(),
        counters: world.counters.clone(),
        events,
        rides,
        park_cash: park.cash,
        rng_draws: world.rng.draws(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!("Park Agents finished after {} ticks", world.current_tick);
    Ok(())
}
