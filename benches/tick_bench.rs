use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use park_agents::core::{ScenarioRng, SimulationConfig};
use park_agents::ecs::SimulationWorld;
use park_agents::entity::StaffType;
use park_agents::park::SandboxPark;
use park_agents::simulation::run_simulation_tick;
use rand::SeedableRng;
use std::time::Duration;

/// A generated park with `guests` already inside and a crew of eight
fn populated_park(guests: usize) -> (SimulationWorld, SandboxPark) {
    let mut park = SandboxPark::generate(0xBEEF);
    let mut world = SimulationWorld::new(
        SimulationConfig::default(),
        ScenarioRng::seed_from_u64(0xBEEF),
    )
    .expect("default config is valid");
    let gate = park.inside_entrance().expect("generated park has an entrance");
    let spawn = park.spawn_point().expect("generated park has an entrance");
    for staff_type in StaffType::ALL {
        for _ in 0..2 {
            world
                .hire_staff(staff_type, None, gate)
                .expect("room for staff");
        }
    }
    for _ in 0..guests {
        world.spawn_guest(spawn).expect("room for guests");
    }
    // Let the crowd spread out before measuring
    for _ in 0..2000 {
        park.advance(world.current_tick);
        run_simulation_tick(&mut world, &mut park);
    }
    (world, park)
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("park_tick");
    let samples: usize = std::env::var("PARK_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(20);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(8));

    let steps: usize = std::env::var("PARK_BENCH_STEPS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(64);

    for guests in [100_usize, 500, 2000] {
        let (world, park) = populated_park(guests);
        group.bench_function(format!("steps{}_guests{}", steps, guests), |b| {
            b.iter_batched(
                || (world.clone(), park.clone()),
                |(mut world, mut park)| {
                    for _ in 0..steps {
                        park.advance(world.current_tick);
                        run_simulation_tick(&mut world, &mut park);
                    }
                    world
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
