//! Shared unit-test scaffolding: a small sandbox park plus everything a
//! [`TickContext`] borrows

use crate::core::config::SimulationConfig;
use crate::core::rng::ScenarioRng;
use crate::core::types::{Money, RideId, Tick, TileCoords};
use crate::ecs::pool::{EntityPool, Handle};
use crate::ecs::world::ParkCounters;
use crate::entity::agent::{Agent, Peep, PeepState};
use crate::entity::guest::GuestData;
use crate::entity::items::ShopItem;
use crate::entity::needs::GuestNeeds;
use crate::park::rides::{RideClass, RideInfo};
use crate::park::sandbox::{shop_plot, SandboxPark};
use crate::simulation::context::TickContext;
use crate::simulation::movement::refresh_current_tile;
use crate::simulation::tick::SimulationEvent;

pub struct Fixture {
    pub config: SimulationConfig,
    pub park: SandboxPark,
    pub rng: ScenarioRng,
    pub agents: EntityPool<Agent>,
    pub counters: ParkCounters,
    pub events: Vec<SimulationEvent>,
    pub handle: Handle,
    pub tick: Tick,
}

impl Fixture {
    /// A 20x20 owned park with a single east-west path along row 4
    pub fn new() -> Self {
        let mut park = SandboxPark::new(TileCoords::new(0, 0), TileCoords::new(19, 19));
        park.add_path_line(TileCoords::new(1, 4), TileCoords::new(12, 4));
        Self {
            config: SimulationConfig::default(),
            park,
            rng: ScenarioRng::from_state(0x1234_5678, 0x9ABC_DEF0),
            agents: EntityPool::with_capacity(64),
            counters: ParkCounters::default(),
            events: Vec::new(),
            handle: Handle::from_bits(0),
            tick: 0,
        }
    }

    pub fn ctx(&mut self) -> TickContext<'_> {
        TickContext {
            handle: self.handle,
            tick: self.tick,
            rng: &mut self.rng,
            config: &self.config,
            agents: &mut self.agents,
            counters: &mut self.counters,
            park: &mut self.park,
            events: &mut self.events,
        }
    }

    /// A stall on tile (3, 5) selling up to two items at fixed prices
    pub fn stall(id: RideId, items: [Option<ShopItem>; 2], price: [Money; 2]) -> RideInfo {
        let mut ride = shop_plot(id, RideClass::Shop, TileCoords::new(3, 5), items);
        ride.price = price;
        ride
    }

    /// A content, well-fed guest inside the park with 500 in cash
    pub fn guest() -> GuestData {
        let mut guest = GuestData::new(GuestNeeds::default());
        guest.cash_in_pocket = 500;
        guest.outside_park = false;
        guest
    }

    /// A walking peep standing in the middle of `tile`
    pub fn walking_peep(&self, tile: TileCoords) -> Peep {
        let position = tile.centre().with_z(0);
        let mut peep = Peep::new(position, PeepState::Walking);
        peep.energy = 100;
        peep.energy_target = 100;
        refresh_current_tile(&mut peep, &self.park);
        peep
    }
}
