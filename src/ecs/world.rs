//! Simulation world - owns every agent and the park-wide state they share

use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::rng::ScenarioRng;
use crate::core::types::{CoordsXYZ, Money, Tick};
use crate::ecs::patrol::PatrolArea;
use crate::ecs::pool::{EntityPool, Handle};
use crate::entity::agent::{Agent, AgentKind, PeepState};
use crate::entity::staff::{EntertainerCostume, StaffData, StaffOrders, StaffType, STAFF_ENERGY};
use crate::simulation::guest::park::generate_guest;

/// Park-wide guest and staff counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkCounters {
    pub guests_in_park: u32,
    pub guests_heading_for_park: u32,
    pub total_admissions: u32,
    pub guests_turned_away: u32,
    pub guests_left: u32,
    pub admission_income: Money,
    pub vandalism_incidents: u32,
}

/// The game world containing all agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationWorld {
    pub current_tick: Tick,
    pub config: SimulationConfig,
    pub rng: ScenarioRng,
    pub agents: EntityPool<Agent>,
    /// Union of every member's patrol area, indexed by staff type
    patrol_aggregates: Vec<PatrolArea>,
    pub counters: ParkCounters,
}

impl SimulationWorld {
    pub fn new(config: SimulationConfig, rng: ScenarioRng) -> Result<Self> {
        config.validate().map_err(SimError::InvalidConfig)?;
        Ok(Self {
            current_tick: 0,
            agents: EntityPool::with_capacity(config.pool_capacity),
            config,
            rng,
            patrol_aggregates: vec![PatrolArea::new(); StaffType::ALL.len()],
            counters: ParkCounters::default(),
        })
    }

    /// Drop every agent and start a new park
    pub fn reset(&mut self, rng: ScenarioRng) {
        self.agents.clear();
        for area in &mut self.patrol_aggregates {
            area.clear();
        }
        self.counters = ParkCounters::default();
        self.current_tick = 0;
        self.rng = rng;
    }

    pub fn resolve(&self, handle: Handle) -> Option<&Agent> {
        self.agents.get(handle)
    }

    pub fn resolve_mut(&mut self, handle: Handle) -> Option<&mut Agent> {
        self.agents.get_mut(handle)
    }

    pub fn guests(&self) -> impl Iterator<Item = (Handle, &Agent)> + '_ {
        self.agents.iter().filter(|(_, a)| a.guest().is_some())
    }

    pub fn staff(&self) -> impl Iterator<Item = (Handle, &Agent)> + '_ {
        self.agents.iter().filter(|(_, a)| a.staff().is_some())
    }

    pub fn guest_count(&self) -> usize {
        self.guests().count()
    }

    pub fn staff_count(&self) -> usize {
        self.staff().count()
    }

    fn ensure_room(&self) -> Result<()> {
        if self.agents.free_slots() < self.config.reserved_entity_slots {
            tracing::warn!(
                "Agent creation refused: {} free slots, {} reserved",
                self.agents.free_slots(),
                self.config.reserved_entity_slots
            );
            return Err(SimError::PoolExhausted {
                live: self.agents.len(),
                capacity: self.agents.capacity(),
            });
        }
        Ok(())
    }

    /// Create a guest walking toward the park from `at`
    pub fn spawn_guest(&mut self, at: CoordsXYZ) -> Result<Handle> {
        self.ensure_room()?;

        let (guest, energy) = generate_guest(&mut self.rng, &self.config.park);
        let mut agent = Agent::new(
            at,
            PeepState::EnteringPark { admitted: false },
            AgentKind::Guest(guest),
        );
        agent.peep.energy = energy;
        agent.peep.energy_target = energy;

        let handle = self.agents.allocate(agent)?;
        self.counters.guests_heading_for_park += 1;
        tracing::debug!("Guest {:?} heading for park", handle);
        Ok(handle)
    }

    /// Hire a staff member standing at `at`
    ///
    /// Entertainers need a costume; other types ignore it.
    pub fn hire_staff(
        &mut self,
        staff_type: StaffType,
        costume: Option<u8>,
        at: CoordsXYZ,
    ) -> Result<Handle> {
        if self.staff_count() >= self.config.max_staff {
            return Err(SimError::StaffLimitReached(self.config.max_staff));
        }
        self.ensure_room()?;

        let costume = match (staff_type, costume) {
            (StaffType::Entertainer, Some(raw)) => Some(EntertainerCostume::from_u8(raw)?),
            (StaffType::Entertainer, None) => Some(EntertainerCostume::Panda),
            _ => None,
        };

        let staff = StaffData::new(staff_type, costume, self.current_tick);
        let mut agent = Agent::new(at, PeepState::Falling, AgentKind::Staff(staff));
        agent.peep.energy = STAFF_ENERGY;
        agent.peep.energy_target = STAFF_ENERGY;

        let handle = self.agents.allocate(agent)?;
        tracing::info!("Hired {:?} as {:?}", staff_type, handle);
        Ok(handle)
    }

    pub fn fire_staff(&mut self, handle: Handle) -> Result<StaffData> {
        let staff_type = self
            .resolve(handle)
            .and_then(Agent::staff)
            .map(|s| s.staff_type)
            .ok_or(SimError::InvalidHandle(handle))?;

        let agent = self
            .agents
            .release(handle)?
            .value()
            .ok_or(SimError::InvalidHandle(handle))?;
        self.recompute_patrol_aggregate(staff_type);
        tracing::info!("Fired {:?} {:?}", staff_type, handle);

        match agent.kind {
            AgentKind::Staff(staff) => Ok(staff),
            AgentKind::Guest(_) => Err(SimError::InvalidHandle(handle)),
        }
    }

    fn staff_mut(&mut self, handle: Handle) -> Result<&mut StaffData> {
        self.agents
            .get_mut(handle)
            .and_then(Agent::staff_mut)
            .ok_or(SimError::InvalidHandle(handle))
    }

    /// Replace a staff member's patrol area; `None` frees them to roam
    pub fn set_patrol_area(&mut self, handle: Handle, area: Option<PatrolArea>) -> Result<()> {
        let staff = self.staff_mut(handle)?;
        staff.patrol = area;
        let staff_type = staff.staff_type;
        self.recompute_patrol_aggregate(staff_type);
        Ok(())
    }

    pub fn set_staff_orders(&mut self, handle: Handle, orders: StaffOrders) -> Result<()> {
        self.staff_mut(handle)?.orders = orders;
        Ok(())
    }

    pub fn set_costume(&mut self, handle: Handle, costume: u8) -> Result<()> {
        let costume = EntertainerCostume::from_u8(costume)?;
        let staff = self.staff_mut(handle)?;
        if staff.staff_type != StaffType::Entertainer {
            return Err(SimError::WrongStaffType {
                handle,
                expected: StaffType::Entertainer,
                found: staff.staff_type,
            });
        }
        staff.costume = Some(costume);
        Ok(())
    }

    pub fn patrol_aggregate(&self, staff_type: StaffType) -> &PatrolArea {
        &self.patrol_aggregates[staff_type.index()]
    }

    pub(crate) fn recompute_patrol_aggregate(&mut self, staff_type: StaffType) {
        let mut merged = PatrolArea::new();
        for (_, agent) in self.agents.iter() {
            if let Some(staff) = agent.staff() {
                if staff.staff_type == staff_type {
                    if let Some(area) = &staff.patrol {
                        merged.union_with(area);
                    }
                }
            }
        }
        self.patrol_aggregates[staff_type.index()] = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> SimulationWorld {
        let config = SimulationConfig {
            pool_capacity: 20,
            reserved_entity_slots: 4,
            max_staff: 3,
            ..SimulationConfig::default()
        };
        SimulationWorld::new(config, ScenarioRng::from_state(1, 2)).unwrap()
    }

    #[test]
    fn test_guest_creation_respects_reservation() {
        let mut world = small_world();
        let at = CoordsXYZ::new(16, 16, 0);
        // 20 slots with 4 held back leaves room until 3 remain free
        for _ in 0..17 {
            world.spawn_guest(at).unwrap();
        }
        assert!(matches!(
            world.spawn_guest(at),
            Err(SimError::PoolExhausted { .. })
        ));
        assert_eq!(world.counters.guests_heading_for_park, 17);
    }

    #[test]
    fn test_staff_limit() {
        let mut world = small_world();
        let at = CoordsXYZ::new(16, 16, 0);
        for _ in 0..3 {
            world.hire_staff(StaffType::Handyman, None, at).unwrap();
        }
        assert!(matches!(
            world.hire_staff(StaffType::Handyman, None, at),
            Err(SimError::StaffLimitReached(3))
        ));
    }

    #[test]
    fn test_bad_costume_refused() {
        let mut world = small_world();
        let at = CoordsXYZ::new(16, 16, 0);
        assert!(matches!(
            world.hire_staff(StaffType::Entertainer, Some(40), at),
            Err(SimError::InvalidCostume(40))
        ));
        assert_eq!(world.staff_count(), 0);
    }

    #[test]
    fn test_fire_recomputes_aggregate() {
        let mut world = small_world();
        let at = CoordsXYZ::new(16, 16, 0);
        let a = world.hire_staff(StaffType::Mechanic, None, at).unwrap();
        let b = world.hire_staff(StaffType::Mechanic, None, at).unwrap();

        let mut left = PatrolArea::new();
        left.set_tile(crate::core::types::TileCoords::new(1, 1), true);
        let mut right = PatrolArea::new();
        right.set_tile(crate::core::types::TileCoords::new(40, 40), true);
        world.set_patrol_area(a, Some(left)).unwrap();
        world.set_patrol_area(b, Some(right)).unwrap();
        assert_eq!(world.patrol_aggregate(StaffType::Mechanic).quad_count(), 2);

        world.fire_staff(a).unwrap();
        assert_eq!(world.patrol_aggregate(StaffType::Mechanic).quad_count(), 1);
        assert!(world.resolve(a).is_none());
        assert!(world.fire_staff(a).is_err());
    }

    #[test]
    fn test_new_staff_energy() {
        let mut world = small_world();
        let h = world
            .hire_staff(StaffType::Security, None, CoordsXYZ::new(16, 16, 0))
            .unwrap();
        assert_eq!(world.resolve(h).unwrap().peep.energy, STAFF_ENERGY);
    }
}
