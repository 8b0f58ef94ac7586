//! Per-agent update context
//!
//! The scheduler checks the agent being updated out of the pool and hands the
//! rest of the world to its state machine through a [`TickContext`], so the
//! machine can read and nudge other agents without aliasing itself.

use crate::core::config::SimulationConfig;
use crate::core::rng::ScenarioRng;
use crate::core::types::Tick;
use crate::ecs::pool::{EntityPool, Handle};
use crate::ecs::world::ParkCounters;
use crate::entity::agent::Agent;
use crate::park::notify::Notification;
use crate::park::ParkServices;
use crate::simulation::tick::SimulationEvent;

/// Whether an agent survives its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Alive,
    Remove,
}

pub struct TickContext<'a> {
    /// Handle of the agent being updated
    pub handle: Handle,
    pub tick: Tick,
    pub rng: &'a mut ScenarioRng,
    pub config: &'a SimulationConfig,
    /// Every other agent; the one being updated is checked out
    pub agents: &'a mut EntityPool<Agent>,
    pub counters: &'a mut ParkCounters,
    pub park: &'a mut dyn ParkServices,
    pub events: &'a mut Vec<SimulationEvent>,
}

impl TickContext<'_> {
    pub fn rand(&mut self) -> u32 {
        self.rng.next()
    }

    /// Low 16 bits of one draw, the usual chance roll
    pub fn rand16(&mut self) -> u32 {
        self.rng.next_u16()
    }

    pub fn no_money(&self) -> bool {
        self.config.park.no_money
    }

    pub fn temperature(&self) -> i8 {
        self.config.climate.temperature
    }

    pub fn raining(&self) -> bool {
        self.config.climate.raining
    }

    pub fn post(&mut self, notification: Notification) {
        self.park.post(notification);
    }

    pub fn emit(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }
}
