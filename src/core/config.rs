//! Simulation configuration with documented constants
//!
//! Tunables that a scenario may change live here. Behavioural constants that
//! belong to the agent model itself (need thresholds, chance rolls) stay next
//! to the code that uses them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::Money;

/// Configuration for the agent simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === ENTITY POOL ===
    /// Total number of entity slots in the pool
    ///
    /// Guests and staff share this storage with every other entity kind the
    /// host game keeps in the pool.
    pub pool_capacity: usize,

    /// Free slots that guest and staff creation must leave untouched
    ///
    /// Creation is refused once fewer than this many slots remain, so litter,
    /// vehicles and effects can still be spawned in a full park.
    pub reserved_entity_slots: usize,

    /// Maximum number of hired staff
    pub max_staff: usize,

    // === MAINTENANCE ===
    /// Ticks a mechanic keeps answering a call before giving up
    ///
    /// When exceeded the ride goes back to calling and another mechanic
    /// may be dispatched.
    pub mechanic_call_timeout: u16,

    /// Ticks between mechanic dispatch passes
    ///
    /// Dispatch walks every ride, so running it every tick is wasteful for
    /// large parks. Lower values answer breakdowns sooner.
    pub mechanic_dispatch_interval: u64,

    // === QUEUES ===
    /// Queue length at which guests refuse to join
    pub max_queue_length: u16,

    /// Ticks in a queue after which unhappy guests may give up
    pub queue_give_up_time: u16,

    // === PARK ===
    pub park: ParkSettings,

    // === WEATHER ===
    pub climate: Climate,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            // Pool
            pool_capacity: 10_000,
            reserved_entity_slots: 400,
            max_staff: 200,

            // Maintenance
            mechanic_call_timeout: 2500,
            mechanic_dispatch_interval: 8,

            // Queues
            max_queue_length: 1000,
            queue_give_up_time: 4300,

            park: ParkSettings::default(),
            climate: Climate::default(),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.reserved_entity_slots >= self.pool_capacity {
            return Err(format!(
                "reserved_entity_slots ({}) must be < pool_capacity ({})",
                self.reserved_entity_slots, self.pool_capacity
            ));
        }

        if self.max_staff == 0 {
            return Err("max_staff must be positive".into());
        }

        if self.mechanic_dispatch_interval == 0 {
            return Err("mechanic_dispatch_interval must be positive".into());
        }

        if self.park.guest_initial_cash < 0 || self.park.entrance_fee < 0 {
            return Err("cash values must not be negative".into());
        }

        if !(-40..=60).contains(&self.climate.temperature) {
            return Err(format!(
                "temperature ({}) outside -40..=60",
                self.climate.temperature
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(contents)?;
        config.validate().map_err(SimError::InvalidConfig)?;
        Ok(config)
    }

    /// Load a TOML config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Park-wide flags and guest starting values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkSettings {
    /// Guests never pay and purchases skip every price check
    pub no_money: bool,

    /// Guests prefer gentle rides (intensity 0..4)
    pub prefer_less_intense_rides: bool,

    /// Guests prefer intense rides (intensity 9..15)
    pub prefer_more_intense_rides: bool,

    /// Fee charged at the park entrance
    pub entrance_fee: Money,

    /// Starting cash; zero falls back to 50.00
    pub guest_initial_cash: Money,

    /// Starting happiness; zero falls back to 128
    pub guest_initial_happiness: u8,

    pub guest_initial_hunger: u8,

    pub guest_initial_thirst: u8,
}

impl Default for ParkSettings {
    fn default() -> Self {
        Self {
            no_money: false,
            prefer_less_intense_rides: false,
            prefer_more_intense_rides: false,
            entrance_fee: 0,
            guest_initial_cash: 500,
            guest_initial_happiness: 128,
            guest_initial_hunger: 200,
            guest_initial_thirst: 200,
        }
    }
}

/// Current weather as seen by guests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Climate {
    /// Temperature in degrees Celsius
    pub temperature: i8,
    pub raining: bool,
}

impl Default for Climate {
    fn default() -> Self {
        Self {
            temperature: 18,
            raining: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            max_staff = 12

            [park]
            no_money = true

            [climate]
            raining = true
            "#,
        )
        .unwrap();
        assert_eq!(config.max_staff, 12);
        assert!(config.park.no_money);
        assert!(config.climate.raining);
        assert_eq!(config.pool_capacity, 10_000);
        assert_eq!(config.park.guest_initial_cash, 500);
    }

    #[test]
    fn test_invalid_reservation_rejected() {
        let err = SimulationConfig::from_toml_str("pool_capacity = 100\nreserved_entity_slots = 400")
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = SimulationConfig::from_toml_str("max_staff = \"many\"").unwrap_err();
        assert!(matches!(err, SimError::Toml(_)));
    }

    #[test]
    fn test_shipped_park_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/park.toml");
        let config = SimulationConfig::load(path).unwrap();
        assert_eq!(config.park.entrance_fee, 100);
        assert_eq!(config.mechanic_dispatch_interval, 8);
    }
}
