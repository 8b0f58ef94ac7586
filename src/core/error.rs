use thiserror::Error;

use crate::core::types::RideId;
use crate::ecs::pool::Handle;
use crate::entity::staff::StaffType;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Entity pool exhausted: {live} live of {capacity}")]
    PoolExhausted { live: usize, capacity: usize },

    #[error("Invalid or stale handle: {0:?}")]
    InvalidHandle(Handle),

    #[error("Staff limit of {0} reached")]
    StaffLimitReached(usize),

    #[error("Unknown staff type: {0}")]
    UnknownStaffType(u8),

    #[error("Invalid entertainer costume: {0}")]
    InvalidCostume(u8),

    #[error("Expected a {expected:?}, {handle:?} is a {found:?}")]
    WrongStaffType {
        handle: Handle,
        expected: StaffType,
        found: StaffType,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ride not found: {0:?}")]
    RideNotFound(RideId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
