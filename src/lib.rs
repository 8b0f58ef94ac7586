//! Park Agents - guest and staff behaviour for a theme park simulation

pub mod core;
pub mod ecs;
pub mod entity;
pub mod park;
pub mod simulation;
