//! Map queries and mutations the agents depend on
//!
//! The tile store itself lives outside this crate. Every query returns an
//! optional or default result and callers never assume success.

use serde::{Deserialize, Serialize};

use crate::core::types::{CoordsXY, CoordsXYZ, Direction, RideId, TileCoords};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LitterKind {
    Vomit,
    VomitAlt,
    EmptyCan,
    Rubbish,
    BurgerBox,
    EmptyCup,
    EmptyBox,
    EmptyBottle,
    EmptyBowlRed,
    EmptyDrinkCarton,
    EmptyJuiceCup,
    EmptyBowlBlue,
}

impl LitterKind {
    pub fn is_vomit(self) -> bool {
        matches!(self, LitterKind::Vomit | LitterKind::VomitAlt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Litter {
    pub loc: CoordsXYZ,
    pub direction: Direction,
    pub kind: LitterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdditionKind {
    Bench,
    Bin,
    Lamp,
    JumpingFountain,
    /// Queue line TV keeps waiting guests entertained
    QueueScreen,
}

impl AdditionKind {
    pub fn is_breakable(self) -> bool {
        matches!(self, AdditionKind::Bench | AdditionKind::Bin | AdditionKind::Lamp)
    }
}

/// Bench, bin or lamp sitting on a path tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathAddition {
    pub kind: AdditionKind,
    pub broken: bool,
    pub ghost: bool,
    /// Bins: two bits per corner, `0` is full and `3` empty
    pub status: u8,
}

impl PathAddition {
    pub fn is_usable(&self, kind: AdditionKind) -> bool {
        self.kind == kind && !self.broken && !self.ghost
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathInfo {
    /// Connected edges, one bit per direction
    pub edges: u8,
    pub sloped: bool,
    pub queue_for: Option<RideId>,
    pub addition: Option<PathAddition>,
}

/// Counts gathered when a guest assesses the area around them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Surroundings {
    pub fountains: u16,
    pub scenery: u16,
    pub rubbish: u16,
    pub music: bool,
}

/// What a guest sees looking off the side of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideView {
    /// `None` for scenery worth looking at
    pub ride: Option<RideId>,
    pub is_new_ride: bool,
}

pub trait WorldMap {
    /// Land the park owns or has construction rights on
    fn is_owned(&self, loc: CoordsXY) -> bool;

    fn surface_height(&self, loc: CoordsXY) -> Option<i32>;

    /// Something on the land itself stops a staff member walking onto it
    fn surface_blocked(&self, loc: CoordsXY) -> bool;

    fn path_at(&self, loc: CoordsXYZ) -> Option<PathInfo>;

    fn park_entrances(&self) -> Vec<CoordsXYZ>;

    /// Grass length on a surface tile that can grow grass
    fn grass_length(&self, tile: TileCoords) -> Option<u8>;

    fn mow(&mut self, tile: TileCoords);

    /// Age of waterable scenery on `tile` within reach of height `z`
    fn scenery_age(&self, tile: TileCoords, z: i32) -> Option<u8>;

    /// Reset the age of waterable scenery, returning how many were watered
    fn water_scenery(&mut self, tile: TileCoords, z: i32) -> u16;

    fn litter_on_tile(&self, tile: TileCoords) -> Vec<Litter>;

    fn place_litter(&mut self, litter: Litter);

    /// Remove litter at the exact tile and height, returning the count
    fn remove_litter_at(&mut self, loc: CoordsXYZ) -> usize;

    fn set_addition_status(&mut self, loc: CoordsXYZ, status: u8);

    fn break_addition(&mut self, loc: CoordsXYZ);

    fn surroundings(&self, loc: CoordsXYZ) -> Surroundings;

    fn view_from_edge(&self, loc: CoordsXYZ, edge: Direction) -> Option<RideView>;
}

/// Grass at or above this length is worth mowing
pub const GRASS_LENGTH_CLEAR_1: u8 = 1;

/// Scenery older than this is wilting
pub const SCENERY_WITHER_AGE_THRESHOLD_1: u8 = 0x28;
pub const SCENERY_WITHER_AGE_THRESHOLD_2: u8 = 0x37;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakable_additions() {
        assert!(AdditionKind::Bench.is_breakable());
        assert!(!AdditionKind::JumpingFountain.is_breakable());
    }

    #[test]
    fn test_broken_bin_is_not_usable() {
        let bin = PathAddition {
            kind: AdditionKind::Bin,
            broken: true,
            ghost: false,
            status: 0xFF,
        };
        assert!(!bin.is_usable(AdditionKind::Bin));
    }
}
