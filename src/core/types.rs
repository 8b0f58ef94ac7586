//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Money in tenths of the park currency (`500` is 50.00)
pub type Money = i32;

/// Fixed-point ride rating, `100` is a rating of 1.00
pub type RideRating = i16;

/// Size of one map tile in world units
pub const COORDS_XY_STEP: i32 = 32;

/// World units per height step
pub const COORDS_Z_STEP: i32 = 8;

/// Map edge length in tiles
pub const MAP_SIZE_TILES: i32 = 256;

/// Ride identifier assigned by the ride collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RideId(pub u16);

impl RideId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Station within a ride
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationIndex(pub u8);

/// Ride type (coaster family, shop kind, ...) used for ride-type history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideTypeId(pub u8);

/// Horizontal world position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordsXY {
    pub x: i32,
    pub y: i32,
}

impl CoordsXY {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Corner of the tile containing this point
    pub fn to_tile_start(self) -> Self {
        Self {
            x: self.x & !(COORDS_XY_STEP - 1),
            y: self.y & !(COORDS_XY_STEP - 1),
        }
    }

    pub fn to_tile_centre(self) -> Self {
        let start = self.to_tile_start();
        Self {
            x: start.x + COORDS_XY_STEP / 2,
            y: start.y + COORDS_XY_STEP / 2,
        }
    }

    pub fn tile(self) -> TileCoords {
        TileCoords {
            x: self.x.div_euclid(COORDS_XY_STEP),
            y: self.y.div_euclid(COORDS_XY_STEP),
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Chebyshev distance, the "max(dx, dy)" range checks use this
    pub fn chebyshev(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn with_z(self, z: i32) -> CoordsXYZ {
        CoordsXYZ {
            x: self.x,
            y: self.y,
            z,
        }
    }
}

impl std::ops::Add for CoordsXY {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// 3D world position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordsXYZ {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CoordsXYZ {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn xy(self) -> CoordsXY {
        CoordsXY {
            x: self.x,
            y: self.y,
        }
    }

    pub fn tile(self) -> TileCoords {
        self.xy().tile()
    }
}

/// Tile grid position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoords {
    pub x: i32,
    pub y: i32,
}

impl TileCoords {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_on_map(self) -> bool {
        (0..MAP_SIZE_TILES).contains(&self.x) && (0..MAP_SIZE_TILES).contains(&self.y)
    }

    pub fn to_coords(self) -> CoordsXY {
        CoordsXY {
            x: self.x * COORDS_XY_STEP,
            y: self.y * COORDS_XY_STEP,
        }
    }

    pub fn centre(self) -> CoordsXY {
        self.to_coords().to_tile_centre()
    }
}

/// Cardinal direction, `0..4`
pub type Direction = u8;

/// One tile step in each cardinal direction
pub const DIRECTION_DELTAS: [CoordsXY; 4] = [
    CoordsXY::new(-COORDS_XY_STEP, 0),
    CoordsXY::new(0, COORDS_XY_STEP),
    CoordsXY::new(COORDS_XY_STEP, 0),
    CoordsXY::new(0, -COORDS_XY_STEP),
];

/// Unit vector of each cardinal direction
pub const DIRECTION_OFFSETS: [CoordsXY; 4] = [
    CoordsXY::new(-1, 0),
    CoordsXY::new(0, 1),
    CoordsXY::new(1, 0),
    CoordsXY::new(0, -1),
];

/// Cardinal steps followed by the four diagonals
pub const NEIGHBOUR_DELTAS: [CoordsXY; 8] = [
    CoordsXY::new(-COORDS_XY_STEP, 0),
    CoordsXY::new(0, COORDS_XY_STEP),
    CoordsXY::new(COORDS_XY_STEP, 0),
    CoordsXY::new(0, -COORDS_XY_STEP),
    CoordsXY::new(-COORDS_XY_STEP, COORDS_XY_STEP),
    CoordsXY::new(COORDS_XY_STEP, COORDS_XY_STEP),
    CoordsXY::new(COORDS_XY_STEP, -COORDS_XY_STEP),
    CoordsXY::new(-COORDS_XY_STEP, -COORDS_XY_STEP),
];

pub fn direction_reverse(direction: Direction) -> Direction {
    (direction + 2) & 3
}

/// Cardinal direction that best points from `from` toward `to`
pub fn direction_from_to(from: CoordsXY, to: CoordsXY) -> Direction {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() <= dy.abs() {
        if dy < 0 {
            3
        } else {
            1
        }
    } else if dx < 0 {
        0
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_centre() {
        let loc = CoordsXY::new(70, 33);
        assert_eq!(loc.to_tile_start(), CoordsXY::new(64, 32));
        assert_eq!(loc.to_tile_centre(), CoordsXY::new(80, 48));
        assert_eq!(loc.tile(), TileCoords::new(2, 1));
    }

    #[test]
    fn test_negative_coords_round_down() {
        assert_eq!(CoordsXY::new(-1, -33).tile(), TileCoords::new(-1, -2));
        assert!(!TileCoords::new(-1, 0).is_on_map());
        assert!(TileCoords::new(0, MAP_SIZE_TILES - 1).is_on_map());
    }

    #[test]
    fn test_distances() {
        let a = CoordsXY::new(0, 0);
        let b = CoordsXY::new(30, -40);
        assert_eq!(a.manhattan(b), 70);
        assert_eq!(a.chebyshev(b), 40);
    }

    #[test]
    fn test_direction_from_to_prefers_y_on_ties() {
        let from = CoordsXY::new(100, 100);
        assert_eq!(direction_from_to(from, CoordsXY::new(40, 100)), 0);
        assert_eq!(direction_from_to(from, CoordsXY::new(160, 90)), 2);
        assert_eq!(direction_from_to(from, CoordsXY::new(132, 132)), 1);
        assert_eq!(direction_from_to(from, CoordsXY::new(68, 68)), 3);
    }

    #[test]
    fn test_direction_reverse() {
        for d in 0..4 {
            let back = direction_reverse(d);
            let there = DIRECTION_DELTAS[d as usize];
            let here = DIRECTION_DELTAS[back as usize];
            assert_eq!(there + here, CoordsXY::default());
        }
    }
}
