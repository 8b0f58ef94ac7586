//! Staff patrol area bitmaps
//!
//! The map is divided into quads of 4x4 tiles; a patrol area holds one bit
//! per quad. Each staff member owns at most one area and the world keeps an
//! aggregate per staff type that is the union of its members' areas.

use serde::{Deserialize, Serialize};

use crate::core::types::{CoordsXY, TileCoords, MAP_SIZE_TILES};

/// Tiles along one edge of a patrol quad
pub const PATROL_QUAD_TILES: i32 = 4;

/// Quads along one edge of the map
pub const PATROL_GRID_SIZE: usize = (MAP_SIZE_TILES / PATROL_QUAD_TILES) as usize;

const WORD_COUNT: usize = PATROL_GRID_SIZE * PATROL_GRID_SIZE / 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatrolArea {
    words: Vec<u32>,
}

impl Default for PatrolArea {
    fn default() -> Self {
        Self::new()
    }
}

impl PatrolArea {
    pub fn new() -> Self {
        Self {
            words: vec![0; WORD_COUNT],
        }
    }

    fn bit_index(tile: TileCoords) -> Option<usize> {
        if !tile.is_on_map() {
            return None;
        }
        let qx = (tile.x / PATROL_QUAD_TILES) as usize;
        let qy = (tile.y / PATROL_QUAD_TILES) as usize;
        Some(qy * PATROL_GRID_SIZE + qx)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of quads set
    pub fn quad_count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    pub fn contains_tile(&self, tile: TileCoords) -> bool {
        Self::bit_index(tile)
            .map(|bit| self.words[bit / 32] & (1 << (bit % 32)) != 0)
            .unwrap_or(false)
    }

    pub fn contains(&self, loc: CoordsXY) -> bool {
        self.contains_tile(loc.tile())
    }

    /// Set or clear the quad containing `tile`
    pub fn set_tile(&mut self, tile: TileCoords, value: bool) {
        if let Some(bit) = Self::bit_index(tile) {
            if value {
                self.words[bit / 32] |= 1 << (bit % 32);
            } else {
                self.words[bit / 32] &= !(1 << (bit % 32));
            }
        }
    }

    /// Set every quad touched by the inclusive tile rectangle
    pub fn set_rect(&mut self, from: TileCoords, to: TileCoords, value: bool) {
        let (x0, x1) = (from.x.min(to.x), from.x.max(to.x));
        let (y0, y1) = (from.y.min(to.y), from.y.max(to.y));
        let mut y = y0;
        while y <= y1 {
            let mut x = x0;
            while x <= x1 {
                self.set_tile(TileCoords::new(x, y), value);
                x += 1;
            }
            y += 1;
        }
    }

    pub fn union_with(&mut self, other: &PatrolArea) {
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            *word |= theirs;
        }
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_granularity() {
        let mut area = PatrolArea::new();
        area.set_tile(TileCoords::new(5, 9), true);
        // Tiles 4..8 x 8..12 share the quad
        assert!(area.contains_tile(TileCoords::new(4, 8)));
        assert!(area.contains_tile(TileCoords::new(7, 11)));
        assert!(!area.contains_tile(TileCoords::new(8, 11)));
        assert!(!area.contains_tile(TileCoords::new(7, 12)));
        assert_eq!(area.quad_count(), 1);
    }

    #[test]
    fn test_off_map_is_never_set() {
        let mut area = PatrolArea::new();
        area.set_tile(TileCoords::new(-1, 0), true);
        area.set_tile(TileCoords::new(MAP_SIZE_TILES, 0), true);
        assert!(area.is_empty());
        assert!(!area.contains_tile(TileCoords::new(-1, 0)));
    }

    #[test]
    fn test_rect_and_union() {
        let mut a = PatrolArea::new();
        a.set_rect(TileCoords::new(0, 0), TileCoords::new(7, 3), true);
        assert_eq!(a.quad_count(), 2);

        let mut b = PatrolArea::new();
        b.set_tile(TileCoords::new(100, 100), true);
        b.union_with(&a);
        assert_eq!(b.quad_count(), 3);

        b.set_rect(TileCoords::new(0, 0), TileCoords::new(7, 3), false);
        assert_eq!(b.quad_count(), 1);
        b.clear();
        assert!(b.is_empty());
    }
}
