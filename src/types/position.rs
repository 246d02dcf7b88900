//! World coordinates and axis-aligned regions.
//!
//! `Position` identifies a block (and the container occupying it).
//! `BoundingRegion` is an inclusive box of positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block position in the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Largest per-axis distance to `other`.
    #[inline]
    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for Position {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

/// An inclusive, axis-aligned box of positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min: Position,
    pub max: Position,
}

impl BoundingRegion {
    /// Create a new region from its corners.
    pub const fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// A region with nothing to scan: collapsed to a point or inverted on an axis.
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
            || self.min.x > self.max.x
            || self.min.y > self.max.y
            || self.min.z > self.max.z
    }

    /// Check whether `pos` lies inside the region.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Check whether `other` lies entirely inside this region.
    pub fn contains_region(&self, other: &BoundingRegion) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Largest distance from `source` to any face of the region.
    ///
    /// Faces on the far side of `source` (when it lies outside the region)
    /// contribute zero.
    pub fn max_distance_from(&self, source: Position) -> i32 {
        [
            source.x - self.min.x,
            source.y - self.min.y,
            source.z - self.min.z,
            self.max.x - source.x,
            self.max.y - source.y,
            self.max.z - source.z,
        ]
        .into_iter()
        .fold(0, i32::max)
    }

    /// Number of positions inside the region.
    pub fn volume(&self) -> u64 {
        if self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z {
            return 0;
        }
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as u64;
        span(self.min.x, self.max.x) * span(self.min.y, self.max.y) * span(self.min.z, self.max.z)
    }
}

impl fmt::Display for BoundingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_distance() {
        let a = Position::new(0, 0, 0);
        assert_eq!(a.chebyshev_distance(Position::new(3, -7, 2)), 7);
        assert_eq!(a.chebyshev_distance(a), 0);
    }

    #[test]
    fn test_degenerate_regions() {
        let p = Position::new(1, 2, 3);
        assert!(BoundingRegion::new(p, p).is_degenerate());
        assert!(BoundingRegion::new(Position::new(5, 0, 0), Position::new(4, 9, 9)).is_degenerate());
        assert!(!BoundingRegion::new(Position::new(0, 0, 0), Position::new(0, 0, 1)).is_degenerate());
    }

    #[test]
    fn test_contains_region() {
        let outer = BoundingRegion::new(Position::new(-10, -10, -10), Position::new(10, 10, 10));
        let inner = BoundingRegion::new(Position::new(-3, 0, -3), Position::new(3, 10, 3));
        assert!(outer.contains_region(&inner));
        assert!(!inner.contains_region(&outer));
    }

    #[test]
    fn test_max_distance_from() {
        let region = BoundingRegion::new(Position::new(-5, -2, -5), Position::new(5, 8, 1));
        assert_eq!(region.max_distance_from(Position::new(0, 0, 0)), 8);
    }

    #[test]
    fn test_volume() {
        let region = BoundingRegion::new(Position::new(-1, -1, -1), Position::new(1, 1, 1));
        assert_eq!(region.volume(), 27);
    }
}
