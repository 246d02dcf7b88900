//! Expanding-shell traversal around a source position.
//!
//! Positions are produced shell by shell in increasing Chebyshev distance.
//! Each shell is split into six axis-aligned faces, each clipped to the scan
//! region:
//!
//! 1. bottom (y = sy - d) and 2. top (y = sy + d), covering the full x/z square;
//! 3. z-negative and 4. z-positive walls, covering the full x span and the
//!    y span strictly between the top and bottom faces;
//! 5. x-negative and 6. x-positive walls, covering only the inner y and z spans.
//!
//! The traversal is a plain cursor (`distance`, `face`, `cell`) so it can be
//! suspended after any position and resumed later.

use crate::types::{BoundingRegion, Position};
use std::ops::RangeInclusive;

/// One of the six faces of a shell, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Bottom,
    Top,
    ZNeg,
    ZPos,
    XNeg,
    XPos,
}

impl Face {
    const ORDER: [Face; 6] = [
        Face::Bottom,
        Face::Top,
        Face::ZNeg,
        Face::ZPos,
        Face::XNeg,
        Face::XPos,
    ];

    fn next(self) -> Option<Face> {
        let index = Self::ORDER.iter().position(|f| *f == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

/// A face clipped to the region: a fixed coordinate plus two spans.
#[derive(Debug, Clone)]
struct Plane {
    face: Face,
    fixed: i32,
    outer: RangeInclusive<i32>,
    inner: RangeInclusive<i32>,
}

impl Plane {
    fn at(&self, a: i32, b: i32) -> Position {
        match self.face {
            Face::Bottom | Face::Top => Position::new(a, self.fixed, b),
            Face::ZNeg | Face::ZPos => Position::new(b, a, self.fixed),
            Face::XNeg | Face::XPos => Position::new(self.fixed, a, b),
        }
    }

    fn contains(&self, a: i32, b: i32) -> bool {
        self.outer.contains(&a) && self.inner.contains(&b)
    }
}

/// Lazy shell-ordered sequence of positions around a source.
#[derive(Debug, Clone)]
pub struct ShellScanner {
    source: Position,
    region: BoundingRegion,
    max_distance: i32,
    distance: i32,
    face: Face,
    /// Next cell of the current face; `None` when the face has not started.
    cell: Option<(i32, i32)>,
}

impl ShellScanner {
    /// Create a traversal of `region` around `source`.
    pub fn new(source: Position, region: BoundingRegion) -> Self {
        let max_distance = if region.is_degenerate() {
            0
        } else {
            region.max_distance_from(source)
        };
        Self {
            source,
            region,
            max_distance,
            distance: 1,
            face: Face::Bottom,
            cell: None,
        }
    }

    pub fn source(&self) -> Position {
        self.source
    }

    pub fn region(&self) -> BoundingRegion {
        self.region
    }

    /// Shell currently being traversed.
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Outermost shell.
    pub fn max_distance(&self) -> i32 {
        self.max_distance
    }

    /// Whether every shell has been traversed.
    pub fn is_exhausted(&self) -> bool {
        self.distance > self.max_distance
    }

    fn plane(&self) -> Option<Plane> {
        let (s, r, d) = (self.source, self.region, self.distance);
        let full_x = (s.x - d).max(r.min.x)..=(s.x + d).min(r.max.x);
        let full_z = (s.z - d).max(r.min.z)..=(s.z + d).min(r.max.z);
        let inner_y = (s.y - d + 1).max(r.min.y)..=(s.y + d - 1).min(r.max.y);
        let inner_z = (s.z - d + 1).max(r.min.z)..=(s.z + d - 1).min(r.max.z);

        let (fixed, in_region, outer, inner) = match self.face {
            Face::Bottom => (s.y - d, s.y - d >= r.min.y, full_x, full_z),
            Face::Top => (s.y + d, s.y + d <= r.max.y, full_x, full_z),
            Face::ZNeg => (s.z - d, s.z - d >= r.min.z, inner_y, full_x),
            Face::ZPos => (s.z + d, s.z + d <= r.max.z, inner_y, full_x),
            Face::XNeg => (s.x - d, s.x - d >= r.min.x, inner_y, inner_z),
            Face::XPos => (s.x + d, s.x + d <= r.max.x, inner_y, inner_z),
        };

        in_region.then_some(Plane {
            face: self.face,
            fixed,
            outer,
            inner,
        })
    }

    fn advance_face(&mut self) {
        self.cell = None;
        match self.face.next() {
            Some(face) => self.face = face,
            None => {
                self.face = Face::Bottom;
                self.distance += 1;
            }
        }
    }
}

impl Iterator for ShellScanner {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        while !self.is_exhausted() {
            if let Some(plane) = self.plane() {
                let (a, b) = self
                    .cell
                    .unwrap_or((*plane.outer.start(), *plane.inner.start()));
                if plane.contains(a, b) {
                    self.cell = Some(if b < *plane.inner.end() {
                        (a, b + 1)
                    } else {
                        (a + 1, *plane.inner.start())
                    });
                    return Some(plane.at(a, b));
                }
            }
            self.advance_face();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cube(radius: i32) -> BoundingRegion {
        BoundingRegion::new(
            Position::new(-radius, -radius, -radius),
            Position::new(radius, radius, radius),
        )
    }

    #[test]
    fn test_first_shell_covers_neighbours() {
        let positions: Vec<Position> = ShellScanner::new(Position::default(), cube(1)).collect();
        assert_eq!(positions.len(), 26);
        let unique: HashSet<Position> = positions.iter().copied().collect();
        assert_eq!(unique.len(), 26);
        assert!(!unique.contains(&Position::default()));
    }

    #[test]
    fn test_covers_region_in_distance_order() {
        let source = Position::new(0, 0, 0);
        let positions: Vec<Position> = ShellScanner::new(source, cube(3)).collect();

        let unique: HashSet<Position> = positions.iter().copied().collect();
        assert_eq!(unique.len() as u64, cube(3).volume() - 1);

        let distances: Vec<i32> = positions
            .iter()
            .map(|p| p.chebyshev_distance(source))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_bottom_face_first() {
        let mut scanner = ShellScanner::new(Position::default(), cube(2));
        assert_eq!(scanner.next(), Some(Position::new(-1, -1, -1)));
    }

    #[test]
    fn test_clipped_region() {
        let source = Position::new(0, 0, 0);
        let region = BoundingRegion::new(Position::new(-3, 0, -1), Position::new(1, 2, 1));
        let positions: Vec<Position> = ShellScanner::new(source, region).collect();

        assert!(positions.iter().all(|p| region.contains(*p)));
        let unique: HashSet<Position> = positions.iter().copied().collect();
        assert_eq!(unique.len() as u64, region.volume() - 1);
    }

    #[test]
    fn test_source_outside_region_center() {
        let source = Position::new(2, 2, 2);
        let region = BoundingRegion::new(Position::new(0, 0, 0), Position::new(4, 2, 4));
        let scanner = ShellScanner::new(source, region);
        assert_eq!(scanner.max_distance(), 2);
        let unique: HashSet<Position> = scanner.collect();
        assert_eq!(unique.len() as u64, region.volume() - 1);
    }

    #[test]
    fn test_degenerate_region_yields_nothing() {
        let p = Position::new(5, 5, 5);
        let mut scanner = ShellScanner::new(p, BoundingRegion::new(p, p));
        assert!(scanner.is_exhausted());
        assert_eq!(scanner.next(), None);
    }

    #[test]
    fn test_resume_from_clone() {
        let mut scanner = ShellScanner::new(Position::default(), cube(2));
        for _ in 0..30 {
            scanner.next();
        }
        let resumed: Vec<Position> = scanner.clone().collect();
        let continued: Vec<Position> = scanner.collect();
        assert_eq!(resumed, continued);
    }
}
