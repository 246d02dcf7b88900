//! Scan volume calculation.
//!
//! The volume is the configured range around the source, clamped to the world
//! limits and, when base-siphoning protection is on and the source sits inside
//! a land claim, to the claim's x/z box as well.

use crate::config::InboxSettings;
use crate::types::{BoundingRegion, LandClaim, Position};
use crate::world::WorldQuery;
use tracing::{trace, warn};

/// Vertical range value meaning "the whole world height".
pub const UNBOUNDED_VERTICAL: i32 = -1;

/// Range parameters for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    /// Reach on the x and z axes.
    pub horizontal: i32,
    /// Reach on the y axis, or [`UNBOUNDED_VERTICAL`].
    pub vertical: i32,
    /// Clamp to the enclosing land claim.
    pub siphoning_protection: bool,
}

impl From<&InboxSettings> for ScanRange {
    fn from(settings: &InboxSettings) -> Self {
        Self {
            horizontal: settings.horizontal_range,
            vertical: settings.vertical_range,
            siphoning_protection: settings.base_siphoning_protection,
        }
    }
}

/// Derives the legal scan volume for a source position.
#[derive(Debug, Clone, Copy)]
pub struct BoundsCalculator {
    range: ScanRange,
}

impl BoundsCalculator {
    pub fn new(range: ScanRange) -> Self {
        Self { range }
    }

    /// Compute the region for `source` using the world's limits and claims.
    ///
    /// Returns the degenerate default region when the world cannot report its
    /// extent.
    pub fn for_world(&self, source: Position, world: &dyn WorldQuery) -> BoundingRegion {
        let Some(extent) = world.world_extent() else {
            warn!(%source, "world extent unavailable; nothing will be scanned");
            return BoundingRegion::default();
        };
        let claims = if self.range.siphoning_protection {
            world.active_land_claims()
        } else {
            Vec::new()
        };
        self.calculate(source, extent, &claims)
    }

    /// Compute the region for `source` inside `extent`.
    pub fn calculate(
        &self,
        source: Position,
        extent: BoundingRegion,
        claims: &[LandClaim],
    ) -> BoundingRegion {
        let h = self.range.horizontal;
        let mut min = Position::new(
            (source.x - h).max(extent.min.x),
            0,
            (source.z - h).max(extent.min.z),
        );
        let mut max = Position::new(
            (source.x + h).min(extent.max.x),
            0,
            (source.z + h).min(extent.max.z),
        );

        if self.range.vertical == UNBOUNDED_VERTICAL {
            min.y = extent.min.y;
            max.y = extent.max.y;
        } else {
            min.y = (source.y - self.range.vertical).max(extent.min.y);
            max.y = (source.y + self.range.vertical).min(extent.max.y);
        }

        match self.protecting_claim(source, claims) {
            Some(claim) => {
                trace!(%source, claim = %claim.center, "source inside land claim; clamping to claim");
                min.x = max3(source.x - h, claim.center.x - claim.radius, extent.min.x);
                max.x = min3(source.x + h, claim.center.x + claim.radius, extent.max.x);
                min.z = max3(source.z - h, claim.center.z - claim.radius, extent.min.z);
                max.z = min3(source.z + h, claim.center.z + claim.radius, extent.max.z);
            }
            None => trace!(%source, "no protecting claim; clamping to world only"),
        }

        let region = BoundingRegion::new(min, max);
        trace!(%source, %region, "scan bounds");
        region
    }

    fn protecting_claim<'a>(
        &self,
        source: Position,
        claims: &'a [LandClaim],
    ) -> Option<&'a LandClaim> {
        if !self.range.siphoning_protection {
            return None;
        }
        find_claim_containing(source, claims)
    }
}

/// First claim whose x/z box contains `source`.
pub fn find_claim_containing(source: Position, claims: &[LandClaim]) -> Option<&LandClaim> {
    claims.iter().find(|claim| claim.contains_xz(source))
}

fn max3(a: i32, b: i32, c: i32) -> i32 {
    a.max(b.max(c))
}

fn min3(a: i32, b: i32, c: i32) -> i32 {
    a.min(b.min(c))
}
