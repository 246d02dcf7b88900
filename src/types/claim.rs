//! Player land claims.

use super::Position;
use serde::{Deserialize, Serialize};

/// A protected area around a claim block.
///
/// The protected box is `center ± radius` on the x and z axes; claims do not
/// restrict the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandClaim {
    pub center: Position,
    pub radius: i32,
}

impl LandClaim {
    /// Create a new land claim.
    pub const fn new(center: Position, radius: i32) -> Self {
        Self { center, radius }
    }

    /// Build a claim from the claim block's edge length.
    ///
    /// Odd sizes round down to the next even size before halving, so a size
    /// of 41 and a size of 40 both give a radius of 20.
    pub const fn from_claim_size(center: Position, size: i32) -> Self {
        let even = if size % 2 == 1 { size - 1 } else { size };
        Self::new(center, even / 2)
    }

    /// Check whether `pos` falls inside the claim's x/z box.
    pub fn contains_xz(&self, pos: Position) -> bool {
        pos.x >= self.center.x - self.radius
            && pos.x <= self.center.x + self.radius
            && pos.z >= self.center.z - self.radius
            && pos.z <= self.center.z + self.radius
    }
}
