//! Core type definitions using newtype patterns for type safety.
//!
//! Positions, regions, items and identities shared by every other module.

mod claim;
mod item;
mod position;
mod scan_id;

pub use claim::LandClaim;
pub use item::{ItemKindId, ItemStack};
pub use position::{BoundingRegion, Position};
pub use scan_id::{ScanId, ScanIdError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a player (the host's entity id for a connected user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Persistent identity of a container owner, used as the author of label text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
