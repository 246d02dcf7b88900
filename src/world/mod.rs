//! Capability interfaces the engine consumes from the host world.
//!
//! Containers are tile entities that may or may not support storage, locking
//! and labeling. Which capabilities an entity offers is decided by its
//! [`EntityKind`] tag; the accessors on [`TileEntity`] return `None` for
//! capabilities the kind does not carry.

pub mod memory;

use crate::error::CapabilityResult;
use crate::types::{BoundingRegion, ItemKindId, ItemStack, LandClaim, OwnerId, Position, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Capabilities carried by a composite entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub storage: bool,
    #[serde(default)]
    pub lockable: bool,
    #[serde(default)]
    pub signable: bool,
}

impl FeatureSet {
    /// Storage, lock and label all present.
    pub const ALL: FeatureSet = FeatureSet {
        storage: true,
        lockable: true,
        signable: true,
    };
}

/// Fixed-capability entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleKind {
    /// Plain storage, no lock.
    Loot,
    /// Lockable storage.
    SecureLoot,
    /// Lockable storage with a writable label.
    SignedSecureLoot,
    /// Anything else (doors, workstations...).
    Other,
}

/// Discriminated entity kind, queried instead of downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Composite(FeatureSet),
    Simple(SimpleKind),
}

impl EntityKind {
    /// Capabilities an entity of this kind carries.
    pub fn features(&self) -> FeatureSet {
        match self {
            Self::Composite(features) => *features,
            Self::Simple(SimpleKind::Loot) => FeatureSet {
                storage: true,
                ..FeatureSet::default()
            },
            Self::Simple(SimpleKind::SecureLoot) => FeatureSet {
                storage: true,
                lockable: true,
                signable: false,
            },
            Self::Simple(SimpleKind::SignedSecureLoot) => FeatureSet::ALL,
            Self::Simple(SimpleKind::Other) => FeatureSet::default(),
        }
    }
}

/// What a container is used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerRole {
    /// A source that distributes its contents.
    Inbox,
    /// An inbox that never distributes but is still never a target.
    InsecureInbox,
    /// An ordinary storage container.
    #[default]
    Storage,
}

impl ContainerRole {
    /// Either kind of inbox.
    pub fn is_inbox(self) -> bool {
        matches!(self, Self::Inbox | Self::InsecureInbox)
    }
}

/// Result of stacking items onto an existing slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Items the slot took.
    pub accepted: u32,
    /// Whether the whole incoming stack fit.
    pub fully_absorbed: bool,
}

/// Ordered slot storage of a container.
pub trait StorageCapability: Send + Sync {
    /// Snapshot of all slots in order.
    fn slots(&self) -> CapabilityResult<Vec<ItemStack>>;

    /// Overwrite one slot.
    fn set_slot(&self, index: usize, stack: ItemStack) -> CapabilityResult<()>;

    /// Stack as much of `incoming` as fits onto slot `index`.
    fn try_merge_into(&self, index: usize, incoming: ItemStack) -> CapabilityResult<MergeOutcome>;

    /// Place `incoming` into free slots; returns the quantity accepted.
    fn try_place(&self, incoming: ItemStack) -> CapabilityResult<u32>;

    /// Replace the slot list wholesale (used after re-sorting).
    fn replace_slots(&self, slots: Vec<ItemStack>) -> CapabilityResult<()>;

    /// Largest quantity a single slot can hold for `kind`.
    fn max_stack(&self, kind: ItemKindId) -> u32;

    /// Flag the container dirty so viewers resync with its real contents.
    fn mark_modified(&self);

    /// Whether this is player storage (as opposed to world loot or a backpack).
    fn is_player_storage(&self) -> bool {
        true
    }
}

/// Lock state of a container.
pub trait LockCapability: Send + Sync {
    fn is_locked(&self) -> bool;
    fn has_password(&self) -> bool;
    fn password(&self) -> String;
}

/// Human-readable label text of a container.
pub trait LabelCapability: Send + Sync {
    fn current_text(&self) -> CapabilityResult<String>;
    fn set_text(&self, text: &str, broadcast: bool, author: &OwnerId) -> CapabilityResult<()>;
}

/// A block entity located at a world position.
pub trait TileEntity: Send + Sync {
    fn position(&self) -> Position;
    fn kind(&self) -> EntityKind;
    fn role(&self) -> ContainerRole;
    fn owner(&self) -> Option<OwnerId>;
    fn storage(&self) -> Option<&dyn StorageCapability>;
    fn lock(&self) -> Option<&dyn LockCapability>;
    fn label(&self) -> Option<&dyn LabelCapability>;
}

/// Shared handle to a tile entity.
pub type EntityRef = Arc<dyn TileEntity>;

/// Read access to the world.
pub trait WorldQuery: Send + Sync {
    /// Tile entity at `pos`, if any.
    fn tile_entity_at(&self, pos: Position) -> Option<EntityRef>;

    /// World limits; `None` when the host cannot report them.
    fn world_extent(&self) -> Option<BoundingRegion>;

    /// Claims of players whose land protection is currently valid.
    fn active_land_claims(&self) -> Vec<LandClaim>;
}

/// Who holds a container open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Holder {
    /// The distribution engine itself, while a scan runs.
    Distributor,
    /// A player with the container's UI open.
    User(UserId),
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distributor => write!(f, "distributor"),
            Self::User(user) => write!(f, "{}", user),
        }
    }
}

/// The host's registry of containers currently held open.
pub trait InUseRegistry: Send + Sync {
    /// Mark `pos` held by `holder`. Returns false if it was already held.
    fn mark_in_use(&self, pos: Position, holder: Holder) -> bool;

    /// Release `pos`. Returns false if it was not held.
    fn clear_in_use(&self, pos: Position) -> bool;

    fn holder_of(&self, pos: Position) -> Option<Holder>;
}

/// Audio/visual cues played at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// Distribution was blocked.
    Blocked,
    /// Items were delivered.
    Delivered,
}

impl Cue {
    /// Host sound asset played for this cue.
    pub fn sound(&self) -> &'static str {
        match self {
            Self::Blocked => "vehicle_storage_open",
            Self::Delivered => "vehicle_storage_close",
        }
    }
}

/// Delivery of cues and user-facing messages.
pub trait NotificationSink: Send + Sync {
    fn play_cue(&self, pos: Position, cue: Cue);
    fn notify_user(&self, user: UserId, message: &str, pos: Position);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_kind_features() {
        assert!(!EntityKind::Simple(SimpleKind::Loot).features().lockable);
        assert!(EntityKind::Simple(SimpleKind::SecureLoot).features().lockable);
        assert!(!EntityKind::Simple(SimpleKind::SecureLoot).features().signable);
        assert_eq!(
            EntityKind::Simple(SimpleKind::SignedSecureLoot).features(),
            FeatureSet::ALL
        );
        assert_eq!(
            EntityKind::Simple(SimpleKind::Other).features(),
            FeatureSet::default()
        );
    }

    #[test]
    fn test_composite_features_pass_through() {
        let features = FeatureSet {
            storage: true,
            lockable: false,
            signable: true,
        };
        assert_eq!(EntityKind::Composite(features).features(), features);
    }

    #[test]
    fn test_cue_sounds() {
        assert_eq!(Cue::Blocked.sound(), "vehicle_storage_open");
        assert_eq!(Cue::Delivered.sound(), "vehicle_storage_close");
    }
}
