//! Item kinds and stacks held in container slots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an item kind (the host's item class id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKindId(u32);

impl ItemKindId {
    /// Create a new item kind id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contents of one inventory slot.
///
/// The empty slot is represented by `kind: None` and `quantity: 0`; use
/// [`ItemStack::EMPTY`] rather than building it by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKindId>,
    #[serde(default)]
    pub quantity: u32,
}

impl ItemStack {
    /// The empty slot sentinel.
    pub const EMPTY: ItemStack = ItemStack {
        kind: None,
        quantity: 0,
    };

    /// Create a stack of `quantity` items of `kind`.
    ///
    /// A zero quantity yields the empty sentinel.
    pub const fn new(kind: ItemKindId, quantity: u32) -> Self {
        if quantity == 0 {
            Self::EMPTY
        } else {
            Self {
                kind: Some(kind),
                quantity,
            }
        }
    }

    /// Check if the slot holds nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() || self.quantity == 0
    }

    /// Check if this stack holds items of `kind`.
    #[inline]
    pub fn is_kind(&self, kind: ItemKindId) -> bool {
        !self.is_empty() && self.kind == Some(kind)
    }

    /// The same stack with `taken` items removed.
    pub fn without(self, taken: u32) -> Self {
        match self.kind {
            Some(kind) => Self::new(kind, self.quantity.saturating_sub(taken)),
            None => Self::EMPTY,
        }
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) if self.quantity > 0 => write!(f, "{}x{}", self.quantity, kind),
            _ => write!(f, "empty"),
        }
    }
}
