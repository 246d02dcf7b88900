//! Scenario files replayed by `inbox-sort run`.
//!
//! A scenario describes a world (limits, land claims, containers) and a list
//! of host events to feed the engine.

use crate::config::InboxSettings;
use crate::error::{CliError, CliResult};
use crate::types::{BoundingRegion, ItemStack, LandClaim, Position};
use crate::world::memory::{InMemoryWorld, MemoryContainer, DEFAULT_SLOT_COUNT};
use crate::world::{ContainerRole, EntityKind, SimpleKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default edge length of a land claim block.
const DEFAULT_CLAIM_SIZE: i32 = 41;

/// A scripted world and event sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Settings override; the settings file is used when absent.
    #[serde(default)]
    pub settings: Option<InboxSettings>,
    /// World limits; a world without limits scans nothing.
    #[serde(default)]
    pub extent: Option<BoundingRegion>,
    #[serde(default)]
    pub claims: Vec<ClaimSpec>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

/// A land claim, by radius or by claim block size.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimSpec {
    pub center: Position,
    #[serde(default)]
    pub radius: Option<i32>,
    #[serde(default)]
    pub size: Option<i32>,
}

impl ClaimSpec {
    pub fn to_claim(&self) -> LandClaim {
        match self.radius {
            Some(radius) => LandClaim::new(self.center, radius),
            None => LandClaim::from_claim_size(self.center, self.size.unwrap_or(DEFAULT_CLAIM_SIZE)),
        }
    }
}

fn default_kind() -> EntityKind {
    EntityKind::Simple(SimpleKind::SignedSecureLoot)
}

fn default_true() -> bool {
    true
}

/// A container placed in the world.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    pub pos: Position,
    #[serde(default = "default_kind")]
    pub kind: EntityKind,
    #[serde(default)]
    pub role: ContainerRole,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub player_storage: bool,
    #[serde(default)]
    pub max_stack: Option<u32>,
    #[serde(default)]
    pub slot_count: Option<usize>,
    #[serde(default)]
    pub slots: Vec<ItemStack>,
}

impl ContainerSpec {
    pub fn build(&self) -> MemoryContainer {
        let slot_count = self
            .slot_count
            .unwrap_or(DEFAULT_SLOT_COUNT)
            .max(self.slots.len());
        let mut slots = self.slots.clone();
        slots.resize(slot_count, ItemStack::EMPTY);

        let mut container = MemoryContainer::new(self.pos, self.kind)
            .with_role(self.role)
            .with_slots(slots);
        if let Some(owner) = &self.owner {
            container = container.with_owner(owner.clone());
        }
        if let Some(label) = &self.label {
            container = container.with_label(label.clone());
        }
        if let Some(max_stack) = self.max_stack {
            container = container.with_max_stack(max_stack);
        }
        if self.locked {
            container = container.with_lock(self.password.as_deref());
        }
        if !self.player_storage {
            container = container.not_player_storage();
        }
        container
    }
}

/// A host event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScenarioEvent {
    /// A player closes a container; inboxes start distributing.
    Unlock { pos: Position },
    /// A player opens a container; a running scan on it is cancelled.
    Lock { pos: Position, user: i32 },
    /// Wait for every running scan to finish.
    Settle,
    /// Move the clock forward and sweep expired labels.
    Advance { secs: f32 },
}

impl Scenario {
    /// Read a scenario from a JSON file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CliError::Scenario {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| CliError::Scenario {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Build the in-memory world this scenario describes.
    pub fn build_world(&self) -> InMemoryWorld {
        let world = match self.extent {
            Some(extent) => InMemoryWorld::new(extent),
            None => InMemoryWorld::without_extent(),
        };
        for claim in &self.claims {
            world.add_claim(claim.to_claim());
        }
        for spec in &self.containers {
            world.insert(spec.build());
        }
        world
    }
}
