//! In-memory world used by the reference host and by tests.
//!
//! Every capability is backed by a `Mutex` so entities can be shared between
//! the scan tasks and the label sweep exactly as host entities are.

use super::{
    ContainerRole, Cue, EntityKind, EntityRef, Holder, InUseRegistry, LabelCapability,
    LockCapability, MergeOutcome, NotificationSink, StorageCapability, TileEntity, WorldQuery,
};
use crate::error::{CapabilityError, CapabilityResult};
use crate::types::{BoundingRegion, ItemKindId, ItemStack, LandClaim, OwnerId, Position, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Default number of slots of a new container.
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Default stack limit for every item kind.
pub const DEFAULT_MAX_STACK: u32 = 100;

/// Slot storage kept in memory.
#[derive(Debug)]
pub struct MemoryStorage {
    pos: Position,
    slots: Mutex<Vec<ItemStack>>,
    max_stack: u32,
    player_storage: bool,
    modified: AtomicUsize,
    writes_left: AtomicUsize,
    write_delay: Mutex<Duration>,
}

impl MemoryStorage {
    fn new(pos: Position) -> Self {
        Self {
            pos,
            slots: Mutex::new(vec![ItemStack::EMPTY; DEFAULT_SLOT_COUNT]),
            max_stack: DEFAULT_MAX_STACK,
            player_storage: true,
            modified: AtomicUsize::new(0),
            writes_left: AtomicUsize::new(usize::MAX),
            write_delay: Mutex::new(Duration::ZERO),
        }
    }

    fn guard(&self) -> CapabilityResult<MutexGuard<'_, Vec<ItemStack>>> {
        self.slots
            .lock()
            .map_err(|_| CapabilityError::Poisoned(self.pos))
    }

    fn check_writable(&self, operation: &'static str) -> CapabilityResult<()> {
        let delay = *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let allowed = self
            .writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if !allowed {
            return Err(CapabilityError::Rejected {
                pos: self.pos,
                operation,
                reason: "storage is read-only".to_string(),
            });
        }
        Ok(())
    }

    /// Total quantity of `kind` across all slots.
    pub fn quantity_of(&self, kind: ItemKindId) -> u32 {
        self.snapshot()
            .iter()
            .filter(|slot| slot.is_kind(kind))
            .map(|slot| slot.quantity)
            .sum()
    }

    /// Copy of the current slots.
    pub fn snapshot(&self) -> Vec<ItemStack> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times the container was marked modified.
    pub fn modified_count(&self) -> usize {
        self.modified.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        let left = if fail { 0 } else { usize::MAX };
        self.writes_left.store(left, Ordering::SeqCst);
    }

    /// Let `count` more writes through, then fail the rest.
    pub fn fail_writes_after(&self, count: usize) {
        self.writes_left.store(count, Ordering::SeqCst);
    }

    /// Block the calling thread for `delay` on every write.
    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }
}

impl StorageCapability for MemoryStorage {
    fn slots(&self) -> CapabilityResult<Vec<ItemStack>> {
        Ok(self.guard()?.clone())
    }

    fn set_slot(&self, index: usize, stack: ItemStack) -> CapabilityResult<()> {
        self.check_writable("set_slot")?;
        let mut slots = self.guard()?;
        let slot = slots.get_mut(index).ok_or(CapabilityError::Rejected {
            pos: self.pos,
            operation: "set_slot",
            reason: format!("slot {} out of range", index),
        })?;
        *slot = stack;
        Ok(())
    }

    fn try_merge_into(&self, index: usize, incoming: ItemStack) -> CapabilityResult<MergeOutcome> {
        self.check_writable("try_merge_into")?;
        let mut slots = self.guard()?;
        let slot = slots.get_mut(index).ok_or(CapabilityError::Rejected {
            pos: self.pos,
            operation: "try_merge_into",
            reason: format!("slot {} out of range", index),
        })?;

        let Some(kind) = incoming.kind.filter(|_| !incoming.is_empty()) else {
            return Ok(MergeOutcome {
                accepted: 0,
                fully_absorbed: true,
            });
        };
        if !slot.is_kind(kind) {
            return Ok(MergeOutcome {
                accepted: 0,
                fully_absorbed: false,
            });
        }

        let room = self.max_stack.saturating_sub(slot.quantity);
        let accepted = room.min(incoming.quantity);
        *slot = ItemStack::new(kind, slot.quantity + accepted);
        Ok(MergeOutcome {
            accepted,
            fully_absorbed: accepted == incoming.quantity,
        })
    }

    fn try_place(&self, incoming: ItemStack) -> CapabilityResult<u32> {
        self.check_writable("try_place")?;
        let Some(kind) = incoming.kind.filter(|_| !incoming.is_empty()) else {
            return Ok(0);
        };
        let mut slots = self.guard()?;
        let mut remaining = incoming.quantity;

        // Top up matching stacks first, then fill empty slots.
        for slot in slots.iter_mut().filter(|slot| slot.is_kind(kind)) {
            let take = self.max_stack.saturating_sub(slot.quantity).min(remaining);
            *slot = ItemStack::new(kind, slot.quantity + take);
            remaining -= take;
        }
        for slot in slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_empty() {
                let take = self.max_stack.min(remaining);
                *slot = ItemStack::new(kind, take);
                remaining -= take;
            }
        }

        Ok(incoming.quantity - remaining)
    }

    fn replace_slots(&self, slots: Vec<ItemStack>) -> CapabilityResult<()> {
        self.check_writable("replace_slots")?;
        *self.guard()? = slots;
        Ok(())
    }

    fn max_stack(&self, _kind: ItemKindId) -> u32 {
        self.max_stack
    }

    fn mark_modified(&self) {
        self.modified.fetch_add(1, Ordering::SeqCst);
    }

    fn is_player_storage(&self) -> bool {
        self.player_storage
    }
}

#[derive(Debug, Default)]
struct LockState {
    locked: bool,
    password: Option<String>,
}

/// Lock kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLock {
    state: Mutex<LockState>,
}

impl MemoryLock {
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_locked(&self, locked: bool) {
        self.state().locked = locked;
    }

    pub fn set_password(&self, password: Option<&str>) {
        self.state().password = password.map(str::to_string);
    }
}

impl LockCapability for MemoryLock {
    fn is_locked(&self) -> bool {
        self.state().locked
    }

    fn has_password(&self) -> bool {
        self.state()
            .password
            .as_deref()
            .is_some_and(|password| !password.is_empty())
    }

    fn password(&self) -> String {
        self.state().password.clone().unwrap_or_default()
    }
}

/// Label kept in memory.
#[derive(Debug)]
pub struct MemoryLabel {
    pos: Position,
    text: Mutex<String>,
    author: Mutex<Option<OwnerId>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryLabel {
    fn new(pos: Position, text: String) -> Self {
        Self {
            pos,
            text: Mutex::new(text),
            author: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Text currently shown.
    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Author of the last write.
    pub fn author(&self) -> Option<OwnerId> {
        self.author
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LabelCapability for MemoryLabel {
    fn current_text(&self) -> CapabilityResult<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CapabilityError::Rejected {
                pos: self.pos,
                operation: "current_text",
                reason: "authored text unreadable".to_string(),
            });
        }
        Ok(self.text())
    }

    fn set_text(&self, text: &str, broadcast: bool, author: &OwnerId) -> CapabilityResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CapabilityError::Rejected {
                pos: self.pos,
                operation: "set_text",
                reason: "label is read-only".to_string(),
            });
        }
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
        *self.author.lock().unwrap_or_else(PoisonError::into_inner) = Some(author.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(pos = %self.pos, broadcast, "label text written");
        Ok(())
    }
}

/// A container whose capabilities follow its [`EntityKind`].
#[derive(Debug)]
pub struct MemoryContainer {
    pos: Position,
    kind: EntityKind,
    role: ContainerRole,
    owner: Option<OwnerId>,
    storage: Option<MemoryStorage>,
    lock: Option<MemoryLock>,
    label: Option<MemoryLabel>,
}

impl MemoryContainer {
    /// Create a container at `pos` with the capabilities of `kind`.
    pub fn new(pos: Position, kind: EntityKind) -> Self {
        let features = kind.features();
        Self {
            pos,
            kind,
            role: ContainerRole::Storage,
            owner: None,
            storage: features.storage.then(|| MemoryStorage::new(pos)),
            lock: features.lockable.then(MemoryLock::default),
            label: features.signable.then(|| MemoryLabel::new(pos, String::new())),
        }
    }

    /// Set the container role.
    pub fn with_role(mut self, role: ContainerRole) -> Self {
        self.role = role;
        self
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(OwnerId(owner.into()));
        self
    }

    /// Set the slot contents (ignored without storage).
    pub fn with_slots(mut self, slots: Vec<ItemStack>) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.slots = Mutex::new(slots);
        }
        self
    }

    /// Set the stack limit (ignored without storage).
    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.max_stack = max_stack;
        }
        self
    }

    /// Mark the storage as not belonging to a player (world loot, backpacks).
    pub fn not_player_storage(mut self) -> Self {
        if let Some(storage) = self.storage.as_mut() {
            storage.player_storage = false;
        }
        self
    }

    /// Lock the container, optionally with a password (ignored without a lock).
    pub fn with_lock(self, password: Option<&str>) -> Self {
        if let Some(lock) = self.lock.as_ref() {
            lock.set_locked(true);
            lock.set_password(password);
        }
        self
    }

    /// Set the label text (ignored without a label).
    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        if self.label.is_some() {
            self.label = Some(MemoryLabel::new(self.pos, text.into()));
        }
        self
    }

    pub fn storage_state(&self) -> Option<&MemoryStorage> {
        self.storage.as_ref()
    }

    pub fn lock_state(&self) -> Option<&MemoryLock> {
        self.lock.as_ref()
    }

    pub fn label_state(&self) -> Option<&MemoryLabel> {
        self.label.as_ref()
    }
}

impl TileEntity for MemoryContainer {
    fn position(&self) -> Position {
        self.pos
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn role(&self) -> ContainerRole {
        self.role
    }

    fn owner(&self) -> Option<OwnerId> {
        self.owner.clone()
    }

    fn storage(&self) -> Option<&dyn StorageCapability> {
        self.storage.as_ref().map(|s| s as &dyn StorageCapability)
    }

    fn lock(&self) -> Option<&dyn LockCapability> {
        self.lock.as_ref().map(|l| l as &dyn LockCapability)
    }

    fn label(&self) -> Option<&dyn LabelCapability> {
        self.label.as_ref().map(|l| l as &dyn LabelCapability)
    }
}

/// A world made of [`MemoryContainer`]s.
#[derive(Debug, Default)]
pub struct InMemoryWorld {
    extent: Option<BoundingRegion>,
    claims: RwLock<Vec<LandClaim>>,
    entities: RwLock<HashMap<Position, Arc<MemoryContainer>>>,
}

impl InMemoryWorld {
    /// Create an empty world with the given limits.
    pub fn new(extent: BoundingRegion) -> Self {
        Self {
            extent: Some(extent),
            ..Self::default()
        }
    }

    /// Create a world whose limits cannot be reported.
    pub fn without_extent() -> Self {
        Self::default()
    }

    /// Register an active land claim.
    pub fn add_claim(&self, claim: LandClaim) {
        self.claims
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(claim);
    }

    /// Place a container, replacing whatever was at its position.
    pub fn insert(&self, container: MemoryContainer) -> Arc<MemoryContainer> {
        let container = Arc::new(container);
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(container.pos, Arc::clone(&container));
        container
    }

    /// Put back a shared container, e.g. one taken out with [`Self::remove`].
    pub fn insert_arc(&self, container: Arc<MemoryContainer>) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(container.pos, container);
    }

    /// Remove the container at `pos`.
    pub fn remove(&self, pos: Position) -> Option<Arc<MemoryContainer>> {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pos)
    }

    /// Concrete container at `pos`.
    pub fn container(&self, pos: Position) -> Option<Arc<MemoryContainer>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pos)
            .cloned()
    }

    /// All occupied positions.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        positions.sort_by_key(|p| (p.x, p.y, p.z));
        positions
    }
}

impl WorldQuery for InMemoryWorld {
    fn tile_entity_at(&self, pos: Position) -> Option<EntityRef> {
        self.container(pos).map(|c| c as EntityRef)
    }

    fn world_extent(&self) -> Option<BoundingRegion> {
        self.extent
    }

    fn active_land_claims(&self) -> Vec<LandClaim> {
        self.claims
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// In-use registry kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryInUse {
    holders: Mutex<HashMap<Position, Holder>>,
}

impl InMemoryInUse {
    pub fn new() -> Self {
        Self::default()
    }

    fn holders(&self) -> MutexGuard<'_, HashMap<Position, Holder>> {
        self.holders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of held containers.
    pub fn len(&self) -> usize {
        self.holders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders().is_empty()
    }
}

impl InUseRegistry for InMemoryInUse {
    fn mark_in_use(&self, pos: Position, holder: Holder) -> bool {
        let mut holders = self.holders();
        if holders.contains_key(&pos) {
            return false;
        }
        holders.insert(pos, holder);
        true
    }

    fn clear_in_use(&self, pos: Position) -> bool {
        self.holders().remove(&pos).is_some()
    }

    fn holder_of(&self, pos: Position) -> Option<Holder> {
        self.holders().get(&pos).copied()
    }
}

/// A cue or message delivered through [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Cue { pos: Position, cue: Cue },
    Message { user: UserId, message: String, pos: Position },
}

/// Notification sink that records everything it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cues played at `pos`.
    pub fn cues_at(&self, pos: Position) -> Vec<Cue> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Notification::Cue { pos: at, cue } if at == pos => Some(cue),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Notification) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl NotificationSink for RecordingNotifier {
    fn play_cue(&self, pos: Position, cue: Cue) {
        debug!(%pos, sound = cue.sound(), "cue");
        self.push(Notification::Cue { pos, cue });
    }

    fn notify_user(&self, user: UserId, message: &str, pos: Position) {
        debug!(%pos, %user, message, "user notified");
        self.push(Notification::Message {
            user,
            message: message.to_string(),
            pos,
        });
    }
}
