//! One scan task per inbox.
//!
//! Registering a handle and marking the inbox in use always happen together,
//! as do removing the handle and clearing the mark.
//!
//! Each scan carries a step gate. A driver holds it across one visit, and
//! `cancel` takes it before releasing and refreshing the inbox, so a cancel
//! from another thread never lands in the middle of a merge.

use crate::error::{DistributionError, DistributionResult};
use crate::types::{Position, ScanId};
use crate::world::{Holder, InUseRegistry, WorldQuery};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Lifecycle of a scan task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Idle,
    Scanning,
    Completed,
    Cancelled,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Scanning => write!(f, "scanning"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A registered scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTaskHandle {
    pub id: ScanId,
    pub source: Position,
    pub state: TaskState,
}

struct TaskEntry {
    handle: ScanTaskHandle,
    gate: Arc<Mutex<()>>,
}

/// Owns the active scan of every inbox.
pub struct ScanTaskManager {
    world: Arc<dyn WorldQuery>,
    in_use: Arc<dyn InUseRegistry>,
    tasks: Mutex<HashMap<Position, TaskEntry>>,
}

impl ScanTaskManager {
    pub fn new(world: Arc<dyn WorldQuery>, in_use: Arc<dyn InUseRegistry>) -> Self {
        Self {
            world,
            in_use,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<Position, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a scan for `source` and mark it in use by the distributor.
    pub fn start(&self, source: Position) -> DistributionResult<ScanTaskHandle> {
        let mut tasks = self.tasks();
        if tasks.contains_key(&source) {
            return Err(DistributionError::AlreadyScanning(source));
        }

        let mut handle = ScanTaskHandle {
            id: ScanId::new(),
            source,
            state: TaskState::Idle,
        };
        if !self.in_use.mark_in_use(source, Holder::Distributor) {
            // Held by a player: the scan still runs and the arbiter reports it.
            debug!(%source, holder = ?self.in_use.holder_of(source), "source already held");
        }
        handle.state = TaskState::Scanning;
        tasks.insert(
            source,
            TaskEntry {
                handle,
                gate: Arc::new(Mutex::new(())),
            },
        );
        debug!(%source, scan = %handle.id, "scan registered");
        Ok(handle)
    }

    /// Whether the scan `id` is still the active scan of `source`.
    pub fn is_active(&self, source: Position, id: ScanId) -> bool {
        self.tasks()
            .get(&source)
            .is_some_and(|entry| entry.handle.id == id && entry.handle.state == TaskState::Scanning)
    }

    /// Run one step of scan `id` while holding its gate.
    ///
    /// Returns `None` without running `step` when the scan is no longer
    /// active. The step must not call back into this manager.
    pub fn step<R>(&self, source: Position, id: ScanId, step: impl FnOnce() -> R) -> Option<R> {
        let gate = self.gate(source, id)?;
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_active(source, id) {
            return None;
        }
        Some(step())
    }

    /// Handle of the active scan on `source`.
    pub fn handle(&self, source: Position) -> Option<ScanTaskHandle> {
        self.tasks().get(&source).map(|entry| entry.handle)
    }

    /// Number of active scans.
    pub fn active_count(&self) -> usize {
        self.tasks().len()
    }

    /// Finish scan `id`; a stale id (already cancelled or replaced) is ignored.
    pub fn complete(&self, source: Position, id: ScanId) -> Option<ScanTaskHandle> {
        let mut tasks = self.tasks();
        if tasks.get(&source).map(|entry| entry.handle.id) != Some(id) {
            return None;
        }
        let mut handle = tasks.remove(&source)?.handle;
        self.release(source);
        handle.state = TaskState::Completed;
        debug!(%source, scan = %id, "scan completed");
        Some(handle)
    }

    /// Stop the scan on `source`, release it and force a state refresh.
    ///
    /// Blocks until a step already underway on another thread has finished.
    pub fn cancel(&self, source: Position) -> Option<ScanTaskHandle> {
        let (id, gate) = {
            let tasks = self.tasks();
            let entry = tasks.get(&source)?;
            (entry.handle.id, Arc::clone(&entry.gate))
        };
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);

        let mut handle = {
            let mut tasks = self.tasks();
            if tasks.get(&source).map(|entry| entry.handle.id) != Some(id) {
                return None;
            }
            tasks.remove(&source)?.handle
        };
        self.release(source);
        handle.state = TaskState::Cancelled;

        match self.world.tile_entity_at(source).and_then(|entity| {
            entity.storage().map(|storage| storage.mark_modified())
        }) {
            Some(()) => debug!(%source, "source refreshed after cancel"),
            None => warn!(%source, "cancelled scan source has no storage to refresh"),
        }
        info!(%source, scan = %handle.id, "scan cancelled");
        Some(handle)
    }

    /// Cancel every active scan.
    pub fn cancel_all(&self) -> Vec<ScanTaskHandle> {
        let sources: Vec<Position> = self.tasks().keys().copied().collect();
        sources
            .into_iter()
            .filter_map(|source| self.cancel(source))
            .collect()
    }

    fn gate(&self, source: Position, id: ScanId) -> Option<Arc<Mutex<()>>> {
        self.tasks()
            .get(&source)
            .filter(|entry| entry.handle.id == id)
            .map(|entry| Arc::clone(&entry.gate))
    }

    fn release(&self, source: Position) {
        if self.in_use.holder_of(source) == Some(Holder::Distributor) {
            self.in_use.clear_in_use(source);
        }
    }
}
