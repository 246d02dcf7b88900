//! Temporary label overlays with expiry-based restore.
//!
//! The first temporary write on a position captures the container's own text;
//! later writes only push the expiration out. A sweep task restores expired
//! labels, and a shutdown flush restores everything still overridden.

use super::Notice;
use crate::clock::{to_delta, Clock};
use crate::error::{CapabilityError, CapabilityResult};
use crate::types::{OwnerId, Position};
use crate::world::{TileEntity, WorldQuery};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Default)]
struct LabelState {
    /// Text each overridden label had before its first temporary write.
    records: HashMap<Position, String>,
    /// When each temporary text should be restored.
    expirations: HashMap<Position, DateTime<Utc>>,
}

struct Sweeper {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub restored: usize,
    pub retried: usize,
    pub dropped: usize,
}

/// Outcome of the shutdown flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub restored: usize,
    pub failed: usize,
}

/// Shows temporary status text on container labels and restores it later.
pub struct LabelOverlayService {
    world: Arc<dyn WorldQuery>,
    clock: Arc<dyn Clock>,
    retry: Duration,
    state: Mutex<LabelState>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl LabelOverlayService {
    /// Create a service; `retry` is the backoff after a failed restore.
    pub fn new(world: Arc<dyn WorldQuery>, clock: Arc<dyn Clock>, retry: Duration) -> Self {
        Self {
            world,
            clock,
            retry,
            state: Mutex::new(LabelState::default()),
            sweeper: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, LabelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show `notice` on `entity` for `duration`, signed by its owner.
    ///
    /// Does nothing when the duration is zero or the entity has no label.
    /// Failures are logged, never returned.
    pub fn request_notice(&self, entity: &dyn TileEntity, duration: Duration, notice: Notice) {
        let pos = entity.position();
        if duration.is_zero() {
            trace!(%pos, %notice, "notice disabled");
            return;
        }
        if entity.label().is_none() {
            trace!(%pos, "container has no label; notice skipped");
            return;
        }
        let Some(owner) = entity.owner() else {
            error!(%pos, "no signing player found on container; cannot show notice");
            return;
        };
        if let Err(e) = self.show_temporary(pos, duration, &notice.to_string(), &owner) {
            error!(%pos, error = %e, "failed to show notice");
        }
    }

    /// Write `text` on the label at `pos` until `duration` from now.
    pub fn show_temporary(
        &self,
        pos: Position,
        duration: Duration,
        text: &str,
        signer: &OwnerId,
    ) -> CapabilityResult<()> {
        let entity = self
            .world
            .tile_entity_at(pos)
            .ok_or(CapabilityError::Unavailable {
                pos,
                capability: "tile entity",
            })?;
        let label = entity.label().ok_or(CapabilityError::Unavailable {
            pos,
            capability: "label",
        })?;

        let mut state = self.state();
        if !state.records.contains_key(&pos) {
            let original = label.current_text().unwrap_or_else(|e| {
                warn!(%pos, error = %e, "failed to read label text; restoring to empty");
                String::new()
            });
            state.records.insert(pos, original);
        }

        let expires_at = self.clock.now() + to_delta(duration);
        state.expirations.insert(pos, expires_at);
        debug!(
            %pos,
            text = %text.replace('\n', "\\n"),
            expires_at = %expires_at.to_rfc3339(),
            tracked = state.expirations.len(),
            "temporary label scheduled"
        );

        label.set_text(text, true, signer)
    }

    /// Restore every label whose expiration has passed.
    pub fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let mut state = self.state();

        let expired: Vec<Position> = state
            .expirations
            .iter()
            .filter(|(_, expires_at)| **expires_at <= now)
            .map(|(pos, _)| *pos)
            .collect();

        for pos in expired {
            state.expirations.remove(&pos);
            let Some(original) = state.records.get(&pos).cloned() else {
                warn!(%pos, "expiration without original text; dropping");
                report.dropped += 1;
                continue;
            };

            match self.restore(pos, &original, true) {
                Ok(()) => {
                    state.records.remove(&pos);
                    info!(%pos, "restored original label");
                    report.restored += 1;
                }
                Err(e) => {
                    let retry_at = now + to_delta(self.retry);
                    warn!(%pos, error = %e, retry_at = %retry_at.to_rfc3339(), "label restore failed; scheduling retry");
                    state.expirations.insert(pos, retry_at);
                    report.retried += 1;
                }
            }
        }

        report
    }

    /// Start the periodic sweep. A second call while running is a no-op.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() {
            return;
        }

        let (shutdown, mut stop) = watch::channel(false);
        let service: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(service) = service.upgrade() else { break };
                        service.sweep_expired();
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("label sweep loop exited");
        });

        info!(interval_ms = interval.as_millis() as u64, "label sweep started");
        *sweeper = Some(Sweeper { shutdown, task });
    }

    /// Whether the sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| !s.task.is_finished())
    }

    /// Stop the sweep task and restore every overridden label.
    pub async fn shutdown(&self) -> FlushReport {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Sweeper { shutdown, task }) = sweeper {
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                warn!(error = %e, "label sweep task ended abnormally");
            }
            info!("label sweep stopped");
        }
        self.flush()
    }

    /// Restore every recorded label once, without broadcasting or retrying.
    pub fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        let mut state = self.state();
        state.expirations.clear();

        let records: Vec<(Position, String)> = state
            .records
            .iter()
            .map(|(pos, text)| (*pos, text.clone()))
            .collect();
        for (pos, original) in records {
            match self.restore(pos, &original, false) {
                Ok(()) => {
                    state.records.remove(&pos);
                    info!(%pos, "restored original label during shutdown");
                    report.restored += 1;
                }
                Err(e) => {
                    info!(%pos, error = %e, "failed to restore original label during shutdown");
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn restore(&self, pos: Position, original: &str, broadcast: bool) -> CapabilityResult<()> {
        let entity = self
            .world
            .tile_entity_at(pos)
            .ok_or(CapabilityError::Unavailable {
                pos,
                capability: "tile entity",
            })?;
        let owner = entity.owner().ok_or(CapabilityError::Unavailable {
            pos,
            capability: "owner",
        })?;
        let label = entity.label().ok_or(CapabilityError::Unavailable {
            pos,
            capability: "label",
        })?;

        label.set_text(original, broadcast, &owner)?;
        if let Some(storage) = entity.storage() {
            storage.mark_modified();
        }
        Ok(())
    }

    /// Original text captured for `pos`, if its label is overridden.
    pub fn original_text(&self, pos: Position) -> Option<String> {
        self.state().records.get(&pos).cloned()
    }

    /// Pending restore time for `pos`.
    pub fn expiration(&self, pos: Position) -> Option<DateTime<Utc>> {
        self.state().expirations.get(&pos).copied()
    }

    /// Number of overridden labels.
    pub fn tracked(&self) -> usize {
        self.state().records.len()
    }
}
