//! End-to-end distribution from an inbox.
//!
//! `start` computes the scan region, registers a scan task and spawns a driver
//! that walks the shells around the inbox. The driver yields after every
//! candidate and runs each visit as a gated step of its task, so a cancel
//! takes effect at the next candidate and first waits for a merge already
//! underway to finish.

use super::access::{AccessArbiter, Decision, Denial};
use super::merge::StackMerger;
use super::tasks::{ScanTaskHandle, ScanTaskManager, TaskState};
use crate::clock::Clock;
use crate::config::InboxSettings;
use crate::error::DistributionResult;
use crate::labels::{FlushReport, LabelOverlayService};
use crate::scanner::{BoundsCalculator, ShellScanner};
use crate::types::{BoundingRegion, Position, ScanId};
use crate::world::{
    ContainerRole, EntityRef, InUseRegistry, NotificationSink, WorldQuery,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Finished scan reports kept for `take_reports`; older ones are dropped.
pub const MAX_RETAINED_REPORTS: usize = 64;

/// What `start` did with an unlock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A scan is now running.
    Started(ScanTaskHandle),
    /// The position holds no inbox with storage.
    NotAnInbox,
    /// The scan region is empty.
    NothingToScan,
}

/// A target the driver visited and what happened there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Visit {
    Transferred { target: Position, quantity: u32 },
    Denied { target: Position, reason: Denial },
    Failed { target: Position },
}

/// Summary of one finished scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scan: ScanId,
    pub source: Position,
    pub region: BoundingRegion,
    pub state: TaskState,
    pub visits: Vec<Visit>,
}

impl ScanReport {
    /// Total quantity moved out of the inbox.
    pub fn transferred(&self) -> u32 {
        self.visits
            .iter()
            .map(|visit| match visit {
                Visit::Transferred { quantity, .. } => *quantity,
                _ => 0,
            })
            .sum()
    }
}

/// Composes bounds, traversal, arbitration, merging and labels.
pub struct DistributionOrchestrator {
    world: Arc<dyn WorldQuery>,
    bounds: BoundsCalculator,
    tasks: ScanTaskManager,
    arbiter: AccessArbiter,
    merger: StackMerger,
    labels: Arc<LabelOverlayService>,
    drivers: Mutex<Vec<JoinHandle<()>>>,
    reports: Mutex<VecDeque<ScanReport>>,
}

impl DistributionOrchestrator {
    /// Build an orchestrator and start its label sweep.
    ///
    /// Must be called from within a Tokio runtime. Either scheduler flavor
    /// works: scan steps and cancels on the same inbox never interleave.
    pub fn new(
        settings: &InboxSettings,
        world: Arc<dyn WorldQuery>,
        in_use: Arc<dyn InUseRegistry>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let settings = settings.clamped();
        let labels = Arc::new(LabelOverlayService::new(
            Arc::clone(&world),
            clock,
            settings.restore_retry(),
        ));
        labels.start_sweeper(settings.sweep_interval());

        Arc::new(Self {
            bounds: BoundsCalculator::new((&settings).into()),
            tasks: ScanTaskManager::new(Arc::clone(&world), in_use.clone()),
            arbiter: AccessArbiter::new(
                in_use,
                Arc::clone(&notifier),
                Arc::clone(&labels),
                settings.blocked_notice(),
            ),
            merger: StackMerger::new(notifier, Arc::clone(&labels), settings.success_notice()),
            world,
            labels,
            drivers: Mutex::new(Vec::new()),
            reports: Mutex::new(VecDeque::new()),
        })
    }

    /// Handle an unlock of the container at `source`.
    pub fn start(self: &Arc<Self>, source: Position) -> DistributionResult<StartOutcome> {
        let Some(entity) = self.world.tile_entity_at(source) else {
            trace!(%source, "no tile entity at source");
            return Ok(StartOutcome::NotAnInbox);
        };
        if entity.role() != ContainerRole::Inbox || entity.storage().is_none() {
            trace!(%source, kind = ?entity.kind(), "source is not an inbox container");
            return Ok(StartOutcome::NotAnInbox);
        }

        let region = self.bounds.for_world(source, self.world.as_ref());
        if region.is_degenerate() {
            trace!(%source, %region, "scan region is empty; nothing to scan");
            return Ok(StartOutcome::NothingToScan);
        }

        let handle = self.tasks.start(source)?;
        info!(%source, scan = %handle.id, %region, "distribution started");

        let scanner = ShellScanner::new(source, region);
        let driver = tokio::spawn(Arc::clone(self).drive(handle, scanner));
        let mut drivers = self.drivers();
        drivers.retain(|driver| !driver.is_finished());
        drivers.push(driver);
        Ok(StartOutcome::Started(handle))
    }

    /// Cancel the scan on `pos`, if one is running. Called on lock events.
    ///
    /// When a merge for this inbox is underway on another worker, blocks
    /// until it has finished so the refresh reflects it.
    pub fn cancel_if_active(&self, pos: Position) -> Option<ScanTaskHandle> {
        let cancelled = self.tasks.cancel(pos);
        if cancelled.is_none() {
            trace!(%pos, "no active scan to cancel");
        }
        cancelled
    }

    /// Wait until every spawned scan has finished.
    pub async fn wait_idle(&self) {
        loop {
            let drivers: Vec<JoinHandle<()>> = self.drivers().drain(..).collect();
            if drivers.is_empty() {
                return;
            }
            for result in futures::future::join_all(drivers).await {
                if let Err(e) = result {
                    error!(error = %e, "scan driver ended abnormally");
                }
            }
        }
    }

    /// Cancel every scan, wait for the drivers, then stop the label sweep
    /// and restore every overridden label.
    pub async fn shutdown(&self) -> FlushReport {
        let cancelled = self.tasks.cancel_all();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "cancelled active scans");
        }
        self.wait_idle().await;
        let report = self.labels.shutdown().await;
        info!(restored = report.restored, failed = report.failed, "distribution shut down");
        report
    }

    /// Whether a scan is running on `source`.
    pub fn is_scanning(&self, source: Position) -> bool {
        self.tasks.handle(source).is_some()
    }

    /// The label service shared by the arbiter and the merger.
    pub fn labels(&self) -> &Arc<LabelOverlayService> {
        &self.labels
    }

    /// Take the reports of the scans finished so far, oldest first.
    ///
    /// At most [`MAX_RETAINED_REPORTS`] are kept between calls.
    pub fn take_reports(&self) -> Vec<ScanReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    fn drivers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.drivers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive(self: Arc<Self>, handle: ScanTaskHandle, mut scanner: ShellScanner) {
        let source = handle.source;
        let mut report = ScanReport {
            scan: handle.id,
            source,
            region: scanner.region(),
            state: TaskState::Scanning,
            visits: Vec::new(),
        };

        let mut shell = scanner.distance();
        while let Some(pos) = scanner.next() {
            if scanner.distance() != shell {
                shell = scanner.distance();
                tokio::task::yield_now().await;
            }
            if !self.tasks.is_active(source, handle.id) {
                break;
            }
            let Some(target) = self.candidate(pos) else {
                continue;
            };
            let visited = self.tasks.step(source, handle.id, || {
                self.world
                    .tile_entity_at(source)
                    .map(|inbox| self.visit(&inbox, &target))
            });
            match visited {
                Some(Some(visit)) => report.visits.push(visit),
                Some(None) => {
                    warn!(%source, scan = %handle.id, "inbox disappeared during scan");
                    self.tasks.cancel(source);
                    break;
                }
                None => break,
            }
            tokio::task::yield_now().await;
        }

        report.state = match self.tasks.complete(source, handle.id) {
            Some(done) => done.state,
            None => TaskState::Cancelled,
        };
        info!(
            %source,
            scan = %handle.id,
            state = %report.state,
            visited = report.visits.len(),
            transferred = report.transferred(),
            "distribution finished"
        );
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        if reports.len() >= MAX_RETAINED_REPORTS {
            if let Some(dropped) = reports.pop_front() {
                debug!(source = %dropped.source, scan = %dropped.scan, "oldest scan report dropped");
            }
        }
        reports.push_back(report);
    }

    /// Player storage at `pos` that is not itself an inbox.
    fn candidate(&self, pos: Position) -> Option<EntityRef> {
        let entity = self.world.tile_entity_at(pos)?;
        let storage = entity.storage()?;
        if !storage.is_player_storage() || entity.role().is_inbox() {
            return None;
        }
        Some(entity)
    }

    fn visit(&self, inbox: &EntityRef, target: &EntityRef) -> Visit {
        let target_pos = target.position();
        match self.arbiter.check(inbox.as_ref(), target.as_ref()) {
            Decision::Deny(reason) => Visit::Denied {
                target: target_pos,
                reason,
            },
            Decision::Permit => match self.merger.merge(inbox.as_ref(), target.as_ref()) {
                Ok(quantity) => {
                    debug!(source = %inbox.position(), target = %target_pos, quantity, "target visited");
                    Visit::Transferred {
                        target: target_pos,
                        quantity,
                    }
                }
                Err(e) => {
                    error!(source = %inbox.position(), target = %target_pos, error = %e, "distribution step failed");
                    Visit::Failed { target: target_pos }
                }
            },
        }
    }
}
