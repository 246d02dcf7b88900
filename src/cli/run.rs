//! Run subcommand implementation.
//!
//! Handles `inbox-sort run <scenario>`: builds the scenario world, feeds its
//! events to the engine, shuts the engine down and prints what happened.

use super::scenario::{Scenario, ScenarioEvent};
use super::OutputFormat;
use crate::clock::{Clock, ManualClock};
use crate::config::InboxSettings;
use crate::distribution::DistributionOrchestrator;
use crate::error::{CliError, CliResult, DistributionError};
use crate::output::{self, ContainerSummary, RunReport};
use crate::types::{Position, UserId};
use crate::world::memory::{InMemoryInUse, InMemoryWorld, RecordingNotifier};
use crate::world::{Holder, InUseRegistry, TileEntity};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Replay a scenario file against an in-memory world.
#[derive(Parser, Debug)]
pub struct RunCommand {
    /// Scenario file (JSON)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(&self, config: Option<&Path>) -> CliResult<()> {
        let scenario = Scenario::load(&self.scenario)?;
        let settings = match (config, &scenario.settings) {
            (Some(path), _) => InboxSettings::load_from(path)?,
            (None, Some(settings)) => settings.clamped(),
            (None, None) => InboxSettings::load()?,
        };
        debug!(scenario = %self.scenario.display(), "settings:\n{}", settings);

        let report = simulate(&scenario, &settings).await?;
        output::print_report(&report, self.format)?;
        Ok(())
    }
}

/// Play every event of `scenario` and collect the outcome.
///
/// Scans still running after the last event are drained; labels still
/// overridden are then flushed back to their original text.
pub async fn simulate(scenario: &Scenario, settings: &InboxSettings) -> CliResult<RunReport> {
    let world = Arc::new(scenario.build_world());
    let in_use = Arc::new(InMemoryInUse::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::default());
    let started_at = clock.now();

    let engine = DistributionOrchestrator::new(
        settings,
        world.clone(),
        in_use.clone(),
        notifier.clone(),
        clock.clone(),
    );

    for (index, event) in scenario.events.iter().enumerate() {
        match event {
            ScenarioEvent::Unlock { pos } => {
                if let Some(Holder::User(user)) = in_use.holder_of(*pos) {
                    debug!(%pos, %user, "container closed");
                    in_use.clear_in_use(*pos);
                }
                match engine.start(*pos) {
                    Ok(outcome) => debug!(%pos, ?outcome, "unlock handled"),
                    Err(DistributionError::AlreadyScanning(pos)) => {
                        warn!(%pos, "inbox is already distributing; unlock ignored")
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            ScenarioEvent::Lock { pos, user } => {
                engine.cancel_if_active(*pos);
                if !in_use.mark_in_use(*pos, Holder::User(UserId(*user))) {
                    warn!(%pos, user, "container already held; lock ignored");
                }
            }
            ScenarioEvent::Settle => engine.wait_idle().await,
            ScenarioEvent::Advance { secs } => {
                let step = Duration::try_from_secs_f32(*secs).map_err(|e| {
                    CliError::InvalidEvent {
                        index,
                        reason: format!("cannot advance by {} seconds: {}", secs, e),
                    }
                })?;
                engine.wait_idle().await;
                clock.advance(step);
                let swept = engine.labels().sweep_expired();
                debug!(?swept, elapsed = %(clock.now() - started_at), "clock advanced");
            }
        }
    }

    engine.wait_idle().await;
    let labels_pending = engine.labels().tracked();
    let labels_flushed = engine.shutdown().await;
    let scans = engine.take_reports();
    info!(scans = scans.len(), "scenario finished");

    Ok(RunReport {
        scans,
        notifications: notifier.events(),
        labels_pending,
        labels_flushed,
        containers: summarize(&world),
    })
}

fn summarize(world: &InMemoryWorld) -> Vec<ContainerSummary> {
    world
        .positions()
        .into_iter()
        .filter_map(|pos: Position| world.container(pos))
        .map(|container| ContainerSummary {
            pos: container.position(),
            role: container.role(),
            label: container.label_state().map(|label| label.text()),
            items: container
                .storage_state()
                .map(|storage| {
                    storage
                        .snapshot()
                        .into_iter()
                        .filter(|stack| !stack.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Denial, TaskState, Visit};
    use crate::types::{ItemKindId, ItemStack};

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    const WORLD: &str = r#"
        "extent": {"min": {"x": -20, "y": 0, "z": -20}, "max": {"x": 20, "y": 100, "z": 20}},
        "containers": [
            {"pos": {"x": 0, "y": 10, "z": 0}, "role": "inbox", "owner": "steam_1",
             "slots": [{"kind": 1, "quantity": 40}, {"kind": 2, "quantity": 3}]},
            {"pos": {"x": 1, "y": 10, "z": 0}, "owner": "steam_1", "label": "Ammo",
             "slots": [{"kind": 1, "quantity": 10}]},
            {"pos": {"x": 0, "y": 10, "z": 2}, "owner": "steam_1", "label": "Vault",
             "locked": true, "password": "1234"}
        ]
    "#;

    #[tokio::test]
    async fn test_simulate_unlock_distributes() {
        let scenario = scenario(&format!(
            r#"{{ {}, "events": [{{"event": "unlock", "pos": {{"x": 0, "y": 10, "z": 0}}}}] }}"#,
            WORLD
        ));
        let report = simulate(&scenario, &InboxSettings::default()).await.unwrap();

        assert_eq!(report.scans.len(), 1);
        assert_eq!(report.scans[0].state, TaskState::Completed);
        assert_eq!(report.transferred(), 43);
        assert!(report.scans[0].visits.contains(&Visit::Denied {
            target: Position::new(0, 10, 2),
            reason: Denial::TargetLockedSourceNot,
        }));

        // Both notices were still up at the end and got flushed.
        assert_eq!(report.labels_pending, 2);
        assert_eq!(report.labels_flushed.restored, 2);
        let ammo = &report.containers[2];
        assert_eq!(ammo.label.as_deref(), Some("Ammo"));
        assert_eq!(
            ammo.items,
            vec![
                ItemStack::new(ItemKindId::new(1), 50),
                ItemStack::new(ItemKindId::new(2), 3)
            ]
        );
        assert!(report.containers[0].items.is_empty());
    }

    #[tokio::test]
    async fn test_simulate_lock_cancels_and_advance_restores() {
        let scenario = scenario(&format!(
            r#"{{ {}, "events": [
                {{"event": "unlock", "pos": {{"x": 0, "y": 10, "z": 0}}}},
                {{"event": "lock", "pos": {{"x": 0, "y": 10, "z": 0}}, "user": 7}},
                {{"event": "advance", "secs": 5.0}}
            ] }}"#,
            WORLD
        ));
        let report = simulate(&scenario, &InboxSettings::default()).await.unwrap();

        assert_eq!(report.scans[0].state, TaskState::Cancelled);
        assert_eq!(report.transferred(), 0);
        assert_eq!(report.labels_pending, 0);
        assert_eq!(report.containers[0].items.len(), 2);
    }

    #[tokio::test]
    async fn test_simulate_notice_expires_with_clock() {
        let scenario = scenario(&format!(
            r#"{{ {}, "events": [
                {{"event": "unlock", "pos": {{"x": 0, "y": 10, "z": 0}}}},
                {{"event": "advance", "secs": 2.0}}
            ] }}"#,
            WORLD
        ));
        let report = simulate(&scenario, &InboxSettings::default()).await.unwrap();

        // The 2s success notice expired; the 3s blocked notice is still up.
        assert_eq!(report.labels_pending, 1);
        assert_eq!(report.containers[1].label.as_deref(), Some("Vault"));
        assert_eq!(report.containers[2].label.as_deref(), Some("Ammo"));
    }

    #[tokio::test]
    async fn test_simulate_rejects_unrepresentable_advance() {
        let scenario = scenario(&format!(
            r#"{{ {}, "events": [
                {{"event": "settle"}},
                {{"event": "advance", "secs": 1e30}}
            ] }}"#,
            WORLD
        ));
        let err = simulate(&scenario, &InboxSettings::default()).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidEvent { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_basic_demo() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/basic.json");
        let scenario = Scenario::load(&path).unwrap();
        let report = simulate(&scenario, &scenario.settings.clone().unwrap_or_default())
            .await
            .unwrap();

        assert_eq!(report.transferred(), 59);
        assert!(report.scans[0].visits.contains(&Visit::Denied {
            target: Position::new(0, 38, 3),
            reason: Denial::PasswordMismatch,
        }));
        let tools = report
            .containers
            .iter()
            .find(|c| c.pos == Position::new(-2, 41, 1))
            .unwrap();
        assert_eq!(
            tools.items,
            vec![
                ItemStack::new(ItemKindId::new(205), 15),
                ItemStack::new(ItemKindId::new(330), 7)
            ]
        );
    }
}
