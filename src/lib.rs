//! # Inbox Sort - Container Auto-Distribution Engine
//!
//! Inbox Sort empties "inbox" containers into nearby storage. When a player
//! closes an inbox, the engine walks the containers around it in expanding
//! shells, checks lock and password rules for each, and merges the inbox's
//! item stacks into the ones it may write to.
//!
//! ## Features
//!
//! - **Bounded scans**: Configurable reach, clamped to the world limits and to
//!   the land claim the inbox sits in
//! - **Nearest first**: Containers are visited shell by shell outward
//! - **Lock-aware**: Password-locked containers only accept from an inbox
//!   locked with the same password
//! - **Cooperative tasks**: One Tokio task per inbox, cancelled as soon as a
//!   player opens it
//! - **Status labels**: Temporary notices on container labels, restored on
//!   expiry and at shutdown
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use inbox_sort::clock::SystemClock;
//! use inbox_sort::config::InboxSettings;
//! use inbox_sort::distribution::DistributionOrchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = DistributionOrchestrator::new(
//!         &InboxSettings::default(),
//!         world,
//!         in_use,
//!         notifier,
//!         Arc::new(SystemClock),
//!     );
//!
//!     engine.start(inbox_pos)?;
//!     engine.wait_idle().await;
//!     engine.shutdown().await;
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Positions, regions, items and identities
//! - [`world`] - Capability traits the host implements, plus an in-memory world
//! - [`scanner`] - Scan volume and shell traversal
//! - [`distribution`] - Arbitration, merging, scan tasks and the orchestrator
//! - [`labels`] - Temporary label notices
//! - [`config`] - Settings
//! - [`error`] - Error types
//! - [`output`] - Report formatting for the reference host

pub mod cli;
pub mod clock;
pub mod config;
pub mod distribution;
pub mod error;
pub mod labels;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod types;
pub mod world;

// Re-export commonly used types
pub use distribution::{DistributionOrchestrator, StartOutcome};
pub use error::{CapabilityError, CliError, ConfigError, DistributionError};
pub use types::{BoundingRegion, ItemKindId, ItemStack, LandClaim, Position, ScanId};
