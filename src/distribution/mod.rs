//! Distribution engine.
//!
//! The orchestrator drives one scan task per inbox; each candidate found by the
//! shell traversal goes through the access arbiter and, when permitted, the
//! stack merger.

pub mod access;
pub mod merge;
pub mod orchestrator;
pub mod tasks;

pub use access::{AccessArbiter, Decision, Denial};
pub use merge::{combine_stacks, StackMerger};
pub use orchestrator::{DistributionOrchestrator, ScanReport, StartOutcome, Visit};
pub use tasks::{ScanTaskHandle, ScanTaskManager, TaskState};
