//! Output formatting module.
//!
//! Provides plain text and JSON renderings of a scenario run.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{print_error, print_info, print_plain, print_success, print_warning};

use crate::cli::OutputFormat;
use crate::distribution::ScanReport;
use crate::labels::FlushReport;
use crate::types::{ItemStack, Position};
use crate::world::memory::Notification;
use crate::world::ContainerRole;
use serde::Serialize;
use std::io;

/// Final state of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub pos: Position,
    pub role: ContainerRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Non-empty slots only.
    pub items: Vec<ItemStack>,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scans: Vec<ScanReport>,
    pub notifications: Vec<Notification>,
    /// Labels still overridden when the run ended.
    pub labels_pending: usize,
    pub labels_flushed: FlushReport,
    pub containers: Vec<ContainerSummary>,
}

impl RunReport {
    /// Total quantity moved across every scan.
    pub fn transferred(&self) -> u32 {
        self.scans.iter().map(ScanReport::transferred).sum()
    }
}

/// Format and print a run report according to the specified format.
pub fn print_report(report: &RunReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => plain::print_plain(report),
        OutputFormat::Json => json_format::print_json(report),
    }
}
