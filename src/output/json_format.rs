//! JSON output formatting.

use super::RunReport;
use std::io;

/// Print a run report as JSON.
pub fn print_json(report: &RunReport) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}
