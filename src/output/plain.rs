//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use super::RunReport;
use crate::distribution::{TaskState, Visit};
use crate::types::ItemStack;
use crate::world::memory::Notification;
use crate::world::ContainerRole;
use console::{style, Style};
use std::io::{self, Write};

const RULE_WIDTH: usize = 63;

/// Print a run report in human-readable plain text format.
pub fn print_plain(report: &RunReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let heavy = "═".repeat(RULE_WIDTH);
    let light = "─".repeat(RULE_WIDTH);

    writeln!(out)?;
    writeln!(out, "{}", style(&heavy).cyan())?;
    writeln!(
        out,
        "                  {} Distribution Report",
        style("Inbox Sort").cyan().bold()
    )?;
    writeln!(out, "{}", style(&heavy).cyan())?;
    writeln!(out)?;

    writeln!(
        out,
        "  {} {} scan(s), {} item(s) moved",
        style("Statistics:").bold(),
        report.scans.len(),
        style(report.transferred()).green().bold()
    )?;
    writeln!(
        out,
        "               {} label(s) pending at shutdown, {} restored, {} failed",
        report.labels_pending,
        style(report.labels_flushed.restored).green(),
        style(report.labels_flushed.failed).red()
    )?;
    writeln!(out)?;

    for scan in &report.scans {
        let state_style = match scan.state {
            TaskState::Completed => Style::new().green().bold(),
            TaskState::Cancelled => Style::new().yellow().bold(),
            TaskState::Idle | TaskState::Scanning => Style::new().dim(),
        };
        writeln!(
            out,
            "  {} {} from {} in {} [{}]",
            style("Scan").bold(),
            style(scan.scan.short()).dim(),
            scan.source,
            scan.region,
            state_style.apply_to(scan.state)
        )?;
        if scan.visits.is_empty() {
            writeln!(out, "      {}", style("no candidate containers").dim())?;
        }
        for visit in &scan.visits {
            match visit {
                Visit::Transferred { target, quantity } => writeln!(
                    out,
                    "      {} {:<16} {} item(s)",
                    style("→").green(),
                    target.to_string(),
                    quantity
                )?,
                Visit::Denied { target, reason } => writeln!(
                    out,
                    "      {} {:<16} {}",
                    style("✗").yellow(),
                    target.to_string(),
                    style(reason).yellow()
                )?,
                Visit::Failed { target } => writeln!(
                    out,
                    "      {} {:<16} {}",
                    style("!").red().bold(),
                    target.to_string(),
                    style("failed").red()
                )?,
            }
        }
    }
    writeln!(out)?;

    if !report.notifications.is_empty() {
        writeln!(out, "  {}", style("Notifications:").bold())?;
        for notification in &report.notifications {
            match notification {
                Notification::Cue { pos, cue } => writeln!(
                    out,
                    "      {:<16} {} ({})",
                    pos.to_string(),
                    style("cue").dim(),
                    cue.sound()
                )?,
                Notification::Message { user, message, pos } => writeln!(
                    out,
                    "      {:<16} {} {}: {}",
                    pos.to_string(),
                    style("message").dim(),
                    user,
                    message
                )?,
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "  {}", style(&light).dim())?;
    writeln!(
        out,
        "  {:<16}  {:<7}  {:<20}  {}",
        style("POSITION").bold(),
        style("ROLE").bold(),
        style("LABEL").bold(),
        style("ITEMS").bold()
    )?;
    writeln!(out, "  {}", style(&light).dim())?;
    for container in &report.containers {
        let role = match container.role {
            ContainerRole::Inbox => style("inbox").cyan(),
            ContainerRole::InsecureInbox => style("inbox*").cyan().dim(),
            ContainerRole::Storage => style("storage").white(),
        };
        let label = container
            .label
            .as_deref()
            .map(|text| truncate_string(&text.replace('\n', " "), 20))
            .unwrap_or_default();
        writeln!(
            out,
            "  {:<16}  {:<7}  {:<20}  {}",
            container.pos.to_string(),
            role,
            label,
            format_items(&container.items)
        )?;
    }
    writeln!(out, "  {}", style(&light).dim())?;
    writeln!(out)?;

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

fn format_items(items: &[ItemStack]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .filter_map(|stack| stack.kind.map(|kind| format!("{}x{}", stack.quantity, kind)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemKindId;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
    }

    #[test]
    fn test_format_items() {
        assert_eq!(format_items(&[]), "-");
        assert_eq!(
            format_items(&[
                ItemStack::new(ItemKindId::new(1), 40),
                ItemStack::new(ItemKindId::new(9), 2)
            ]),
            "40x#1, 2x#9"
        );
    }
}
