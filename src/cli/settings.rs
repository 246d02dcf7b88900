//! Settings subcommand implementation.

use crate::config::{InboxSettings, Paths};
use crate::error::CliResult;
use crate::output;
use clap::Parser;
use console::style;
use std::path::Path;

/// Show the effective settings.
#[derive(Parser, Debug)]
pub struct SettingsCommand {
    /// Write the defaults to the settings file if it does not exist yet
    #[arg(long)]
    pub init: bool,
}

impl SettingsCommand {
    /// Execute the settings command.
    pub fn execute(&self, config: Option<&Path>) -> CliResult<()> {
        let path = match config {
            Some(path) => path.to_path_buf(),
            None => Paths::get()?.settings_file(),
        };

        if self.init && !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            InboxSettings::default().save_to(&path)?;
            output::print_success(&format!("Wrote default settings to {}", path.display()));
        }

        let settings = effective_settings(&path)?;
        println!("{} {}", style("Settings file:").bold(), path.display());
        println!("{}", settings.describe());
        Ok(())
    }
}

/// Settings read from `path`, or the defaults when it does not exist.
fn effective_settings(path: &Path) -> CliResult<InboxSettings> {
    if path.exists() {
        Ok(InboxSettings::load_from(path)?)
    } else {
        output::print_info("No settings file found; using defaults");
        Ok(InboxSettings::default())
    }
}
