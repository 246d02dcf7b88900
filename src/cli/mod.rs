//! CLI subcommand definitions and handlers.
//!
//! The binary is a reference host for the engine:
//! - `inbox-sort run <scenario>` - Replay a scenario against an in-memory world
//! - `inbox-sort settings` - Show the effective settings

mod run;
mod scenario;
mod settings;

pub use run::{simulate, RunCommand};
pub use scenario::{ClaimSpec, ContainerSpec, Scenario, ScenarioEvent};
pub use settings::SettingsCommand;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inbox Sort - empties inbox containers into nearby storage.
///
/// Runs the distribution engine against a scripted world so its behavior can
/// be inspected without a game server.
#[derive(Parser, Debug)]
#[command(name = "inbox-sort")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inbox container auto-distribution engine", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a settings file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH", env = "INBOX_SORT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario file
    #[command(alias = "r")]
    Run(RunCommand),

    /// Show the effective settings
    #[command(alias = "s")]
    Settings(SettingsCommand),
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "inbox-sort",
            "run",
            "demos/basic.json",
            "--format",
            "json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.scenario, PathBuf::from("demos/basic.json"));
                assert_eq!(cmd.format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_settings_with_config() {
        let cli =
            Cli::try_parse_from(["inbox-sort", "settings", "--config", "/tmp/s.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        assert!(matches!(cli.command, Commands::Settings(_)));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Plain.to_string(), "plain");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
