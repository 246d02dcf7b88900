//! Inbox Sort reference host.

use anyhow::{Context, Result};
use clap::Parser;
use inbox_sort::cli::{Cli, Commands};
use inbox_sort::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Run(cmd) => cmd
            .execute(config)
            .await
            .with_context(|| format!("scenario {} failed", cmd.scenario.display())),
        Commands::Settings(cmd) => cmd.execute(config).context("could not show settings"),
    }
}
