//! epicreport CLI: epic status reports from Azure DevOps Boards.
//!
//! Fetches epics for an area and iteration path, classifies and enriches
//! them, and writes Markdown, JSON or Word reports.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
