//! Migr8 CLI
//!
//! Provisions Azure function apps and web apps described in a manifest and
//! deploys them through Azure DevOps pipelines.

mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "migr8=info,migr8_orchestrator=info,migr8_client=info";
const VERBOSE_FILTER: &str = "migr8=debug,migr8_orchestrator=debug,migr8_client=debug";

#[derive(Parser)]
#[command(name = "migr8")]
#[command(about = "Azure infrastructure and pipeline deployment CLI", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, env = "MIGR8_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    handle_command(cli.command).await
}
