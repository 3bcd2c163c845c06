//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod run;

pub use run::RunArgs;

use anyhow::Result;
use clap::Subcommand;
use migr8_core::domain::run::RunMode;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create the Azure infrastructure of every application
    Create {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Deploy every application through its pipeline (infrastructure must exist)
    Deploy {
        #[command(flatten)]
        args: RunArgs,
    },
    /// Create the infrastructure, then deploy every application
    Complete {
        #[command(flatten)]
        args: RunArgs,
    },
}

impl Commands {
    fn into_parts(self) -> (RunMode, RunArgs) {
        match self {
            Commands::Create { args } => (RunMode::CreateOnly, args),
            Commands::Deploy { args } => (RunMode::DeployOnly, args),
            Commands::Complete { args } => (RunMode::Complete, args),
        }
    }
}

/// Handle a CLI command
///
/// Every subcommand is a run in the matching mode.
pub async fn handle_command(command: Commands) -> Result<()> {
    let (mode, args) = command.into_parts();
    run::handle_run(mode, args).await
}
