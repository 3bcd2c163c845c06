//! Run command handler
//!
//! Loads and validates the manifest, checks access to Azure DevOps and
//! Azure, then drives the orchestrator. Resources started by the run are
//! torn down on the way out, including when the process is interrupted.

use anyhow::{Context, Result};
use clap::Args;
use migr8_client::DevOpsClient;
use migr8_core::domain::manifest::Manifest;
use migr8_core::domain::run::RunMode;
use migr8_orchestrator::container::{self, ContainerEngine, ContainerRegistry};
use migr8_orchestrator::repository::{AzCli, AzInfrastructureRepository, AzPipelineRepository};
use migr8_orchestrator::service::{CleanupCoordinator, ReportTable};
use migr8_orchestrator::signal::spawn_signal_listener;
use migr8_orchestrator::{Config, Orchestrator, Repositories};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output;

/// Arguments shared by every run subcommand
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the JSON manifest describing the applications
    #[arg(short, long, env = "MIGR8_MANIFEST")]
    pub manifest: PathBuf,
}

/// Handle a run in the given mode
pub async fn handle_run(mode: RunMode, args: RunArgs) -> Result<()> {
    let manifest = load_manifest(&args.manifest, mode)?;

    let config = Config::from_env();
    config.validate()?;

    output::print_banner(mode, &manifest);

    let devops = DevOpsClient::new(manifest.org_url(), &manifest.pat);
    devops.verify_access().await.with_context(|| {
        format!(
            "Failed to access Azure DevOps organization {}",
            manifest.org_url()
        )
    })?;

    let az = AzCli::new(&config.az_binary);
    let subscription = az
        .login(manifest.subscription.as_deref())
        .await
        .context("Failed to log in to Azure")?;

    if mode.deploys() {
        container::check_engine_available(&config.container_engine).await?;
    }

    let registry = ContainerRegistry::new();
    let engine = Arc::new(ContainerEngine::new(&config.container_engine, registry.clone()));

    let cleanup = Arc::new(CleanupCoordinator::new(
        mode,
        engine.clone(),
        registry,
        config.agent_image_ref(),
        &config.build_context_dir,
    ));
    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone(), Arc::clone(&cleanup));

    let manifest = Arc::new(manifest);
    let repositories = Repositories {
        agents: engine,
        infrastructure: Arc::new(AzInfrastructureRepository::new(az.clone())),
        pipelines: Arc::new(AzPipelineRepository::new(az, manifest.org_url(), &manifest.pat)),
    };

    let orchestrator = Orchestrator::new(
        config,
        Arc::clone(&manifest),
        subscription.id,
        repositories,
        cancel,
    );

    let result = orchestrator.run(mode).await;

    // Teardown also covers a run aborted by a fatal error
    cleanup.run().await;

    let ctx = result?;
    let table = ReportTable::from_context(&ctx, &manifest.infrastructure);
    output::print_summary(&table, ctx.elapsed());

    info!("Run {} complete", ctx.run_id);
    Ok(())
}

/// Reads, parses and validates a manifest for a run mode
fn load_manifest(path: &Path, mode: RunMode) -> Result<Manifest> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;

    let manifest = Manifest::from_json(&source)
        .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

    manifest
        .validate(mode)
        .with_context(|| format!("Invalid manifest {}", path.display()))?;

    info!(
        "Loaded manifest {} with {} application(s)",
        path.display(),
        manifest.infrastructure.len()
    );

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "pat": "secret",
        "devopsOrg": "https://dev.azure.com/contoso",
        "infrastructure": [
            {
                "type": "function",
                "name": "orders",
                "pipeline": { "name": "orders-deploy" }
            }
        ]
    }"#;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_load_manifest() {
        let file = write(MANIFEST);
        let manifest = load_manifest(file.path(), RunMode::CreateOnly).unwrap();
        assert_eq!(manifest.infrastructure.len(), 1);
    }

    #[test]
    fn test_deploy_requires_agent_pool() {
        let file = write(MANIFEST);
        let err = load_manifest(file.path(), RunMode::DeployOnly).unwrap_err();
        assert!(err.to_string().contains("Invalid manifest"));
    }

    #[test]
    fn test_missing_manifest() {
        let err =
            load_manifest(Path::new("/nonexistent/migr8.json"), RunMode::Complete).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn test_malformed_manifest() {
        let file = write("{ not json");
        let err = load_manifest(file.path(), RunMode::Complete).unwrap_err();
        assert!(err.to_string().contains("Failed to parse manifest"));
    }
}
