//! Container engine management
//!
//! Handles the lifecycle of deployment agent containers:
//! - Building the agent image from the generated build context
//! - Starting one agent container per application
//! - Tracking every started container for teardown
//! - Stopping and removing containers, deleting and pruning images
//!
//! Works with any docker-compatible CLI (podman by default).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::build_context;
use crate::repository::{AgentConfig, AgentRepository, ContainerRepository, PruneReport};

/// Ids of the containers started during a run
///
/// Cloned handles share the same list.
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    ids: Arc<Mutex<Vec<String>>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a started container
    pub fn track(&self, id: impl Into<String>) {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.push(id.into());
    }

    /// Ids tracked so far
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Takes every tracked id, leaving the registry empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.ids.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks if the container engine is installed and available
pub async fn check_engine_available(binary: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("--version")
        .output()
        .await
        .with_context(|| format!("Failed to execute '{} --version'. Is it installed?", binary))?;

    if !output.status.success() {
        anyhow::bail!("{} is not working correctly", binary);
    }

    let version = String::from_utf8_lossy(&output.stdout);
    info!("Container engine is available: {}", version.trim());

    Ok(())
}

/// Container engine CLI backend for agents and teardown
pub struct ContainerEngine {
    binary: String,
    registry: ContainerRegistry,
}

impl ContainerEngine {
    /// Creates an engine backend
    ///
    /// # Arguments
    /// * `binary` - Engine CLI (e.g., "podman" or "docker")
    /// * `registry` - Registry that receives the ids of started containers
    pub fn new(binary: impl Into<String>, registry: ContainerRegistry) -> Self {
        Self {
            binary: binary.into(),
            registry,
        }
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    /// Runs an engine command and returns its raw output
    async fn exec<I, S>(&self, args: I, envs: &[(&str, &str)]) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary)
            .args(args)
            .envs(envs.iter().copied())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute {} command", self.binary))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", self.binary, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.binary, stderr.trim());
        }

        Ok(output)
    }

    /// Runs an engine command and fails on a non-zero exit
    async fn exec_checked<I, S>(&self, what: &str, args: I, envs: &[(&str, &str)]) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.exec(args, envs).await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error_msg = format!(
                "Failed to {}: exit_code={}, stderr='{}'",
                what,
                exit_code,
                stderr.trim()
            );

            error!("{}", error_msg);
            anyhow::bail!("{}", error_msg);
        }

        Ok(stdout)
    }
}

#[async_trait]
impl AgentRepository for ContainerEngine {
    async fn prepare_agent_image(&self, build_context: &Path, image: &str) -> Result<()> {
        build_context::write(build_context).await?;

        info!("Building agent image {}", image);
        self.exec_checked(
            &format!("build image {}", image),
            [OsStr::new("build"), OsStr::new("-t"), OsStr::new(image), build_context.as_os_str()],
            &[],
        )
        .await?;

        info!("Agent image {} built successfully", image);
        Ok(())
    }

    async fn start_agent(&self, config: &AgentConfig) -> Result<String> {
        // Leftover from an interrupted earlier run
        let _ = self
            .exec(["rm", "-f", config.container_name.as_str()], &[])
            .await;

        info!(
            "Starting agent container {} with image {}",
            config.container_name, config.image
        );

        // Values travel through the environment so the token never appears
        // on the engine's command line
        let stdout = self
            .exec_checked(
                &format!("start agent container {}", config.container_name),
                [
                    "run",
                    "-d",
                    "--name",
                    config.container_name.as_str(),
                    "-e",
                    "AZP_URL",
                    "-e",
                    "AZP_TOKEN",
                    "-e",
                    "AZP_POOL",
                    "-e",
                    "AZP_AGENT_NAME",
                    config.image.as_str(),
                ],
                &[
                    ("AZP_URL", config.org_url.as_str()),
                    ("AZP_TOKEN", config.pat.as_str()),
                    ("AZP_POOL", config.pool.as_str()),
                    ("AZP_AGENT_NAME", config.container_name.as_str()),
                ],
            )
            .await?;

        let container_id = stdout.trim().to_string();
        if container_id.is_empty() {
            anyhow::bail!(
                "{} run returned no container id for {}",
                self.binary,
                config.container_name
            );
        }

        self.registry.track(container_id.clone());
        info!(
            "Container {} started successfully with ID: {}",
            config.container_name, container_id
        );

        Ok(container_id)
    }
}

#[async_trait]
impl ContainerRepository for ContainerEngine {
    async fn stop_container(&self, id: &str) -> Result<()> {
        debug!("Stopping container {}", id);
        self.exec_checked(&format!("stop container {}", id), ["stop", id], &[])
            .await?;
        Ok(())
    }

    async fn purge_container(&self, id: &str) -> Result<()> {
        debug!("Removing container {}", id);
        self.exec_checked(&format!("remove container {}", id), ["rm", "-f", id], &[])
            .await?;
        Ok(())
    }

    async fn delete_image(&self, image: &str) -> Result<bool> {
        let inspect = self.exec(["image", "inspect", image], &[]).await?;
        if !inspect.status.success() {
            return Ok(false);
        }

        self.exec_checked(&format!("delete image {}", image), ["rmi", "-f", image], &[])
            .await?;
        Ok(true)
    }

    async fn prune_dangling_images(&self) -> Result<PruneReport> {
        let stdout = self
            .exec_checked("prune dangling images", ["image", "prune", "-f"], &[])
            .await?;
        Ok(parse_prune_output(&stdout))
    }
}

/// Parses the output of `image prune`
///
/// Docker lists `deleted: <id>` lines followed by a reclaimed space summary;
/// podman prints one bare id per line.
fn parse_prune_output(stdout: &str) -> PruneReport {
    let mut report = PruneReport::default();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(space) = line.strip_prefix("Total reclaimed space:") {
            report.space_reclaimed = Some(space.trim().to_string());
        } else if let Some(id) = line.strip_prefix("deleted:") {
            report.images_deleted.push(id.trim().to_string());
        } else if !line.contains(' ') && !line.contains(':') {
            report.images_deleted.push(line.to_string());
        } else if let Some(id) = line.strip_prefix("sha256:") {
            report.images_deleted.push(format!("sha256:{}", id));
        }
    }

    report
}
