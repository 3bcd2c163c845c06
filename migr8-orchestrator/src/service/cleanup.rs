//! Run teardown
//!
//! Removes everything a run left behind on the local machine: agent
//! containers, the agent image, dangling images and the build context. The
//! coordinator runs its teardown at most once per process, whichever path
//! (normal exit or shutdown signal) reaches it first; later callers wait for
//! and observe that single execution.

use migr8_core::domain::run::RunMode;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::build_context;
use crate::container::ContainerRegistry;
use crate::repository::{ContainerRepository, PruneReport};

/// What the teardown did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Containers stopped and removed
    pub containers_removed: usize,
    /// Containers that could not be removed
    pub container_failures: usize,
    /// Whether the agent image existed and was deleted (None when not attempted or failed)
    pub image_deleted: Option<bool>,
    /// Result of the dangling image prune (None when not attempted or failed)
    pub pruned: Option<PruneReport>,
    /// Whether the build context directory existed and was removed
    pub build_context_removed: bool,
}

/// Runs the run teardown exactly once
pub struct CleanupCoordinator {
    mode: RunMode,
    containers: Arc<dyn ContainerRepository>,
    registry: ContainerRegistry,
    image: String,
    build_context_dir: PathBuf,
    done: OnceCell<CleanupReport>,
}

impl CleanupCoordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    /// * `mode` - Run mode; container teardown only happens for deployment modes
    /// * `containers` - Container engine backend
    /// * `registry` - Containers started during the run
    /// * `image` - Agent image reference
    /// * `build_context_dir` - Agent build context directory
    pub fn new(
        mode: RunMode,
        containers: Arc<dyn ContainerRepository>,
        registry: ContainerRegistry,
        image: impl Into<String>,
        build_context_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            containers,
            registry,
            image: image.into(),
            build_context_dir: build_context_dir.into(),
            done: OnceCell::new(),
        }
    }

    /// Runs the teardown, or waits for the one already running
    pub async fn run(&self) -> &CleanupReport {
        self.done.get_or_init(|| self.teardown()).await
    }

    /// Whether the teardown has completed
    pub fn has_run(&self) -> bool {
        self.done.initialized()
    }

    async fn teardown(&self) -> CleanupReport {
        info!("Cleaning up run resources");

        let (mut report, build_context_removed) =
            tokio::join!(self.teardown_containers(), self.remove_build_context());
        report.build_context_removed = build_context_removed;

        info!(
            "Cleanup finished: {} container(s) removed, {} failure(s)",
            report.containers_removed, report.container_failures
        );

        report
    }

    async fn teardown_containers(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        if !self.mode.deploys() {
            debug!("No deployment stages in this run, skipping container teardown");
            return report;
        }

        let mut tasks = JoinSet::new();
        for id in self.registry.drain() {
            let containers = Arc::clone(&self.containers);
            tasks.spawn(async move { remove_container(containers.as_ref(), &id).await });
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => report.containers_removed += 1,
                Ok(false) => report.container_failures += 1,
                Err(e) => {
                    error!("Container teardown task panicked: {}", e);
                    report.container_failures += 1;
                }
            }
        }

        // Containers are gone; the image is no longer in use
        report.image_deleted = match self.containers.delete_image(&self.image).await {
            Ok(true) => {
                info!("Deleted agent image {}", self.image);
                Some(true)
            }
            Ok(false) => {
                warn!("Agent image {} not found, nothing to delete", self.image);
                Some(false)
            }
            Err(e) => {
                error!("Failed to delete agent image {}: {:#}", self.image, e);
                None
            }
        };

        report.pruned = match self.containers.prune_dangling_images().await {
            Ok(pruned) => {
                info!(
                    "Pruned {} dangling image(s){}",
                    pruned.images_deleted.len(),
                    pruned
                        .space_reclaimed
                        .as_deref()
                        .map(|space| format!(", reclaimed {}", space))
                        .unwrap_or_default()
                );
                Some(pruned)
            }
            Err(e) => {
                error!("Failed to prune dangling images: {:#}", e);
                None
            }
        };

        report
    }

    async fn remove_build_context(&self) -> bool {
        match build_context::remove(&self.build_context_dir).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("{:#}", e);
                false
            }
        }
    }
}

/// Stops then removes one container; removal is attempted even if stop fails
async fn remove_container(containers: &dyn ContainerRepository, id: &str) -> bool {
    if let Err(e) = containers.stop_container(id).await {
        warn!("Failed to stop container {}: {:#}", id, e);
    }

    match containers.purge_container(id).await {
        Ok(()) => {
            info!("Removed container {}", id);
            true
        }
        Err(e) => {
            error!("Failed to remove container {}: {:#}", id, e);
            false
        }
    }
}
