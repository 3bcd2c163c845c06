//! Containers repository
//!
//! Teardown operations on the container engine.

use anyhow::Result;
use async_trait::async_trait;

/// Result of pruning dangling images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Ids of deleted images
    pub images_deleted: Vec<String>,
    /// Reclaimed space as reported by the engine, when it reports one
    pub space_reclaimed: Option<String>,
}

/// Repository trait for container teardown
#[async_trait]
pub trait ContainerRepository: Send + Sync {
    /// Stops a running container
    async fn stop_container(&self, id: &str) -> Result<()>;

    /// Removes a container
    async fn purge_container(&self, id: &str) -> Result<()>;

    /// Deletes an image
    ///
    /// # Returns
    /// `false` if the image did not exist
    async fn delete_image(&self, image: &str) -> Result<bool>;

    /// Removes dangling images
    async fn prune_dangling_images(&self) -> Result<PruneReport>;
}
