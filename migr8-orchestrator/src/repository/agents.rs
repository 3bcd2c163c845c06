//! Agents repository
//!
//! Builds the deployment agent image and starts one agent container per
//! application.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Settings of one deployment agent container
#[derive(Clone)]
pub struct AgentConfig {
    /// Azure DevOps organization URL the agent registers with
    pub org_url: String,
    /// Personal access token used for registration
    pub pat: String,
    /// Agent pool to join
    pub pool: String,
    /// Container name, also used as the agent name
    pub container_name: String,
    /// Image reference to run
    pub image: String,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("org_url", &self.org_url)
            .field("pool", &self.pool)
            .field("container_name", &self.container_name)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

/// Repository trait for deployment agents
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Writes the agent build context and builds the agent image
    ///
    /// # Arguments
    /// * `build_context` - Directory to write the build context into
    /// * `image` - Image reference to tag the build with
    async fn prepare_agent_image(&self, build_context: &Path, image: &str) -> Result<()>;

    /// Starts an agent container
    ///
    /// On success the container id is tracked for teardown.
    ///
    /// # Returns
    /// The container id
    async fn start_agent(&self, config: &AgentConfig) -> Result<String>;
}
