//! Project endpoints

use migr8_core::dto::account::ProjectList;
use tracing::info;

use crate::DevOpsClient;
use crate::error::Result;

impl DevOpsClient {
    /// List the projects visible to the personal access token
    pub async fn list_projects(&self) -> Result<ProjectList> {
        let response = self.get("_apis/projects").send().await?;

        self.handle_response(response).await
    }

    /// Verify that the organization accepts the personal access token
    ///
    /// # Returns
    /// The number of projects visible to the token
    pub async fn verify_access(&self) -> Result<usize> {
        let projects = self.list_projects().await?;
        info!(
            "Azure DevOps organization {} reachable ({} project(s) visible)",
            self.org_url, projects.count
        );
        Ok(projects.count)
    }
}
