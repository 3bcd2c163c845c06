//! Build (pipeline run) endpoints

use migr8_core::domain::pipeline::{PipelineRunStatus, QueueHandle};
use migr8_core::dto::build::Build;
use tracing::debug;

use crate::DevOpsClient;
use crate::error::Result;

impl DevOpsClient {
    /// Get a build by id
    ///
    /// # Arguments
    /// * `project` - The project owning the pipeline
    /// * `build_id` - Build id returned when the run was queued
    pub async fn get_build(&self, project: &str, build_id: u64) -> Result<Build> {
        debug!("Fetching build {} in project {}", build_id, project);

        let response = self
            .get(&format!("{}/_apis/build/builds/{}", project, build_id))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get the current status of a queued pipeline run
    pub async fn get_pipeline_status(
        &self,
        project: &str,
        handle: QueueHandle,
    ) -> Result<PipelineRunStatus> {
        let build = self.get_build(project, handle.id).await?;
        Ok(build.run_status())
    }

    /// Web URL of a run's results page
    pub fn build_results_url(&self, project: &str, handle: QueueHandle) -> String {
        format!(
            "{}/{}/_build/results?buildId={}",
            self.org_url, project, handle.id
        )
    }
}
