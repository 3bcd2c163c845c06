//! Pipelines repository
//!
//! Handles Azure DevOps pipeline operations:
//! - Creating YAML pipelines (`az pipelines create`)
//! - Queueing runs with template parameters (`az pipelines run`)
//! - Reading run status (REST, through the Azure DevOps client)

use anyhow::{Context, Result};
use async_trait::async_trait;
use migr8_client::DevOpsClient;
use migr8_core::domain::manifest::PipelineSpec;
use migr8_core::domain::pipeline::{PipelineRunStatus, QueueHandle};
use migr8_core::dto::build::Build;
use tracing::debug;

use crate::repository::az::AzCli;

/// Repository trait for pipeline operations
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Creates a pipeline from its YAML definition
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline to create
    /// * `org_url` - Azure DevOps organization URL
    async fn create_pipeline(&self, pipeline: &PipelineSpec, org_url: &str) -> Result<()>;

    /// Queues a pipeline run
    ///
    /// # Arguments
    /// * `pipeline` - The pipeline to run
    /// * `parameters` - `name=value` template parameters
    ///
    /// # Returns
    /// Handle of the queued run
    async fn queue_pipeline(
        &self,
        pipeline: &PipelineSpec,
        parameters: &[String],
    ) -> Result<QueueHandle>;

    /// Reads the current status of a queued run
    async fn get_pipeline_status(
        &self,
        org_url: &str,
        project: &str,
        handle: QueueHandle,
    ) -> Result<PipelineRunStatus>;

    /// Web page showing a run's results
    fn run_url(&self, project: &str, handle: QueueHandle) -> String;
}

/// Azure CLI + REST implementation of PipelineRepository
pub struct AzPipelineRepository {
    az: AzCli,
    client: DevOpsClient,
    pat: String,
}

impl AzPipelineRepository {
    /// Creates a pipeline repository for one organization
    ///
    /// # Arguments
    /// * `az` - Azure CLI runner
    /// * `org_url` - Azure DevOps organization URL
    /// * `pat` - Personal access token for the organization
    pub fn new(az: AzCli, org_url: &str, pat: &str) -> Self {
        Self {
            az: az.with_devops_pat(pat),
            client: DevOpsClient::new(org_url, pat),
            pat: pat.to_string(),
        }
    }

    fn client_for(&self, org_url: &str) -> DevOpsClient {
        if org_url.trim_end_matches('/') == self.client.org_url() {
            self.client.clone()
        } else {
            DevOpsClient::new(org_url, self.pat.as_str())
        }
    }
}

#[async_trait]
impl PipelineRepository for AzPipelineRepository {
    async fn create_pipeline(&self, pipeline: &PipelineSpec, org_url: &str) -> Result<()> {
        let mut args = vec![
            "pipelines",
            "create",
            "--name",
            pipeline.name.as_str(),
            "--repository",
            pipeline.repository.as_str(),
            "--repository-type",
            "tfsgit",
            "--yml-path",
            pipeline.yaml_path.as_str(),
            "--project",
            pipeline.project.as_str(),
            "--organization",
            org_url,
            "--skip-first-run",
            "true",
            "--output",
            "none",
        ];
        if !pipeline.branch.is_empty() {
            args.extend(["--branch", pipeline.branch.as_str()]);
        }

        self.az
            .run(args)
            .await
            .with_context(|| format!("Failed to create pipeline {}", pipeline.name))?;

        Ok(())
    }

    async fn queue_pipeline(
        &self,
        pipeline: &PipelineSpec,
        parameters: &[String],
    ) -> Result<QueueHandle> {
        let mut args = vec![
            "pipelines".to_string(),
            "run".to_string(),
            "--name".to_string(),
            pipeline.name.clone(),
            "--project".to_string(),
            pipeline.project.clone(),
            "--organization".to_string(),
            self.client.org_url().to_string(),
        ];
        if !pipeline.branch.is_empty() {
            args.push("--branch".to_string());
            args.push(pipeline.branch.clone());
        }
        if !parameters.is_empty() {
            args.push("--parameters".to_string());
            args.extend(parameters.iter().cloned());
        }

        let build: Build = self
            .az
            .run_json(args)
            .await
            .with_context(|| format!("Failed to run pipeline {}", pipeline.name))?;

        debug!(
            "Queued pipeline {} as build {} ({:?})",
            pipeline.name, build.id, build.build_number
        );

        Ok(build.handle())
    }

    async fn get_pipeline_status(
        &self,
        org_url: &str,
        project: &str,
        handle: QueueHandle,
    ) -> Result<PipelineRunStatus> {
        let status = self
            .client_for(org_url)
            .get_pipeline_status(project, handle)
            .await
            .with_context(|| format!("Failed to read status of run {}", handle))?;

        Ok(status)
    }

    fn run_url(&self, project: &str, handle: QueueHandle) -> String {
        self.client.build_results_url(project, handle)
    }
}
