//! Stage workers
//!
//! One async function per stage, each turning a collaborator call for a
//! single application into a `StageOutcome`. Collaborator errors are logged
//! here and never cross the stage boundary.

use migr8_core::domain::manifest::{ApplicationSpec, Manifest};
use migr8_core::domain::pipeline::RunResult;
use migr8_core::domain::run::{RunMode, Stage, StageOutcome};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::gate::{self, GateDecision, Prerequisite, PriorOutcomes};
use crate::params;
use crate::repository::{AgentConfig, AgentRepository, InfrastructureRepository, PipelineRepository};
use crate::scheduler::{PipelinePoller, PollOutcome};

/// Shared dependencies of the stage workers
///
/// Cheap to clone; every spawned worker gets its own handle.
#[derive(Clone)]
pub struct StageWorkers {
    pub(crate) agents: Arc<dyn AgentRepository>,
    pub(crate) infrastructure: Arc<dyn InfrastructureRepository>,
    pub(crate) pipelines: Arc<dyn PipelineRepository>,
    pub(crate) poller: Arc<PipelinePoller>,
    pub(crate) manifest: Arc<Manifest>,
    pub(crate) subscription_id: String,
    pub(crate) agent_image: String,
}

impl StageWorkers {
    /// Starts the deployment agent container of an application
    pub async fn start_agent(&self, app: &ApplicationSpec) -> StageOutcome {
        let config = AgentConfig {
            org_url: self.manifest.org_url().to_string(),
            pat: self.manifest.pat.clone(),
            pool: self.manifest.agent_pool.clone(),
            container_name: app.agent_container_name(),
            image: self.agent_image.clone(),
        };

        match self.agents.start_agent(&config).await {
            Ok(id) => {
                info!("[AGENT {}] Agent {} is running ({})", app.name, config.container_name, id);
                StageOutcome::succeeded(&app.name)
            }
            Err(e) => {
                error!("[AGENT {}] Failed to start deployment agent: {:#}", app.name, e);
                StageOutcome::failed(&app.name)
            }
        }
    }

    /// Creates the Azure resources of an application
    pub async fn create_infrastructure(&self, app: &ApplicationSpec) -> StageOutcome {
        match self.infrastructure.create_infrastructure(app).await {
            Ok(()) => {
                info!(
                    "[{} {}] Infrastructure created",
                    app.kind.to_string().to_uppercase(),
                    app.name
                );
                StageOutcome::succeeded(&app.name)
            }
            Err(e) => {
                error!("[{} {}] {:#}", app.kind.to_string().to_uppercase(), app.name, e);
                StageOutcome::failed(&app.name)
            }
        }
    }

    /// Creates the pipeline of an application once its infrastructure exists
    pub async fn create_pipeline(
        &self,
        mode: RunMode,
        prior: PriorOutcomes<'_>,
        app: &ApplicationSpec,
    ) -> StageOutcome {
        let pipeline = &app.pipeline;

        let decision = gate::should_run(mode, Stage::Pipelines, prior, &app.name);
        if let GateDecision::Blocked(_) = decision {
            warn!(
                "[PIPELINE {}] The infrastructure was not created, skipping pipeline creation",
                pipeline.name
            );
            return StageOutcome::failed(&app.name);
        }

        match self
            .pipelines
            .create_pipeline(pipeline, self.manifest.org_url())
            .await
        {
            Ok(()) => {
                info!("[PIPELINE {}] Pipeline created for {}", pipeline.name, app.name);
                StageOutcome::succeeded(&app.name)
            }
            Err(e) => {
                error!(
                    "[PIPELINE {}] Failed to create pipeline for {} {}: {:#}",
                    pipeline.name, app.kind, app.name, e
                );
                StageOutcome::failed(&app.name)
            }
        }
    }

    /// Queues the pipeline of an application and follows the run to completion
    pub async fn queue_pipeline(
        &self,
        mode: RunMode,
        prior: PriorOutcomes<'_>,
        app: &ApplicationSpec,
    ) -> StageOutcome {
        let pipeline = &app.pipeline;

        let decision = gate::should_run(mode, Stage::Queue, prior, &app.name);
        if let GateDecision::Blocked(missing) = decision {
            for prerequisite in missing {
                match prerequisite {
                    Prerequisite::Agent => warn!(
                        "[PIPELINE {}] The agent was not created, \
                         skipping queueing for an offline agent",
                        pipeline.name
                    ),
                    Prerequisite::Pipeline => warn!(
                        "[PIPELINE {}] The pipeline was not created, \
                         skipping queueing for an unknown pipeline",
                        pipeline.name
                    ),
                    Prerequisite::Infrastructure => {}
                }
            }
            return StageOutcome::failed(&app.name);
        }

        let parameters =
            params::pipeline_parameters(app, &self.manifest.agent_pool, &self.subscription_id);

        let handle = match self.pipelines.queue_pipeline(pipeline, &parameters).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("[PIPELINE {}] Failed to run pipeline: {:#}", pipeline.name, e);
                return StageOutcome::failed(&app.name);
            }
        };

        info!("[PIPELINE {}] Queued as run {}, starting status polling", pipeline.name, handle);

        let status = match self
            .poller
            .follow(self.manifest.org_url(), pipeline, handle)
            .await
        {
            PollOutcome::Completed(status) => status,
            PollOutcome::Errored(_) => return StageOutcome::failed(&app.name),
            PollOutcome::Cancelled => {
                warn!(
                    "[PIPELINE {}] Polling cancelled before run {} finished",
                    pipeline.name, handle
                );
                return StageOutcome::failed(&app.name);
            }
            PollOutcome::TimedOut => return StageOutcome::failed(&app.name),
        };

        let url = self.pipelines.run_url(&pipeline.project, handle);
        match status.result {
            Some(RunResult::Failed) => {
                error!(
                    "[PIPELINE {}] Completed with status failed. \
                     Check {} for the errors and rerun with 'migr8 {}'",
                    pipeline.name,
                    url,
                    RunMode::DeployOnly.command_name()
                );
                StageOutcome::failed(&app.name)
            }
            Some(RunResult::Canceled) => {
                warn!("[PIPELINE {}] Run was canceled in Azure DevOps: {}", pipeline.name, url);
                StageOutcome::failed(&app.name)
            }
            Some(RunResult::Succeeded) => {
                info!("[PIPELINE {}] Completed with status succeeded", pipeline.name);
                StageOutcome::succeeded(&app.name)
            }
            Some(other) => {
                warn!("[PIPELINE {}] Completed with status {}: {}", pipeline.name, other, url);
                StageOutcome::succeeded(&app.name)
            }
            None => {
                warn!("[PIPELINE {}] Completed without a result: {}", pipeline.name, url);
                StageOutcome::succeeded(&app.name)
            }
        }
    }
}
