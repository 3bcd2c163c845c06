//! Run orchestration
//!
//! Drives the stages selected by the run mode strictly in order. Each stage
//! fans out to one worker per application and completes before the next
//! one starts; its ledger is then frozen into the run context and consulted
//! by the dependency gate of later stages.

use anyhow::{Context, Result};
use migr8_core::domain::manifest::Manifest;
use migr8_core::domain::run::{RunMode, Stage, StageOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::RunContext;
use crate::gate::PriorOutcomes;
use crate::ledger::StageLedger;
use crate::repository::{AgentRepository, InfrastructureRepository, PipelineRepository};
use crate::scheduler::{PipelinePoller, StageExecutor};
use crate::service::StageWorkers;

/// External collaborators of a run
#[derive(Clone)]
pub struct Repositories {
    pub agents: Arc<dyn AgentRepository>,
    pub infrastructure: Arc<dyn InfrastructureRepository>,
    pub pipelines: Arc<dyn PipelineRepository>,
}

/// Runs deployment stages for every application of a manifest
pub struct Orchestrator {
    config: Config,
    manifest: Arc<Manifest>,
    agents: Arc<dyn AgentRepository>,
    workers: StageWorkers,
    executor: StageExecutor,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    /// * `config` - Orchestrator configuration
    /// * `manifest` - Validated manifest
    /// * `subscription_id` - Azure subscription passed to queued pipelines
    /// * `repositories` - External collaborators
    /// * `cancel` - Token cancelled by the shutdown path; stops status polling
    pub fn new(
        config: Config,
        manifest: Arc<Manifest>,
        subscription_id: impl Into<String>,
        repositories: Repositories,
        cancel: CancellationToken,
    ) -> Self {
        let poller = PipelinePoller::new(Arc::clone(&repositories.pipelines), config.poll_interval)
            .with_timeout(config.poll_timeout)
            .with_cancellation(cancel.clone());

        let workers = StageWorkers {
            agents: Arc::clone(&repositories.agents),
            infrastructure: repositories.infrastructure,
            pipelines: repositories.pipelines,
            poller: Arc::new(poller),
            manifest: Arc::clone(&manifest),
            subscription_id: subscription_id.into(),
            agent_image: config.agent_image_ref(),
        };

        Self {
            executor: StageExecutor::new(config.max_concurrency),
            agents: repositories.agents,
            config,
            manifest,
            workers,
            cancel,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Executes every stage of the run mode
    ///
    /// Per-application failures end up in the returned ledgers. Only a
    /// failure to build the agent image aborts the run.
    pub async fn run(&self, mode: RunMode) -> Result<RunContext> {
        let mut ctx = RunContext::new(mode);

        info!(
            "Starting {} run {} for {} application(s) of {}",
            mode,
            ctx.run_id,
            self.manifest.infrastructure.len(),
            if self.manifest.app.is_empty() { "manifest" } else { self.manifest.app.as_str() }
        );

        if mode.deploys() {
            let image = self.config.agent_image_ref();
            self.agents
                .prepare_agent_image(&self.config.build_context_dir, &image)
                .await
                .with_context(|| format!("Failed to prepare deployment agent image {}", image))?;
        }

        for stage in mode.stages() {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled, skipping stage {}", stage);
                break;
            }

            info!("[{}] Running stage for all applications", stage.label());
            let outcomes = self.run_stage(stage, &ctx).await;
            ctx.complete_stage(StageLedger::from_outcomes(stage, outcomes));
        }

        info!(
            "Run {} finished in {}s",
            ctx.run_id,
            ctx.elapsed().num_seconds()
        );

        Ok(ctx)
    }

    async fn run_stage(&self, stage: Stage, ctx: &RunContext) -> Vec<StageOutcome> {
        let applications = &self.manifest.infrastructure;
        let workers = self.workers.clone();

        match stage {
            Stage::Agents => {
                self.executor
                    .run_stage(stage, applications, move |app| {
                        let workers = workers.clone();
                        async move { workers.start_agent(&app).await }
                    })
                    .await
            }
            Stage::Infrastructure => {
                self.executor
                    .run_stage(stage, applications, move |app| {
                        let workers = workers.clone();
                        async move { workers.create_infrastructure(&app).await }
                    })
                    .await
            }
            Stage::Pipelines | Stage::Queue => {
                let mode = ctx.mode;
                let ledgers = CompletedLedgers::from_context(ctx);
                self.executor
                    .run_stage(stage, applications, move |app| {
                        let workers = workers.clone();
                        let ledgers = ledgers.clone();
                        async move {
                            let prior = ledgers.prior();
                            if stage == Stage::Pipelines {
                                workers.create_pipeline(mode, prior, &app).await
                            } else {
                                workers.queue_pipeline(mode, prior, &app).await
                            }
                        }
                    })
                    .await
            }
        }
    }
}

/// Owned handles on the ledgers the dependency gate consults
#[derive(Clone)]
struct CompletedLedgers {
    agents: Arc<StageLedger>,
    infrastructure: Arc<StageLedger>,
    pipelines: Arc<StageLedger>,
}

impl CompletedLedgers {
    fn from_context(ctx: &RunContext) -> Self {
        Self {
            agents: Arc::clone(ctx.ledger(Stage::Agents)),
            infrastructure: Arc::clone(ctx.ledger(Stage::Infrastructure)),
            pipelines: Arc::clone(ctx.ledger(Stage::Pipelines)),
        }
    }

    fn prior(&self) -> PriorOutcomes<'_> {
        PriorOutcomes {
            agents: &self.agents,
            infrastructure: &self.infrastructure,
            pipelines: &self.pipelines,
        }
    }
}
