//! Pipeline run poller
//!
//! Follows a queued pipeline run until Azure DevOps reports it as completed.
//! Each non-terminal status query is followed by a fixed sleep; the wait can
//! be interrupted by the run's cancellation token or bounded by a timeout,
//! which cuts the last sleep short.

use migr8_core::domain::manifest::PipelineSpec;
use migr8_core::domain::pipeline::{PipelineRunStatus, QueueHandle};
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::repository::PipelineRepository;

/// Where a followed run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for an agent to pick the run up
    Queued,
    /// Executing on an agent
    Running,
    Completed,
    Errored,
}

/// How following a run ended
#[derive(Debug)]
pub enum PollOutcome {
    /// The run completed; the result is in the status
    Completed(PipelineRunStatus),
    /// A status query failed; polling stopped at the first error
    Errored(anyhow::Error),
    /// The run's cancellation token fired
    Cancelled,
    /// The configured timeout elapsed before the run completed
    TimedOut,
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Completed(_) => PollState::Completed,
            _ => PollState::Errored,
        }
    }
}

/// Follows queued pipeline runs
pub struct PipelinePoller {
    repository: Arc<dyn PipelineRepository>,
    interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl PipelinePoller {
    /// Creates a poller
    ///
    /// # Arguments
    /// * `repository` - Source of run status
    /// * `interval` - Sleep between two status queries
    pub fn new(repository: Arc<dyn PipelineRepository>, interval: Duration) -> Self {
        Self {
            repository,
            interval,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stops polling as soon as `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Polls the run until it completes, fails to report, or is interrupted
    pub async fn follow(
        &self,
        org_url: &str,
        pipeline: &PipelineSpec,
        handle: QueueHandle,
    ) -> PollOutcome {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut state = PollState::Queued;

        info!(
            "[PIPELINE {}] Following run {} (interval: {:?})",
            pipeline.name, handle, self.interval
        );

        loop {
            if self.cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let status = match self
                .repository
                .get_pipeline_status(org_url, &pipeline.project, handle)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    error!(
                        "[PIPELINE {}] Failed to read status of run {}: {:#}",
                        pipeline.name, handle, e
                    );
                    return PollOutcome::Errored(e);
                }
            };

            if status.status.is_terminal() {
                info!(
                    "[PIPELINE {}] [STATUS: {}] Run {} finished",
                    pipeline.name, status.status, handle
                );
                return PollOutcome::Completed(status);
            }

            let next = if status.status.is_queued() {
                PollState::Queued
            } else {
                PollState::Running
            };
            if next != state {
                debug!("[PIPELINE {}] Run {} is now {:?}", pipeline.name, handle, next);
                state = next;
            }

            info!(
                "[PIPELINE {}] [STATUS: {}] Waiting for pipeline to finish",
                pipeline.name, status.status
            );

            // Never sleep past the deadline
            let pause = match deadline {
                Some(deadline) => self
                    .interval
                    .min(deadline.saturating_duration_since(Instant::now())),
                None => self.interval,
            };

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("[PIPELINE {}] Stopped following run {}", pipeline.name, handle);
                    return PollOutcome::Cancelled;
                }
                _ = time::sleep(pause) => {}
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    error!(
                        "[PIPELINE {}] Run {} did not finish within {:?}",
                        pipeline.name,
                        handle,
                        self.timeout.unwrap_or_default()
                    );
                    return PollOutcome::TimedOut;
                }
            }
        }
    }
}
