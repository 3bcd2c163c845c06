//! Stage executor
//!
//! Fans a stage out to one task per application and fans the outcomes back
//! in through a channel sized to the number of applications. The executor
//! returns only after every worker finished, so callers always see a
//! complete, stage-final set of outcomes.

use migr8_core::domain::manifest::ApplicationSpec;
use migr8_core::domain::run::{Stage, StageOutcome};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

/// Runs stage workers concurrently
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    /// Caps concurrent workers when set
    semaphore: Option<Arc<Semaphore>>,
}

impl StageExecutor {
    /// Creates an executor
    ///
    /// # Arguments
    /// * `max_concurrency` - Maximum concurrent workers; one per application when None
    pub fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            semaphore: max_concurrency.map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
        }
    }

    /// Runs `work` once per application and collects the outcomes
    ///
    /// A worker that panics is recorded as a failure of its application.
    ///
    /// # Returns
    /// One outcome per application, in order of arrival
    pub async fn run_stage<F, Fut>(
        &self,
        stage: Stage,
        applications: &[ApplicationSpec],
        work: F,
    ) -> Vec<StageOutcome>
    where
        F: Fn(ApplicationSpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StageOutcome> + Send + 'static,
    {
        if applications.is_empty() {
            debug!("No applications for stage {}", stage);
            return Vec::new();
        }

        info!(
            "Starting stage {} for {} application(s)",
            stage,
            applications.len()
        );

        let work = Arc::new(work);
        let (tx, mut rx) = mpsc::channel(applications.len());
        let mut handles = Vec::with_capacity(applications.len());

        for app in applications {
            let name = app.name.clone();
            let app = app.clone();
            let tx = tx.clone();
            let work = Arc::clone(&work);
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                // Permit is released when dropped
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let outcome = work(app).await;
                if tx.send(outcome).await.is_err() {
                    warn!("Stage channel closed before the outcome was delivered");
                }
            });

            handles.push((name, handle));
        }

        // Workers hold the remaining senders; the channel closes once all finish
        drop(tx);

        let mut crashed = Vec::new();
        for (name, handle) in handles {
            if let Err(e) = handle.await {
                error!("Worker for {} panicked during stage {}: {}", name, stage, e);
                crashed.push(StageOutcome::failed(name));
            }
        }

        let mut outcomes = Vec::with_capacity(applications.len());
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes.extend(crashed);

        info!(
            "Stage {} finished: {}/{} succeeded",
            stage,
            outcomes.iter().filter(|o| o.success).count(),
            outcomes.len()
        );

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_core::domain::manifest::{AppKind, PipelineSpec};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn apps(names: &[&str]) -> Vec<ApplicationSpec> {
        names
            .iter()
            .map(|name| ApplicationSpec {
                name: name.to_string(),
                kind: AppKind::Function,
                resource_group: String::new(),
                storage_account: String::new(),
                app_service_plan: String::new(),
                location: String::new(),
                runtime: String::new(),
                os: String::new(),
                settings: Vec::new(),
                pipeline: PipelineSpec {
                    name: format!("{}-deploy", name),
                    yaml_path: String::new(),
                    project: String::new(),
                    repository: String::new(),
                    branch: String::new(),
                    service_account: String::new(),
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_outcome_per_application() {
        let executor = StageExecutor::new(None);
        let outcomes = executor
            .run_stage(Stage::Infrastructure, &apps(&["a", "b", "c"]), |app| async move {
                StageOutcome {
                    success: app.name != "b",
                    application: app.name,
                }
            })
            .await;

        assert_eq!(outcomes.len(), 3);
        let names: HashSet<_> = outcomes.iter().map(|o| o.application.clone()).collect();
        assert_eq!(names.len(), 3);
        assert!(outcomes.iter().any(|o| o.application == "b" && !o.success));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let executor = StageExecutor::new(None);
        let outcomes = executor
            .run_stage(Stage::Agents, &apps(&["slow", "fails"]), |app| async move {
                if app.name == "slow" {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    StageOutcome::succeeded(app.name)
                } else {
                    StageOutcome::failed(app.name)
                }
            })
            .await;

        // The failing worker reports first; the slow one is still awaited
        assert_eq!(outcomes[0], StageOutcome::failed("fails"));
        assert_eq!(outcomes[1], StageOutcome::succeeded("slow"));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded_as_failed() {
        let executor = StageExecutor::new(None);
        let outcomes = executor
            .run_stage(Stage::Pipelines, &apps(&["ok", "boom"]), |app| async move {
                if app.name == "boom" {
                    panic!("collaborator exploded");
                }
                StageOutcome::succeeded(app.name)
            })
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&StageOutcome::failed("boom")));
        assert!(outcomes.contains(&StageOutcome::succeeded("ok")));
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let executor = StageExecutor::new(Some(2));
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let outcomes = executor
            .run_stage(Stage::Queue, &apps(&["a", "b", "c", "d", "e"]), move |app| {
                let running = Arc::clone(&r);
                let peak = Arc::clone(&p);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    StageOutcome::succeeded(app.name)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 5);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_stage() {
        let executor = StageExecutor::default();
        let outcomes = executor
            .run_stage(Stage::Agents, &[], |app| async move {
                StageOutcome::succeeded(app.name)
            })
            .await;
        assert!(outcomes.is_empty());
    }
}
