//! In-memory collaborators for orchestration tests

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use migr8_core::domain::manifest::{ApplicationSpec, Manifest, PipelineSpec};
use migr8_core::domain::pipeline::{PipelineRunStatus, QueueHandle, RunResult};
use migr8_orchestrator::container::ContainerRegistry;
use migr8_orchestrator::repository::{
    AgentConfig, AgentRepository, ContainerRepository, InfrastructureRepository, PipelineRepository,
    PruneReport,
};
use migr8_orchestrator::{Config, Repositories};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MANIFEST: &str = r#"{
    "app": "shop",
    "pat": "secret-pat",
    "devopsOrg": "https://dev.azure.com/contoso",
    "agentPool": "migr8-pool",
    "infrastructure": [
        {
            "type": "function",
            "name": "orders",
            "resourceGroup": "rg-orders",
            "storageAccount": "stordersfn",
            "location": "westeurope",
            "runtime": "dotnet",
            "pipeline": {
                "name": "orders-deploy",
                "yamlPath": "/deploy.yml",
                "project": "shop",
                "repository": "orders",
                "branch": "main"
            }
        },
        {
            "type": "webapp",
            "name": "storefront",
            "resourceGroup": "rg-storefront",
            "appServicePlan": "asp-storefront",
            "location": "westeurope",
            "settings": [
                { "name": "API_URL", "value": "https://api.shop.test/v1" },
                { "name": "GREETING", "value": "hello world" }
            ],
            "pipeline": {
                "name": "storefront-deploy",
                "yamlPath": "/deploy.yml",
                "project": "shop",
                "repository": "storefront",
                "branch": "main"
            }
        }
    ]
}"#;

pub fn manifest() -> Arc<Manifest> {
    Arc::new(Manifest::from_json(MANIFEST).unwrap())
}

pub fn config(build_context: &Path) -> Config {
    let mut config = Config::new().with_poll_interval(Duration::from_millis(5));
    config.build_context_dir = build_context.to_path_buf();
    config
}

/// Scripted stand-in for Azure, Azure DevOps and the container engine
#[derive(Default)]
pub struct FakeCloud {
    pub registry: ContainerRegistry,
    pub failing_image: bool,
    pub failing_agents: HashSet<String>,
    pub failing_infrastructure: HashSet<String>,
    pub failing_pipelines: HashSet<String>,
    pub failing_queues: HashSet<String>,
    /// Final result per pipeline name; succeeded when absent
    pub results: HashMap<String, RunResult>,
    /// Pipelines whose runs never complete
    pub stuck: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
    pub next_id: AtomicU64,
    pub runs: Mutex<HashMap<u64, (String, usize)>>,
}

impl FakeCloud {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            agents: self.clone(),
            infrastructure: self.clone(),
            pipelines: self.clone(),
        }
    }
}

#[async_trait]
impl AgentRepository for FakeCloud {
    async fn prepare_agent_image(&self, build_context: &Path, image: &str) -> Result<()> {
        self.record(format!("build {}", image));
        if self.failing_image {
            anyhow::bail!("image build failed");
        }
        migr8_orchestrator::build_context::write(build_context).await
    }

    async fn start_agent(&self, config: &AgentConfig) -> Result<String> {
        self.record(format!("agent {}", config.container_name));
        let app = config.container_name.trim_end_matches("_deployment_agent");
        if self.failing_agents.contains(app) {
            anyhow::bail!("container {} failed to start", config.container_name);
        }
        let id = format!("id-{}", app);
        self.registry.track(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl InfrastructureRepository for FakeCloud {
    async fn create_infrastructure(&self, app: &ApplicationSpec) -> Result<()> {
        self.record(format!("infra {}", app.name));
        if self.failing_infrastructure.contains(&app.name) {
            anyhow::bail!("quota exceeded in {}", app.location);
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineRepository for FakeCloud {
    async fn create_pipeline(&self, pipeline: &PipelineSpec, _org_url: &str) -> Result<()> {
        self.record(format!("create {}", pipeline.name));
        if self.failing_pipelines.contains(&pipeline.name) {
            anyhow::bail!("repository {} not found", pipeline.repository);
        }
        Ok(())
    }

    async fn queue_pipeline(
        &self,
        pipeline: &PipelineSpec,
        parameters: &[String],
    ) -> Result<QueueHandle> {
        self.record(format!("queue {} {}", pipeline.name, parameters.join(" ")));
        if self.failing_queues.contains(&pipeline.name) {
            anyhow::bail!("pipeline {} is disabled", pipeline.name);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.runs
            .lock()
            .unwrap()
            .insert(id, (pipeline.name.clone(), 0));
        Ok(QueueHandle { id })
    }

    async fn get_pipeline_status(
        &self,
        _org_url: &str,
        _project: &str,
        handle: QueueHandle,
    ) -> Result<PipelineRunStatus> {
        let mut runs = self.runs.lock().unwrap();
        let Some((name, queries)) = runs.get_mut(&handle.id) else {
            anyhow::bail!("run {} not found", handle);
        };
        *queries += 1;

        if self.stuck.contains(name.as_str()) || *queries < 2 {
            return Ok(PipelineRunStatus::in_progress());
        }

        let result = self
            .results
            .get(name.as_str())
            .copied()
            .unwrap_or(RunResult::Succeeded);
        Ok(PipelineRunStatus::completed(result))
    }

    fn run_url(&self, project: &str, handle: QueueHandle) -> String {
        format!("https://dev.azure.com/contoso/{}/_build/results?buildId={}", project, handle)
    }
}

#[async_trait]
impl ContainerRepository for FakeCloud {
    async fn stop_container(&self, id: &str) -> Result<()> {
        self.record(format!("stop {}", id));
        Ok(())
    }

    async fn purge_container(&self, id: &str) -> Result<()> {
        self.record(format!("rm {}", id));
        Ok(())
    }

    async fn delete_image(&self, image: &str) -> Result<bool> {
        self.record(format!("rmi {}", image));
        Ok(self.called(&format!("build {}", image)))
    }

    async fn prune_dangling_images(&self) -> Result<PruneReport> {
        self.record("prune".to_string());
        Ok(PruneReport::default())
    }
}
