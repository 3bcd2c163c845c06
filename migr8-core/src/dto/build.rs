//! Build DTOs
//!
//! Azure DevOps exposes a queued pipeline run as a build. Both
//! `az pipelines run` and `GET {org}/{project}/_apis/build/builds/{id}`
//! return this shape.

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{PipelineRunStatus, QueueHandle, RunResult, RunState};

/// Build record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: u64,
    #[serde(default)]
    pub build_number: Option<String>,
    pub status: RunState,
    #[serde(default)]
    pub result: Option<RunResult>,
    #[serde(default)]
    pub queue_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub finish_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Build {
    pub fn handle(&self) -> QueueHandle {
        QueueHandle { id: self.id }
    }

    pub fn run_status(&self) -> PipelineRunStatus {
        PipelineRunStatus::new(self.status, self.result)
    }
}
