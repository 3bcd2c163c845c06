//! Pipeline run domain types

use serde::{Deserialize, Serialize};

/// Handle of a queued pipeline run
///
/// Azure DevOps identifies a queued run by its build id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueHandle {
    pub id: u64,
}

impl std::fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Lifecycle state of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    NotStarted,
    Postponed,
    InProgress,
    Cancelling,
    Completed,
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// Whether the run reached its final state
    pub fn is_terminal(self) -> bool {
        self == RunState::Completed
    }

    /// Whether the run is still waiting for an agent
    pub fn is_queued(self) -> bool {
        matches!(self, RunState::NotStarted | RunState::Postponed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::NotStarted => "notStarted",
            RunState::Postponed => "postponed",
            RunState::InProgress => "inProgress",
            RunState::Cancelling => "cancelling",
            RunState::Completed => "completed",
            RunState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunResult {
    Succeeded,
    PartiallySucceeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunResult::Succeeded => "succeeded",
            RunResult::PartiallySucceeded => "partiallySucceeded",
            RunResult::Failed => "failed",
            RunResult::Canceled => "canceled",
            RunResult::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Snapshot of a pipeline run as reported by Azure DevOps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunStatus {
    pub status: RunState,
    #[serde(default)]
    pub result: Option<RunResult>,
}

impl PipelineRunStatus {
    pub fn new(status: RunState, result: Option<RunResult>) -> Self {
        Self { status, result }
    }

    pub fn in_progress() -> Self {
        Self::new(RunState::InProgress, None)
    }

    pub fn completed(result: RunResult) -> Self {
        Self::new(RunState::Completed, Some(result))
    }
}
