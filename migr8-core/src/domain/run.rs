//! Run domain types

use serde::{Deserialize, Serialize};

/// Which part of the stack a run provisions
///
/// Selected once by the invoked subcommand and fixed for the rest of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Create infrastructure only
    CreateOnly,
    /// Deploy onto existing infrastructure
    DeployOnly,
    /// Create infrastructure, then deploy onto it
    Complete,
}

impl RunMode {
    /// Whether the run starts agents, creates and queues pipelines
    pub fn deploys(self) -> bool {
        matches!(self, RunMode::DeployOnly | RunMode::Complete)
    }

    /// Whether the run creates infrastructure
    pub fn creates(self) -> bool {
        matches!(self, RunMode::CreateOnly | RunMode::Complete)
    }

    /// Whether the given stage executes in this mode
    pub fn executes(self, stage: Stage) -> bool {
        match stage {
            Stage::Infrastructure => self.creates(),
            Stage::Agents | Stage::Pipelines | Stage::Queue => self.deploys(),
        }
    }

    /// Stages executed by this mode, in execution order
    pub fn stages(self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.executes(*stage))
            .collect()
    }

    /// Subcommand name selecting this mode
    pub fn command_name(self) -> &'static str {
        match self {
            RunMode::CreateOnly => "create",
            RunMode::DeployOnly => "deploy",
            RunMode::Complete => "complete",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_name())
    }
}

/// One ordered phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Agents,
    Infrastructure,
    Pipelines,
    Queue,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 4] = [
        Stage::Agents,
        Stage::Infrastructure,
        Stage::Pipelines,
        Stage::Queue,
    ];

    /// Column header used in run summaries
    pub fn label(self) -> &'static str {
        match self {
            Stage::Agents => "AGENT",
            Stage::Infrastructure => "INFRASTRUCTURE",
            Stage::Pipelines => "PIPELINE",
            Stage::Queue => "QUEUE",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Agents => write!(f, "agents"),
            Stage::Infrastructure => write!(f, "infrastructure"),
            Stage::Pipelines => write!(f, "pipelines"),
            Stage::Queue => write!(f, "queue"),
        }
    }
}

/// Outcome of one application in one stage
///
/// Emitted exactly once by the stage worker handling that application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub application: String,
    pub success: bool,
}

impl StageOutcome {
    pub fn succeeded(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            success: true,
        }
    }

    pub fn failed(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            success: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_selection() {
        assert_eq!(RunMode::CreateOnly.stages(), vec![Stage::Infrastructure]);
        assert_eq!(
            RunMode::DeployOnly.stages(),
            vec![Stage::Agents, Stage::Pipelines, Stage::Queue]
        );
        assert_eq!(RunMode::Complete.stages(), Stage::ALL.to_vec());
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(StageOutcome::succeeded("api").success);
        assert!(!StageOutcome::failed("api").success);
        assert_eq!(StageOutcome::failed("api").application, "api");
    }
}
