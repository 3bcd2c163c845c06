//! Dependency gate
//!
//! Pure decisions on whether an application may enter a stage, given the
//! run mode and the completed ledgers of earlier stages. Nothing here
//! performs I/O; workers log and record the decision.

use migr8_core::domain::run::{RunMode, Stage};

use crate::ledger::StageLedger;

/// Earlier stage an application depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Infrastructure,
    Agent,
    Pipeline,
}

impl std::fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prerequisite::Infrastructure => write!(f, "infrastructure"),
            Prerequisite::Agent => write!(f, "agent"),
            Prerequisite::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Decision of the gate for one application and stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    /// Skipped; lists every prerequisite that did not succeed
    Blocked(Vec<Prerequisite>),
}

impl GateDecision {
    pub fn proceeds(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }

    fn from_missing(missing: Vec<Prerequisite>) -> Self {
        if missing.is_empty() {
            GateDecision::Proceed
        } else {
            GateDecision::Blocked(missing)
        }
    }
}

/// Gate for pipeline creation
///
/// A complete run only creates pipelines for infrastructure it created;
/// a deploy-only run assumes the infrastructure already exists.
pub fn pipeline_creation(
    mode: RunMode,
    infrastructure: &StageLedger,
    application: &str,
) -> GateDecision {
    let mut missing = Vec::new();
    if mode == RunMode::Complete && !infrastructure.succeeded(application) {
        missing.push(Prerequisite::Infrastructure);
    }
    GateDecision::from_missing(missing)
}

/// Gate for pipeline queueing
///
/// Queueing needs a running agent and an existing pipeline.
pub fn pipeline_queue(
    agents: &StageLedger,
    pipelines: &StageLedger,
    application: &str,
) -> GateDecision {
    let mut missing = Vec::new();
    if !agents.succeeded(application) {
        missing.push(Prerequisite::Agent);
    }
    if !pipelines.succeeded(application) {
        missing.push(Prerequisite::Pipeline);
    }
    GateDecision::from_missing(missing)
}

/// Ledgers of completed stages consulted by [`should_run`]
#[derive(Debug, Clone, Copy)]
pub struct PriorOutcomes<'a> {
    pub agents: &'a StageLedger,
    pub infrastructure: &'a StageLedger,
    pub pipelines: &'a StageLedger,
}

/// Whether an application runs in a stage
///
/// Stages the mode does not execute are always blocked; stages without
/// prerequisites always proceed.
pub fn should_run(
    mode: RunMode,
    stage: Stage,
    prior: PriorOutcomes<'_>,
    application: &str,
) -> GateDecision {
    if !mode.executes(stage) {
        return GateDecision::Blocked(Vec::new());
    }

    match stage {
        Stage::Agents | Stage::Infrastructure => GateDecision::Proceed,
        Stage::Pipelines => pipeline_creation(mode, prior.infrastructure, application),
        Stage::Queue => pipeline_queue(prior.agents, prior.pipelines, application),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_core::domain::run::StageOutcome;

    fn ledger(stage: Stage, outcomes: &[(&str, bool)]) -> StageLedger {
        StageLedger::from_outcomes(
            stage,
            outcomes.iter().map(|(name, success)| StageOutcome {
                application: name.to_string(),
                success: *success,
            }),
        )
    }

    #[test]
    fn test_complete_run_requires_infrastructure() {
        let infra = ledger(Stage::Infrastructure, &[("api", true), ("web", false)]);

        assert!(pipeline_creation(RunMode::Complete, &infra, "api").proceeds());
        assert_eq!(
            pipeline_creation(RunMode::Complete, &infra, "web"),
            GateDecision::Blocked(vec![Prerequisite::Infrastructure])
        );
        // Absent from the ledger means the infrastructure was never created
        assert_eq!(
            pipeline_creation(RunMode::Complete, &infra, "worker"),
            GateDecision::Blocked(vec![Prerequisite::Infrastructure])
        );
    }

    #[test]
    fn test_deploy_only_ignores_infrastructure() {
        let infra = StageLedger::new(Stage::Infrastructure);
        assert!(pipeline_creation(RunMode::DeployOnly, &infra, "api").proceeds());
    }

    #[test]
    fn test_queue_requires_agent_and_pipeline() {
        let agents = ledger(Stage::Agents, &[("api", true), ("web", false), ("job", true)]);
        let pipelines = ledger(Stage::Pipelines, &[("api", true), ("web", false), ("job", false)]);

        assert!(pipeline_queue(&agents, &pipelines, "api").proceeds());
        assert_eq!(
            pipeline_queue(&agents, &pipelines, "web"),
            GateDecision::Blocked(vec![Prerequisite::Agent, Prerequisite::Pipeline])
        );
        assert_eq!(
            pipeline_queue(&agents, &pipelines, "job"),
            GateDecision::Blocked(vec![Prerequisite::Pipeline])
        );
    }

    #[test]
    fn test_should_run_respects_mode() {
        let agents = ledger(Stage::Agents, &[("api", true)]);
        let infra = ledger(Stage::Infrastructure, &[("api", true)]);
        let pipelines = ledger(Stage::Pipelines, &[("api", true)]);
        let prior = PriorOutcomes {
            agents: &agents,
            infrastructure: &infra,
            pipelines: &pipelines,
        };

        assert!(!should_run(RunMode::CreateOnly, Stage::Queue, prior, "api").proceeds());
        assert!(!should_run(RunMode::CreateOnly, Stage::Pipelines, prior, "api").proceeds());
        assert!(should_run(RunMode::CreateOnly, Stage::Infrastructure, prior, "api").proceeds());
        assert!(!should_run(RunMode::DeployOnly, Stage::Infrastructure, prior, "api").proceeds());
        assert!(should_run(RunMode::Complete, Stage::Queue, prior, "api").proceeds());
        assert!(!should_run(RunMode::Complete, Stage::Queue, prior, "web").proceeds());
    }
}
