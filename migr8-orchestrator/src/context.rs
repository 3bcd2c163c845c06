//! Run context
//!
//! Owns everything one orchestration run accumulates:
//! - The run mode selected by the invoked subcommand
//! - One ledger per stage, replaced as each stage completes
//!
//! Passed by reference through the orchestration call chain so several runs
//! can coexist in one process.

use chrono::{DateTime, Utc};
use migr8_core::domain::run::{RunMode, Stage};
use std::sync::Arc;
use uuid::Uuid;

use crate::ledger::{LedgerEntry, StageLedger};

/// State of a single orchestration run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    agents: Arc<StageLedger>,
    infrastructure: Arc<StageLedger>,
    pipelines: Arc<StageLedger>,
    queue: Arc<StageLedger>,
}

impl RunContext {
    /// Creates a context with empty ledgers
    pub fn new(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            started_at: Utc::now(),
            agents: Arc::new(StageLedger::new(Stage::Agents)),
            infrastructure: Arc::new(StageLedger::new(Stage::Infrastructure)),
            pipelines: Arc::new(StageLedger::new(Stage::Pipelines)),
            queue: Arc::new(StageLedger::new(Stage::Queue)),
        }
    }

    /// Ledger of a stage
    pub fn ledger(&self, stage: Stage) -> &Arc<StageLedger> {
        match stage {
            Stage::Agents => &self.agents,
            Stage::Infrastructure => &self.infrastructure,
            Stage::Pipelines => &self.pipelines,
            Stage::Queue => &self.queue,
        }
    }

    /// Stores the completed ledger of a stage
    pub fn complete_stage(&mut self, ledger: StageLedger) {
        let ledger = Arc::new(ledger);
        match ledger.stage() {
            Stage::Agents => self.agents = ledger,
            Stage::Infrastructure => self.infrastructure = ledger,
            Stage::Pipelines => self.pipelines = ledger,
            Stage::Queue => self.queue = ledger,
        }
    }

    /// Whether the run mode executes a stage
    pub fn executed(&self, stage: Stage) -> bool {
        self.mode.executes(stage)
    }

    /// Outcome of an application in a stage
    pub fn outcome(&self, stage: Stage, application: &str) -> LedgerEntry {
        self.ledger(stage).lookup(application)
    }

    /// Time elapsed since the run started
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migr8_core::domain::run::StageOutcome;

    #[test]
    fn test_new_context_is_empty() {
        let ctx = RunContext::new(RunMode::Complete);
        for stage in Stage::ALL {
            assert!(ctx.ledger(stage).is_empty());
            assert_eq!(ctx.outcome(stage, "api"), LedgerEntry::NotRun);
        }
    }

    #[test]
    fn test_complete_stage_replaces_ledger() {
        let mut ctx = RunContext::new(RunMode::DeployOnly);
        ctx.complete_stage(StageLedger::from_outcomes(
            Stage::Pipelines,
            vec![StageOutcome::succeeded("api")],
        ));

        assert_eq!(ctx.outcome(Stage::Pipelines, "api"), LedgerEntry::Succeeded);
        assert!(ctx.ledger(Stage::Agents).is_empty());
        assert!(!ctx.executed(Stage::Infrastructure));
    }

    #[test]
    fn test_runs_are_independent() {
        let first = RunContext::new(RunMode::Complete);
        let second = RunContext::new(RunMode::Complete);
        assert_ne!(first.run_id, second.run_id);
    }
}
