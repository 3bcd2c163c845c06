//! Stage result ledger
//!
//! Per-stage record of which applications passed or failed. A ledger is
//! filled by the coordinating task once the stage barrier has been reached
//! and is shared read-only (behind an `Arc`) with the workers of later stages.

use migr8_core::domain::run::{Stage, StageOutcome};
use std::collections::HashMap;
use tracing::warn;

/// Ledger lookup result for one application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    /// No outcome was recorded for the application
    NotRun,
    Succeeded,
    Failed,
}

impl LedgerEntry {
    pub fn is_success(self) -> bool {
        self == LedgerEntry::Succeeded
    }
}

/// Outcomes of a single stage, keyed by application name
#[derive(Debug, Clone)]
pub struct StageLedger {
    stage: Stage,
    /// Outcomes in arrival order
    outcomes: Vec<StageOutcome>,
    /// Application name -> index into `outcomes`
    index: HashMap<String, usize>,
}

impl StageLedger {
    /// Creates an empty ledger for a stage
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            outcomes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a ledger from the outcomes collected by a stage
    pub fn from_outcomes(stage: Stage, outcomes: impl IntoIterator<Item = StageOutcome>) -> Self {
        let mut ledger = Self::new(stage);
        for outcome in outcomes {
            ledger.record(outcome);
        }
        ledger
    }

    /// Records an outcome
    ///
    /// An application keeps its first outcome; later ones are rejected.
    ///
    /// # Returns
    /// `true` if the outcome was recorded
    pub fn record(&mut self, outcome: StageOutcome) -> bool {
        if self.index.contains_key(&outcome.application) {
            warn!(
                "Ignoring duplicate {} outcome for application {}",
                self.stage, outcome.application
            );
            return false;
        }

        self.index
            .insert(outcome.application.clone(), self.outcomes.len());
        self.outcomes.push(outcome);
        true
    }

    /// Looks up the outcome of an application
    pub fn lookup(&self, application: &str) -> LedgerEntry {
        match self.index.get(application) {
            Some(&idx) if self.outcomes[idx].success => LedgerEntry::Succeeded,
            Some(_) => LedgerEntry::Failed,
            None => LedgerEntry::NotRun,
        }
    }

    /// Whether the application succeeded in this stage
    pub fn succeeded(&self, application: &str) -> bool {
        self.lookup(application).is_success()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Outcomes in arrival order
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of applications that succeeded
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_defaults_to_not_run() {
        let ledger = StageLedger::from_outcomes(
            Stage::Infrastructure,
            vec![StageOutcome::succeeded("api"), StageOutcome::failed("web")],
        );

        assert_eq!(ledger.lookup("api"), LedgerEntry::Succeeded);
        assert_eq!(ledger.lookup("web"), LedgerEntry::Failed);
        assert_eq!(ledger.lookup("worker"), LedgerEntry::NotRun);
        assert!(!ledger.succeeded("worker"));
        assert_eq!(ledger.success_count(), 1);
    }

    #[test]
    fn test_first_outcome_wins() {
        let mut ledger = StageLedger::new(Stage::Agents);

        assert!(ledger.record(StageOutcome::failed("api")));
        assert!(!ledger.record(StageOutcome::succeeded("api")));

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.lookup("api"), LedgerEntry::Failed);
    }

    #[test]
    fn test_arrival_order_is_kept() {
        let ledger = StageLedger::from_outcomes(
            Stage::Queue,
            vec![
                StageOutcome::succeeded("b"),
                StageOutcome::succeeded("a"),
                StageOutcome::failed("c"),
            ],
        );

        let names: Vec<_> = ledger
            .outcomes()
            .iter()
            .map(|o| o.application.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(ledger.stage(), Stage::Queue);
    }
}
