//! Results aggregation
//!
//! Builds the end-of-run summary from the stage ledgers: one row per
//! application, one column per stage. Stages the run mode skipped show as
//! N/A. Rendering is left to the caller.

use migr8_core::domain::manifest::ApplicationSpec;
use migr8_core::domain::run::{RunMode, Stage};

use crate::context::RunContext;
use crate::ledger::LedgerEntry;

/// Summary cell of one application in one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportCell {
    /// The stage did not run for the application
    NotApplicable,
    Success,
    Failed,
}

impl From<LedgerEntry> for ReportCell {
    fn from(entry: LedgerEntry) -> Self {
        match entry {
            LedgerEntry::NotRun => ReportCell::NotApplicable,
            LedgerEntry::Succeeded => ReportCell::Success,
            LedgerEntry::Failed => ReportCell::Failed,
        }
    }
}

impl std::fmt::Display for ReportCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportCell::NotApplicable => write!(f, "N/A"),
            ReportCell::Success => write!(f, "SUCCESS"),
            ReportCell::Failed => write!(f, "FAILED"),
        }
    }
}

/// Summary row of one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub application: String,
    /// One cell per column of the table, in column order
    pub cells: Vec<ReportCell>,
}

impl ReportRow {
    /// Whether no stage failed and at least one succeeded
    pub fn all_succeeded(&self) -> bool {
        !self.cells.contains(&ReportCell::Failed) && self.cells.contains(&ReportCell::Success)
    }
}

/// Display-ready summary of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub mode: RunMode,
    /// Columns, always the four stages in execution order
    pub stages: Vec<Stage>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    /// Aggregates the ledgers of a run
    ///
    /// Rows follow manifest order.
    pub fn from_context(ctx: &RunContext, applications: &[ApplicationSpec]) -> Self {
        let stages = Stage::ALL.to_vec();

        let rows = applications
            .iter()
            .map(|app| ReportRow {
                application: app.name.clone(),
                cells: stages
                    .iter()
                    .map(|stage| ReportCell::from(ctx.outcome(*stage, &app.name)))
                    .collect(),
            })
            .collect();

        Self {
            mode: ctx.mode,
            stages,
            rows,
        }
    }

    /// Cell of an application in a stage; None for an unknown application
    pub fn cell(&self, application: &str, stage: Stage) -> Option<ReportCell> {
        let column = self.stages.iter().position(|s| *s == stage)?;
        self.rows
            .iter()
            .find(|row| row.application == application)
            .and_then(|row| row.cells.get(column).copied())
    }

    /// Number of applications with a failed stage
    pub fn failures(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.cells.contains(&ReportCell::Failed))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::StageLedger;
    use migr8_core::domain::manifest::{AppKind, PipelineSpec};
    use migr8_core::domain::run::StageOutcome;

    fn app(name: &str) -> ApplicationSpec {
        ApplicationSpec {
            name: name.to_string(),
            kind: AppKind::WebApp,
            resource_group: "rg".to_string(),
            storage_account: String::new(),
            app_service_plan: "plan".to_string(),
            location: "westeurope".to_string(),
            runtime: String::new(),
            os: String::new(),
            settings: Vec::new(),
            pipeline: PipelineSpec {
                name: format!("{}-deploy", name),
                yaml_path: "azure-pipelines.yml".to_string(),
                project: "shop".to_string(),
                repository: name.to_string(),
                branch: "main".to_string(),
                service_account: "svc".to_string(),
            },
        }
    }

    #[test]
    fn test_cells_follow_ledgers() {
        let mut ctx = RunContext::new(RunMode::DeployOnly);
        ctx.complete_stage(StageLedger::from_outcomes(
            Stage::Agents,
            [StageOutcome::succeeded("api"), StageOutcome::failed("web")],
        ));
        ctx.complete_stage(StageLedger::from_outcomes(
            Stage::Pipelines,
            [StageOutcome::succeeded("api")],
        ));

        let table = ReportTable::from_context(&ctx, &[app("api"), app("web")]);

        assert_eq!(table.stages, Stage::ALL.to_vec());
        assert_eq!(table.cell("api", Stage::Agents), Some(ReportCell::Success));
        assert_eq!(table.cell("web", Stage::Agents), Some(ReportCell::Failed));
        assert_eq!(table.cell("web", Stage::Pipelines), Some(ReportCell::NotApplicable));
        assert_eq!(table.cell("api", Stage::Queue), Some(ReportCell::NotApplicable));
        assert_eq!(
            table.cell("api", Stage::Infrastructure),
            Some(ReportCell::NotApplicable)
        );
        assert_eq!(table.cell("db", Stage::Agents), None);
        assert_eq!(table.failures(), 1);
    }

    #[test]
    fn test_skipped_stages_are_not_applicable() {
        let mut ctx = RunContext::new(RunMode::CreateOnly);
        ctx.complete_stage(StageLedger::from_outcomes(
            Stage::Infrastructure,
            [StageOutcome::succeeded("api")],
        ));

        let table = ReportTable::from_context(&ctx, &[app("api")]);

        assert_eq!(table.stages.len(), 4);
        assert_eq!(
            table.rows[0].cells,
            vec![
                ReportCell::NotApplicable,
                ReportCell::Success,
                ReportCell::NotApplicable,
                ReportCell::NotApplicable,
            ]
        );
        assert!(table.rows[0].all_succeeded());
        assert_eq!(table.failures(), 0);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(ReportCell::NotApplicable.to_string(), "N/A");
        assert_eq!(ReportCell::Success.to_string(), "SUCCESS");
        assert_eq!(ReportCell::Failed.to_string(), "FAILED");
    }
}
