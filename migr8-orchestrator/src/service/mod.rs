//! Service layer
//!
//! Per-application stage workers, the run teardown coordinator and the
//! results aggregation shown at the end of a run.

pub mod cleanup;
pub mod report;
pub mod workers;

pub use cleanup::{CleanupCoordinator, CleanupReport};
pub use report::{ReportCell, ReportRow, ReportTable};
pub use workers::StageWorkers;
