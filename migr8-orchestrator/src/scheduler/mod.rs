//! Scheduler layer
//!
//! Concurrency primitives of a run: the fan-out/fan-in executor running one
//! worker per application within a stage, and the poller following a queued
//! pipeline run until it completes.

pub mod poller;
pub mod stage;

pub use poller::{PipelinePoller, PollOutcome, PollState};
pub use stage::StageExecutor;
