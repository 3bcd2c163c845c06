//! Repository layer
//!
//! Repositories are the external collaborators the orchestration engine
//! drives: Azure infrastructure, Azure DevOps pipelines, and the container
//! engine hosting deployment agents. They expose narrow success/failure
//! interfaces and carry no orchestration logic.
//!
//! All repositories are trait-based so the engine can run against
//! in-memory fakes in tests.

mod agents;
mod az;
mod containers;
mod infrastructure;
mod pipelines;

// Re-export traits
pub use agents::AgentRepository;
pub use containers::ContainerRepository;
pub use infrastructure::InfrastructureRepository;
pub use pipelines::PipelineRepository;

// Re-export implementations and shared types
pub use agents::AgentConfig;
pub use az::AzCli;
pub use containers::PruneReport;
pub use infrastructure::AzInfrastructureRepository;
pub use pipelines::AzPipelineRepository;
