//! Migr8 orchestrator library
//!
//! Provisions Azure application infrastructure and deploys it through Azure
//! DevOps pipelines run by short-lived containerized agents:
//! - Staged fan-out/fan-in execution across every application of a manifest
//! - Dependency gating between stages
//! - Pipeline run status polling
//! - One-shot teardown on normal exit or interrupt

pub mod build_context;
pub mod config;
pub mod container;
pub mod context;
pub mod gate;
pub mod ledger;
pub mod orchestrator;
pub mod params;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod signal;

pub use config::Config;
pub use context::RunContext;
pub use orchestrator::{Orchestrator, Repositories};
