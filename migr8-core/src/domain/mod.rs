//! Core domain types
//!
//! These types are shared between the orchestration engine (which fans work
//! out per application) and the collaborators it drives (infrastructure,
//! pipelines, agent containers).

pub mod manifest;
pub mod pipeline;
pub mod run;
