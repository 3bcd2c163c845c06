//! migr8 Core
//!
//! Core types shared by the migr8 orchestration engine, the Azure DevOps
//! client and the command-line interface.
//!
//! This crate contains:
//! - Domain types: the deployment manifest, run modes, stage outcomes and
//!   pipeline run status
//! - DTOs: wire shapes returned by the Azure CLI and the Azure DevOps REST API

pub mod domain;
pub mod dto;
