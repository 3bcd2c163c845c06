//! Data Transfer Objects
//!
//! Wire shapes returned by the Azure CLI and the Azure DevOps REST API.
//! They are converted into domain types at the collaborator boundary.

pub mod account;
pub mod build;
