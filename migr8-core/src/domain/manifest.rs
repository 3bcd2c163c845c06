//! Deployment manifest types
//!
//! The manifest is the JSON document describing an application stack: the
//! Azure DevOps organization to deploy through, the agent pool that runs the
//! deployments and one entry per application to provision.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::run::RunMode;

/// Suffix appended to an application name to form its agent container name
pub const AGENT_CONTAINER_SUFFIX: &str = "_deployment_agent";

/// Errors raised while validating a manifest
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("no personal access token found")]
    MissingPat,

    #[error("no Azure DevOps organization URL found")]
    MissingDevOpsOrg,

    #[error("no infrastructure description found")]
    EmptyInfrastructure,

    #[error("no agent pool configured for a deployment run")]
    MissingAgentPool,

    #[error("application at index {0} has an empty name")]
    UnnamedApplication(usize),

    #[error("application '{0}' is declared more than once")]
    DuplicateApplication(String),
}

/// The full deployment manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Label of the application stack
    #[serde(default)]
    pub app: String,

    /// Azure DevOps personal access token
    #[serde(default)]
    pub pat: String,

    /// Azure DevOps organization URL (e.g. https://dev.azure.com/contoso)
    #[serde(default)]
    pub devops_org: String,

    /// Agent pool the deployment agents register into
    #[serde(default)]
    pub agent_pool: String,

    /// Subscription to select after login (name or id); current default when absent
    #[serde(default)]
    pub subscription: Option<String>,

    /// Applications to provision and deploy
    #[serde(default)]
    pub infrastructure: Vec<ApplicationSpec>,
}

impl Manifest {
    /// Parses a manifest from its JSON representation
    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    /// Validates the manifest for the given run mode
    ///
    /// Deployment runs additionally require an agent pool.
    pub fn validate(&self, mode: RunMode) -> Result<(), ManifestError> {
        if self.pat.trim().is_empty() {
            return Err(ManifestError::MissingPat);
        }

        if self.devops_org.trim().is_empty() {
            return Err(ManifestError::MissingDevOpsOrg);
        }

        if self.infrastructure.is_empty() {
            return Err(ManifestError::EmptyInfrastructure);
        }

        if mode.deploys() && self.agent_pool.trim().is_empty() {
            return Err(ManifestError::MissingAgentPool);
        }

        let mut seen = HashSet::new();
        for (idx, app) in self.infrastructure.iter().enumerate() {
            if app.name.trim().is_empty() {
                return Err(ManifestError::UnnamedApplication(idx));
            }
            if !seen.insert(app.name.as_str()) {
                return Err(ManifestError::DuplicateApplication(app.name.clone()));
            }
        }

        Ok(())
    }

    /// Organization URL without a trailing slash
    pub fn org_url(&self) -> &str {
        self.devops_org.trim_end_matches('/')
    }
}

/// Kind of application hosting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    Function,
    #[serde(rename = "webapp")]
    WebApp,
}

impl std::fmt::Display for AppKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppKind::Function => write!(f, "function"),
            AppKind::WebApp => write!(f, "webapp"),
        }
    }
}

/// One application of the stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AppKind,
    #[serde(default)]
    pub resource_group: String,
    #[serde(default)]
    pub storage_account: String,
    #[serde(default)]
    pub app_service_plan: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub settings: Vec<AppSetting>,
    pub pipeline: PipelineSpec,
}

impl ApplicationSpec {
    /// Name of the container hosting this application's deployment agent
    pub fn agent_container_name(&self) -> String {
        format!("{}{}", self.name, AGENT_CONTAINER_SUFFIX)
    }
}

/// Application setting (environment variable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSetting {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub slot_setting: bool,
}

/// Deployment pipeline of an application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub name: String,
    #[serde(default)]
    pub yaml_path: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub service_account: String,
}
