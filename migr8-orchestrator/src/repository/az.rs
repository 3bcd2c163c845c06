//! Azure CLI invocation
//!
//! Thin wrapper running `az` subcommands:
//! - Capturing stdout, logging stdout/stderr at debug level
//! - Failing with the exit code and stderr when a command fails
//! - Decoding `--output json` results
//! - Session check, login and subscription selection

use anyhow::{Context, Result};
use migr8_core::dto::account::Subscription;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Environment variable the azure-devops extension reads its token from
const DEVOPS_PAT_ENV: &str = "AZURE_DEVOPS_EXT_PAT";

/// Azure CLI runner
#[derive(Clone)]
pub struct AzCli {
    binary: String,
    devops_pat: Option<String>,
}

impl AzCli {
    /// Creates a runner for the given `az` binary
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            devops_pat: None,
        }
    }

    /// Authenticates `az pipelines` commands with a personal access token
    pub fn with_devops_pat(mut self, pat: impl Into<String>) -> Self {
        self.devops_pat = Some(pat.into());
        self
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        command.args(args).stdin(Stdio::null());
        if let Some(pat) = &self.devops_pat {
            command.env(DEVOPS_PAT_ENV, pat);
        }
        command
    }

    /// Runs an `az` command and returns its stdout
    pub async fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = self.command(args);
        let printable = format!("{:?}", command.as_std());

        let output = command.output().await.with_context(|| {
            format!(
                "Failed to execute {}. Is the Azure CLI installed?",
                self.binary
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stderr.trim().is_empty() {
            debug!("az stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            error!("az command failed: exit_code={}", exit_code);
            anyhow::bail!(
                "{} failed: exit_code={}, stderr='{}'",
                redact(&printable, self.devops_pat.as_deref()),
                exit_code,
                stderr.trim()
            );
        }

        debug!("az stdout: {} byte(s)", stdout.len());
        Ok(stdout)
    }

    /// Runs an `az` command with JSON output and decodes it
    pub async fn run_json<T, I, S>(&self, args: I) -> Result<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut all: Vec<std::ffi::OsString> =
            args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        all.push("--output".into());
        all.push("json".into());

        let stdout = self.run(all).await?;
        serde_json::from_str(&stdout).context("Failed to parse Azure CLI JSON output")
    }

    /// Ensures an Azure session and selects the subscription
    ///
    /// Reuses an existing session when there is one, otherwise runs an
    /// interactive `az login` attached to the terminal.
    ///
    /// # Arguments
    /// * `subscription` - Subscription name or id to select; the current default when None
    ///
    /// # Returns
    /// The selected subscription
    pub async fn login(&self, subscription: Option<&str>) -> Result<Subscription> {
        if self
            .run_json::<Subscription, _, _>(["account", "show"])
            .await
            .is_err()
        {
            warn!("No active Azure session, starting az login");

            let status = Command::new(&self.binary)
                .args(["login", "--output", "none"])
                .status()
                .await
                .with_context(|| format!("Failed to execute {} login", self.binary))?;

            if !status.success() {
                anyhow::bail!("az login failed with exit code {}", status.code().unwrap_or(-1));
            }
        }

        if let Some(subscription) = subscription {
            self.run(["account", "set", "--subscription", subscription])
                .await
                .with_context(|| format!("Failed to select subscription {}", subscription))?;
        }

        let selected: Subscription = self
            .run_json(["account", "show"])
            .await
            .context("Failed to read the selected subscription")?;

        info!("Using subscription {} ({})", selected.name, selected.id);
        Ok(selected)
    }
}

/// Removes a secret from text that is about to be logged or returned
fn redact(text: &str, secret: Option<&str>) -> String {
    match secret {
        Some(secret) if !secret.is_empty() => text.replace(secret, "***"),
        _ => text.to_string(),
    }
}
