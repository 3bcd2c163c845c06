//! Orchestrator configuration
//!
//! Defines all tunable parameters of a deployment run: polling cadence,
//! optional hardening limits, and the external tools and paths used to build
//! and run deployment agents.

use std::path::PathBuf;
use std::time::Duration;

/// Default status poll interval for queued pipeline runs
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Name of the temporary agent build context directory
pub const BUILD_CONTEXT_DIR_NAME: &str = "migr8_agentpool_build_ctx";

/// Orchestrator configuration
///
/// Intervals and limits are configurable so tests and unusual environments
/// can tune them without touching the orchestration logic.
#[derive(Debug, Clone)]
pub struct Config {
    /// How often to query a queued pipeline run for its status
    pub poll_interval: Duration,

    /// Overall limit for following one pipeline run (None = wait indefinitely)
    pub poll_timeout: Option<Duration>,

    /// Maximum number of concurrent workers per stage (None = one per application)
    pub max_concurrency: Option<usize>,

    /// Container engine binary (podman or docker)
    pub container_engine: String,

    /// Name of the agent image, tagged `latest`
    pub agent_image: String,

    /// Directory the agent build context is written to
    pub build_context_dir: PathBuf,

    /// Azure CLI binary
    pub az_binary: String,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: None,
            max_concurrency: None,
            container_engine: "podman".to_string(),
            agent_image: "azp_agent".to_string(),
            build_context_dir: std::env::temp_dir().join(BUILD_CONTEXT_DIR_NAME),
            az_binary: "az".to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - MIGR8_POLL_INTERVAL (seconds, default: 30)
    /// - MIGR8_POLL_TIMEOUT (seconds, default: unbounded)
    /// - MIGR8_MAX_CONCURRENCY (default: unbounded)
    /// - MIGR8_CONTAINER_ENGINE (default: podman)
    /// - MIGR8_AGENT_IMAGE (default: azp_agent)
    /// - MIGR8_BUILD_CONTEXT (default: <tmp>/migr8_agentpool_build_ctx)
    /// - MIGR8_AZ_BINARY (default: az)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::new();

        let poll_interval = lookup("MIGR8_POLL_INTERVAL")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        let poll_timeout = lookup("MIGR8_POLL_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        let max_concurrency = lookup("MIGR8_MAX_CONCURRENCY").and_then(|s| s.parse::<usize>().ok());

        Self {
            poll_interval,
            poll_timeout,
            max_concurrency,
            container_engine: lookup("MIGR8_CONTAINER_ENGINE")
                .unwrap_or(defaults.container_engine),
            agent_image: lookup("MIGR8_AGENT_IMAGE").unwrap_or(defaults.agent_image),
            build_context_dir: lookup("MIGR8_BUILD_CONTEXT")
                .map(PathBuf::from)
                .unwrap_or(defaults.build_context_dir),
            az_binary: lookup("MIGR8_AZ_BINARY").unwrap_or(defaults.az_binary),
        }
    }

    /// Sets the status poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Caps the number of concurrent workers per stage
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Full reference of the agent image
    pub fn agent_image_ref(&self) -> String {
        format!("{}:latest", self.agent_image)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_concurrency == Some(0) {
            anyhow::bail!("max_concurrency must be greater than 0");
        }

        if self.container_engine.trim().is_empty() {
            anyhow::bail!("container_engine cannot be empty");
        }

        if self.agent_image.trim().is_empty() {
            anyhow::bail!("agent_image cannot be empty");
        }

        if self.build_context_dir.as_os_str().is_empty() {
            anyhow::bail!("build_context_dir cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.poll_timeout, None);
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.agent_image_ref(), "azp_agent:latest");
        assert!(config.build_context_dir.ends_with(BUILD_CONTEXT_DIR_NAME));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MIGR8_POLL_INTERVAL", "5"),
            ("MIGR8_POLL_TIMEOUT", "600"),
            ("MIGR8_MAX_CONCURRENCY", "4"),
            ("MIGR8_CONTAINER_ENGINE", "docker"),
            ("MIGR8_BUILD_CONTEXT", "/var/tmp/ctx"),
        ]);

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.poll_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.container_engine, "docker");
        assert_eq!(config.build_context_dir, PathBuf::from("/var/tmp/ctx"));
        assert_eq!(config.agent_image, "azp_agent");
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = Config::from_lookup(|key| match key {
            "MIGR8_POLL_INTERVAL" => Some("soon".to_string()),
            "MIGR8_MAX_CONCURRENCY" => Some("-1".to_string()),
            _ => None,
        });

        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.max_concurrency, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_millis(10);

        config.max_concurrency = Some(0);
        assert!(config.validate().is_err());
        config.max_concurrency = Some(2);

        config.container_engine = String::new();
        assert!(config.validate().is_err());
    }
}
