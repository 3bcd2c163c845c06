//! migr8 Azure DevOps Client
//!
//! A small, type-safe HTTP client for the parts of the Azure DevOps REST API
//! the deployment run depends on: verifying the personal access token and
//! following queued pipeline runs.
//!
//! # Example
//!
//! ```no_run
//! use migr8_client::DevOpsClient;
//! use migr8_core::domain::pipeline::QueueHandle;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), migr8_client::ClientError> {
//!     let client = DevOpsClient::new("https://dev.azure.com/contoso", "pat");
//!
//!     let status = client
//!         .get_pipeline_status("shop", QueueHandle { id: 4711 })
//!         .await?;
//!
//!     println!("Run is {}", status.status);
//!     Ok(())
//! }
//! ```

mod builds;
pub mod error;
mod projects;

pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// REST API version sent with every request
pub const API_VERSION: &str = "7.1";

/// HTTP client for one Azure DevOps organization
///
/// Every request authenticates with the personal access token using basic
/// authentication and an empty user name, as Azure DevOps expects.
#[derive(Clone)]
pub struct DevOpsClient {
    /// Organization URL (e.g., "https://dev.azure.com/contoso")
    org_url: String,
    /// Personal access token
    pat: String,
    /// HTTP client instance
    client: Client,
}

impl std::fmt::Debug for DevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevOpsClient")
            .field("org_url", &self.org_url)
            .finish_non_exhaustive()
    }
}

impl DevOpsClient {
    /// Create a new client for an organization
    ///
    /// # Arguments
    /// * `org_url` - The organization URL
    /// * `pat` - Personal access token used for every request
    pub fn new(org_url: impl Into<String>, pat: impl Into<String>) -> Self {
        Self::with_client(org_url, pat, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(org_url: impl Into<String>, pat: impl Into<String>, client: Client) -> Self {
        let org_url = org_url.into();
        Self {
            org_url: org_url.trim_end_matches('/').to_string(),
            pat: pat.into(),
            client,
        }
    }

    /// Get the organization URL
    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    /// Build an authenticated GET request for an API path below the organization
    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.org_url, path.trim_start_matches('/'));
        self.client
            .get(url)
            .basic_auth("", Some(&self.pat))
            .query(&[("api-version", API_VERSION)])
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Azure DevOps answers rejected credentials either with 401 or with a
    /// 203 redirect to the sign-in page, so both are mapped to `Unauthorized`.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NON_AUTHORITATIVE_INFORMATION
        {
            return Err(ClientError::Unauthorized(self.org_url.clone()));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
