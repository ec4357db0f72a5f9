//! Gauntlet platform clients
//!
//! Backends implementing the [`gauntlet_core::platform`] traits:
//!
//! - [`PlatformClient`]: talks to the ML platform gateway's REST API.
//! - [`LocalPlatform`]: a filesystem-backed workspace that completes every
//!   operation immediately, for offline runs and tests.
//!
//! # Example
//!
//! ```no_run
//! use gauntlet_client::PlatformClient;
//! use gauntlet_core::platform::ModelRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PlatformClient::new("http://localhost:8080");
//!
//!     for model in client.list_models("chd-rf").await? {
//!         println!("{} v{}", model.name, model.version);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod local;

mod compute;
mod images;
mod models;
mod pipelines;
mod runs;
mod services;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use local::{LocalPlatform, ProcessExecutor, StepExecutor, StepInvocation};

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// HTTP client for the ML platform gateway API
///
/// Endpoints are grouped the way the platform traits are:
/// - Model registry (register, list, get)
/// - Run tracking (start, metrics, completion)
/// - Image builds
/// - Inference services
/// - Compute targets
/// - Pipeline runs and their outputs
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// Base URL of the gateway (e.g., "http://localhost:8080")
    base_url: String,
    /// Bearer token sent with every request, if any
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl PlatformClient {
    /// Create a new platform client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway API (e.g., "http://localhost:8080")
    ///
    /// # Example
    /// ```
    /// use gauntlet_client::PlatformClient;
    ///
    /// let client = PlatformClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new platform client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Authenticate every request with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        self.handle_response(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(method, path).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        self.handle_empty_response(response).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.request(Method::GET, path).send().await?;
        let response = self.check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Turn a non-success status into the matching error
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(error_text));
        }
        if status == reqwest::StatusCode::CONFLICT {
            return Err(ClientError::Conflict(error_text));
        }
        Err(ClientError::api_error(status.as_u16(), error_text))
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PlatformClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = PlatformClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http_client = Client::new();
        let client =
            PlatformClient::with_client("http://localhost:8080", http_client).with_token("t0ken");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.token.as_deref(), Some("t0ken"));
    }
}
