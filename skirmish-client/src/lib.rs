//! Skirmish HTTP Client
//!
//! A thin, type-safe client stub for the Skirmish controller's control plane.
//!
//! Both the worker pool and any presentation layer use this crate to reach
//! the controller without sharing its process memory.
//!
//! # Example
//!
//! ```no_run
//! use skirmish_client::ControllerClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ControllerClient::connect("http://localhost:3004").await?;
//!
//!     let job = client.create_job(serde_json::json!({ "width": 11 })).await?;
//!     println!("Created job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// HTTP client for the controller's control plane
#[derive(Debug, Clone)]
pub struct ControllerClient {
    /// Base URL of the controller (e.g., "http://localhost:3004")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ControllerClient {
    /// Create a new controller client without contacting the controller
    ///
    /// A bare `host:port` is accepted and treated as `http://host:port`.
    ///
    /// # Example
    /// ```
    /// use skirmish_client::ControllerClient;
    ///
    /// let client = ControllerClient::new("localhost:3004");
    /// assert_eq!(client.base_url(), "http://localhost:3004");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new controller client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            client,
        }
    }

    /// Create a client and check the controller is reachable
    ///
    /// Fails with [`ClientError::Connect`] if nothing is listening yet; the
    /// controller must be serving before workers are started.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self> {
        let client = Self::new(base_url);
        client.health().await?;

        tracing::debug!("Connected to controller at {}", client.base_url);

        Ok(client)
    }

    /// Get the base URL of the controller
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                url: self.base_url.clone(),
                source,
            })?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Like `handle_response`, but a 204 No Content becomes `None`
    async fn handle_optional_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }

    /// Handle a response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await.map(|_| ())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ClientError::from_response(status.as_u16(), &error_text))
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');

    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        base_url.to_string()
    } else {
        format!("http://{}", base_url)
    }
}
