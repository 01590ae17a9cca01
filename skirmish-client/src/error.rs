//! Error types for the Skirmish client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the controller
#[derive(Debug, Error)]
pub enum ClientError {
    /// The controller could not be reached at all
    #[error("failed to connect to controller at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The referenced job does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller does not hold the claim on the job
    #[error("not owner: {0}")]
    NotOwner(String),

    /// The job is in a state that does not allow the operation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The controller's store failed
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other error status from the controller
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Error body returned by the controller
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: Option<String>,
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Builds the typed error for an error response body
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
            return Self::api_error(status, body);
        };

        match parsed.code.as_deref() {
            Some("not_found") => Self::NotFound(parsed.error),
            Some("not_owner") => Self::NotOwner(parsed.error),
            Some("invalid_state") => Self::InvalidState(parsed.error),
            Some("store_unavailable") => Self::StoreUnavailable(parsed.error),
            _ => Self::api_error(status, parsed.error),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if the caller lost its claim on the job
    pub fn is_not_owner(&self) -> bool {
        matches!(self, Self::NotOwner(_))
    }
}
