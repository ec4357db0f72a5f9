//! Error types for the Gauntlet platform client

use gauntlet_core::PlatformError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the platform client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
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

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    Conflict(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }
}

impl From<ClientError> for PlatformError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RequestFailed(e) => PlatformError::Transport(e.to_string()),
            ClientError::ApiError { status, message } => PlatformError::Api { status, message },
            ClientError::ParseError(msg) => PlatformError::Parse(msg),
            ClientError::NotFound(msg) => PlatformError::not_found("resource", msg),
            ClientError::Conflict(msg) => PlatformError::conflict("resource", msg),
        }
    }
}
