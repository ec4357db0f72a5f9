//! Error types shared by every Gauntlet crate

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for platform operations
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Result type alias for core operations (hand-off files, gate resolution)
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised by a platform backend
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The named resource does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind (model, image, service, ...)
        kind: &'static str,
        /// Name or identifier that was looked up
        name: String,
    },

    /// A resource with the same name already exists
    #[error("{kind} already exists: {name}")]
    Conflict {
        /// Resource kind
        kind: &'static str,
        /// Name of the existing resource
        name: String,
    },

    /// Platform API returned an error status code
    #[error("platform API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// A long-running operation reached a failed terminal state
    #[error("{operation} failed: {message}")]
    OperationFailed {
        /// Operation that failed (e.g. "image build my-image:3")
        operation: String,
        /// Failure detail reported by the platform
        message: String,
    },

    /// A bounded wait ran out of time
    #[error("timed out after {waited:?} waiting for {operation}")]
    Timeout {
        /// Operation that was awaited
        operation: String,
        /// How long we waited
        waited: Duration,
    },

    /// Request rejected before reaching the platform
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure talking to the platform
    #[error("platform request failed: {0}")]
    Transport(String),

    /// Failed to parse a platform response
    #[error("failed to parse platform response: {0}")]
    Parse(String),

    /// Local I/O failure (local platform backend, downloads)
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlatformError {
    /// Create a not-found error
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            name: name.into(),
        }
    }

    /// Check if this error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. }) || matches!(self, Self::Api { status: 404, .. })
    }
}

/// Errors raised by core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reading or writing a hand-off file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A hand-off file did not contain a valid record
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The record was written by a newer pipeline than this one understands
    #[error("unsupported hand-off schema version {found} (supported up to {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// A platform call failed
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(PlatformError::not_found("service", "chd-svc").is_not_found());
        assert!(
            PlatformError::Api {
                status: 404,
                message: "gone".to_string()
            }
            .is_not_found()
        );
        assert!(
            !PlatformError::Api {
                status: 500,
                message: "boom".to_string()
            }
            .is_not_found()
        );
        assert!(!PlatformError::conflict("service", "chd-svc").is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = PlatformError::not_found("image", "chd-image:2");
        assert_eq!(err.to_string(), "image not found: chd-image:2");

        let err = CoreError::UnsupportedSchema {
            found: 3,
            supported: 1,
        };
        assert!(err.to_string().contains("version 3"));
    }
}
