//! Error types for the caching and request layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for construction and programmer errors.
///
/// Runtime misses are never errors: cache reads return `Option`, and failed
/// network calls are reported through [`crate::models::ApiResponse`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid construction-time configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A zero TTL would make the entry expire on insertion
    #[error("Invalid TTL for key '{0}': TTL must be greater than zero")]
    InvalidTtl(String),

    /// Malformed request construction
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// == Storage Error Enum ==
/// Failures raised by durable storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend refused the write because it would exceed its quota
    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// Underlying I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Request Error Enum ==
/// Outcome of a failed network call.
///
/// Cloneable so a single settled outcome can be handed to every deduplicated
/// waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The attempt did not settle within the per-attempt timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection-level failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not valid for the requested type
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RequestError {
    // == Retryable ==
    /// Whether another attempt could change the outcome.
    ///
    /// Timeouts, decode failures and 400/401/403 responses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Timeout(_) | RequestError::Decode(_) => false,
            RequestError::Status { status, .. } => !matches!(status, 400 | 401 | 403),
            RequestError::Transport(_) => true,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
