//! Error types for the Vertex AI client.

use std::time::Duration;

use thiserror::Error;

/// Result type for Vertex AI client operations.
pub type Result<T> = std::result::Result<T, VertexError>;

/// Vertex AI client errors.
#[derive(Debug, Error)]
pub enum VertexError {
    /// Configuration error (bad endpoint, client could not be built)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection refused, DNS, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the client timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response shape)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl VertexError {
    /// True for 401/403 responses.
    pub fn is_auth(&self) -> bool {
        matches!(self, VertexError::Api { status: 401 | 403, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VertexError::Timeout(_))
    }
}
