//! Metalsoft client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Metalsoft API
#[derive(Debug, Error)]
pub enum MetalsoftError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a JSON-RPC error.
    ///
    /// `message` is the provider's text verbatim; "already exists" rejections
    /// carry a reference code and the ID of the existing object in it.
    #[error("Metalsoft API error {code}: {message}")]
    Api {
        /// JSON-RPC error code
        code: i64,
        /// Provider error message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credentials are missing or malformed
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API returned something that is neither a result nor an error
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
