//! Error types for the HTTP client

use thiserror::Error;

/// Errors raised while configuring the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API base URL was configured
    #[error("API base URL is not configured")]
    MissingBaseUrl,

    /// The base URL is not an http(s) URL
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for client configuration
pub type ClientResult<T> = Result<T, ClientError>;
