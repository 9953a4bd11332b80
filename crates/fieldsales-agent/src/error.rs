//! Error types for the agent's configuration layer

use std::path::PathBuf;

use fieldsales_client::ClientError;
use thiserror::Error;

/// Errors raised while loading agent configuration
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("API configuration error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid location track: {0}")]
    InvalidTrack(String),

    #[error("Missing configuration value: {0}")]
    Missing(&'static str),
}

/// Result type alias for agent configuration
pub type AgentResult<T> = Result<T, AgentError>;
