//! Error types for Fieldsales

use thiserror::Error;

/// Top-level error type for the attendance core
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Errors reported by the platform geolocation service
///
/// Every variant is terminal for one acquisition attempt only; a later
/// successful reading supersedes it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("User denied Geolocation: {0}")]
    PermissionDenied(String),

    #[error("Timeout expired after {0} ms")]
    Timeout(u64),

    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Geolocation is not supported")]
    Unsupported,
}

/// Errors from the remote profile store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend answered 403; the session token or role is no longer valid
    #[error("Forbidden")]
    Forbidden,

    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response
    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether this failure means the session must be terminated
    pub fn is_forbidden(&self) -> bool {
        matches!(self, StoreError::Forbidden)
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
