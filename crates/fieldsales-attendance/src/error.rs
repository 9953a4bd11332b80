//! Error types for the attendance core

use fieldsales_core::StoreError;
use thiserror::Error;

/// Errors that can occur in an attendance session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    /// The profile is blocked by an admin; toggles are refused without I/O
    #[error("Profile is blocked")]
    Blocked,

    /// A previous toggle has not finished yet
    #[error("Status update already in progress")]
    ToggleInFlight,

    /// A previous manual sync has not finished yet
    #[error("Location sync already in progress")]
    SyncInFlight,

    /// Manual sync requested while offline
    #[error("Attendance is offline")]
    NotOnline,

    /// The remote status write failed; local state is unchanged
    #[error("Failed to update status: {0}")]
    StatusUpdate(#[source] StoreError),

    /// The remote location write failed
    #[error("Failed to update position: {0}")]
    LocationPush(#[source] StoreError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The session has been torn down
    #[error("Attendance session closed")]
    SessionClosed,
}

/// Result type alias for attendance operations
pub type AttendanceResult<T> = Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = AttendanceError::StatusUpdate(StoreError::Status {
            status: 500,
            message: "Internal Server Error".into(),
        });
        assert_eq!(
            err.to_string(),
            "Failed to update status: Unexpected status 500: Internal Server Error"
        );
        assert_eq!(AttendanceError::Blocked.to_string(), "Profile is blocked");
    }

    #[test]
    fn test_store_error_converts() {
        let err: AttendanceError = StoreError::Forbidden.into();
        assert_eq!(err, AttendanceError::Store(StoreError::Forbidden));
    }
}
