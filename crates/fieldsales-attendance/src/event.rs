//! Notifications published by an attendance session

use std::fmt;

use fieldsales_core::{AttendanceStatus, GeoPosition, StoreError};

/// What caused a location push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTrigger {
    /// Out-of-band push right after going online
    Immediate,
    /// "Update Position Immediately" from the agent
    Manual,
    /// Background timer tick
    Periodic,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Immediate => write!(f, "immediate"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Periodic => write!(f, "periodic"),
        }
    }
}

/// Events delivered to session subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceEvent {
    /// The remote status write succeeded and local state follows it
    StatusChanged {
        from: AttendanceStatus,
        to: AttendanceStatus,
    },
    /// The remote status write failed; local state is unchanged
    StatusUpdateFailed {
        requested: AttendanceStatus,
        error: StoreError,
    },
    /// A location push was accepted by the store
    LocationPushed {
        position: GeoPosition,
        trigger: SyncTrigger,
    },
    /// A location push was rejected
    LocationPushFailed {
        position: GeoPosition,
        trigger: SyncTrigger,
        error: StoreError,
    },
}

impl AttendanceEvent {
    /// Short user-facing message, as shown by the attendance card
    pub fn message(&self) -> String {
        match self {
            AttendanceEvent::StatusChanged { to, .. } if to.is_online() => {
                "You are Online".to_string()
            }
            AttendanceEvent::StatusChanged { .. } => "You are Offline".to_string(),
            AttendanceEvent::StatusUpdateFailed { .. } => "Failed to update status.".to_string(),
            AttendanceEvent::LocationPushed { .. } => "Position updated successfully!".to_string(),
            AttendanceEvent::LocationPushFailed { .. } => "Failed to update position.".to_string(),
        }
    }
}
