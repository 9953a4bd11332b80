//! Configuration for an attendance session

use std::time::Duration;

use fieldsales_core::{GeofenceAnchor, LocationOptions};

/// Interval between periodic location pushes while online
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Configuration for an [`AttendanceSession`](crate::AttendanceSession)
#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// Branch the agent checks in against
    pub anchor: GeofenceAnchor,
    /// Period of the background location sync
    pub sync_interval: Duration,
    /// Options for every location observation
    pub location: LocationOptions,
    /// Event broadcast channel capacity
    pub event_channel_capacity: usize,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            anchor: GeofenceAnchor::default(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            location: LocationOptions::default(),
            event_channel_capacity: 256,
        }
    }
}

impl AttendanceConfig {
    /// Set the branch anchor
    pub fn with_anchor(mut self, anchor: GeofenceAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the periodic sync interval
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Set the location observation options
    pub fn with_location(mut self, location: LocationOptions) -> Self {
        self.location = location;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}
