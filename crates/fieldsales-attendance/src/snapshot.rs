//! Point-in-time summary of an attendance session for display

use fieldsales_core::{AttendanceStatus, GeoPosition, GeofenceResult};
use serde::Serialize;

use crate::position::PositionState;

/// Status summary as rendered by the attendance card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSnapshot {
    pub status: AttendanceStatus,
    /// "Locating...", "Location Error", "Distance: Nm from Branch" or
    /// "Unknown Location"
    pub location_label: String,
    pub position: Option<GeoPosition>,
    pub geofence: Option<GeofenceResult>,
    /// Inside the branch radius
    pub in_range: bool,
    /// The switch accepts input (not blocked, no toggle pending)
    pub can_toggle: bool,
    /// The manual sync button is enabled
    pub can_sync: bool,
}

/// Label describing where the agent is relative to the branch
pub fn location_label(state: &PositionState, geofence: Option<GeofenceResult>) -> String {
    if state.loading {
        "Locating...".to_string()
    } else if state.error.is_some() {
        "Location Error".to_string()
    } else if let Some(result) = geofence {
        format!("Distance: {}m from Branch", result.distance_meters)
    } else {
        "Unknown Location".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsales_core::LocationError;

    #[test]
    fn test_labels() {
        let result = GeofenceResult {
            distance_meters: 120,
            is_within: true,
        };

        assert_eq!(location_label(&PositionState::default(), None), "Locating...");

        let mut state = PositionState::located(GeoPosition::new(0.0, 0.0));
        assert_eq!(location_label(&state, Some(result)), "Distance: 120m from Branch");

        state.error = Some(LocationError::Timeout(5000));
        assert_eq!(location_label(&state, Some(result)), "Location Error");

        state.error = None;
        assert_eq!(location_label(&state, None), "Unknown Location");
    }
}
