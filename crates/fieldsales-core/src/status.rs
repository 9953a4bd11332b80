//! Attendance status and loose-flag normalisation
//!
//! The backend stores attendance and approval flags as whatever the admin
//! panel last wrote: booleans, strings or numbers. These helpers collapse
//! those representations into typed values at the boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Online/offline work-session state of a sales agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Online,
    #[default]
    Offline,
}

impl AttendanceStatus {
    /// Normalise an externally supplied status value.
    ///
    /// `"ONLINE"`, `true` and `"true"` map to [`AttendanceStatus::Online`];
    /// every other value, including `null`, maps to `Offline`.
    pub fn normalize(value: &Value) -> Self {
        match value {
            Value::Bool(true) => AttendanceStatus::Online,
            Value::String(s) if s == "ONLINE" || s == "true" => AttendanceStatus::Online,
            _ => AttendanceStatus::Offline,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, AttendanceStatus::Online)
    }

    /// The wire value written to the profile's `online_stat` flag
    pub fn as_flag(&self) -> bool {
        self.is_online()
    }
}

impl From<bool> for AttendanceStatus {
    fn from(online: bool) -> Self {
        if online {
            AttendanceStatus::Online
        } else {
            AttendanceStatus::Offline
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Online => write!(f, "ONLINE"),
            AttendanceStatus::Offline => write!(f, "OFFLINE"),
        }
    }
}

/// Normalise a profile's `approved` flag: `true`, `"true"`, `1` and `"1"`
pub fn normalize_approved(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true" || s == "1",
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthy_synonyms_are_online() {
        for value in [json!("ONLINE"), json!(true), json!("true")] {
            assert_eq!(AttendanceStatus::normalize(&value), AttendanceStatus::Online);
        }
    }

    #[test]
    fn test_everything_else_is_offline() {
        for value in [
            json!("OFFLINE"),
            json!("online"),
            json!("TRUE"),
            json!(false),
            json!("false"),
            json!(1),
            json!(null),
            json!({}),
            json!([true]),
        ] {
            assert_eq!(
                AttendanceStatus::normalize(&value),
                AttendanceStatus::Offline,
                "value {value} should be offline"
            );
        }
    }

    #[test]
    fn test_approved_normalisation() {
        assert!(normalize_approved(&json!(true)));
        assert!(normalize_approved(&json!("true")));
        assert!(normalize_approved(&json!(1)));
        assert!(normalize_approved(&json!("1")));
        assert!(!normalize_approved(&json!(0)));
        assert!(!normalize_approved(&json!("yes")));
        assert!(!normalize_approved(&json!(null)));
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(AttendanceStatus::Online.to_string(), "ONLINE");
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::Offline).unwrap(),
            "\"OFFLINE\""
        );
        assert_eq!(AttendanceStatus::from(true), AttendanceStatus::Online);
        assert!(!AttendanceStatus::default().is_online());
    }
}
