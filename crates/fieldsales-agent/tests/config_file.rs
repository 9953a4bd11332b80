//! Loading agent configuration and location tracks from disk

use std::io::Write;
use std::time::Duration;

use fieldsales_agent::{AgentConfig, AgentError, ReplayLocationProvider};
use fieldsales_core::{GeoPosition, GeofenceAnchor, LocationOptions, LocationProvider};
use fieldsales_logging::LogFormat;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_temp(
        r#"
[api]
base_url = "https://cms.example.com"
timeout_secs = 5

[session]
email = "agent@example.com"

[geofence]
latitude = -6.2
longitude = 106.8
radius_meters = 250

[sync]
interval_secs = 600

[location]
high_accuracy = false
track = [[-6.2, 106.8]]

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = AgentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.email().unwrap(), "agent@example.com");
    assert_eq!(config.geofence, GeofenceAnchor::new(-6.2, 106.8).with_radius(250));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);

    let api = config.api_config().unwrap();
    assert_eq!(api.base_url, "https://cms.example.com/api");
    assert_eq!(api.timeout, Duration::from_secs(5));

    let attendance = config.attendance_config();
    assert_eq!(attendance.sync_interval, Duration::from_secs(600));
    assert!(!attendance.location.high_accuracy);
}

#[test]
fn test_empty_file_uses_defaults() {
    let file = write_temp("");
    let config = AgentConfig::from_file(file.path()).unwrap();

    assert_eq!(config.geofence, GeofenceAnchor::default());
    assert_eq!(config.sync.interval_secs, 30 * 60);
    assert!(matches!(config.email(), Err(AgentError::Missing("session.email"))));
    assert!(config.api_config().is_err());
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = AgentConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, AgentError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_malformed_toml_is_rejected() {
    let file = write_temp("[api\nbase_url = ");
    assert!(matches!(
        AgentConfig::from_file(file.path()),
        Err(AgentError::Toml(_))
    ));
}

#[test]
fn test_track_file_appends_after_inline_track() {
    let track = write_temp("# morning route\n-6.1760, 106.8280\n\n-6.1770,106.8290\n");
    let mut config = AgentConfig::default();
    config.location.track = vec![[-6.1754, 106.8272]];
    config.location.track_file = Some(track.path().to_path_buf());

    let positions = config.track().unwrap();
    assert_eq!(
        positions,
        vec![
            GeoPosition::new(-6.1754, 106.8272),
            GeoPosition::new(-6.1760, 106.8280),
            GeoPosition::new(-6.1770, 106.8290),
        ]
    );
}

#[test]
fn test_track_file_with_bad_line() {
    let track = write_temp("-6.1760, 106.8280\nnorth of the office\n");
    let mut config = AgentConfig::default();
    config.location.track_file = Some(track.path().to_path_buf());

    let err = config.track().unwrap_err();
    assert!(matches!(err, AgentError::InvalidTrack(_)));
    assert!(err.to_string().contains("line 2"));
}

#[tokio::test]
async fn test_replay_from_loaded_track() {
    let track = write_temp("-6.1760,106.8280\n");
    let mut config = AgentConfig::default();
    config.location.track_file = Some(track.path().to_path_buf());

    let provider = ReplayLocationProvider::new(config.track().unwrap(), Duration::from_secs(1));
    let position = provider
        .current_position(&LocationOptions::default())
        .await
        .unwrap();
    assert_eq!(position, GeoPosition::new(-6.1760, 106.8280));
}
