//! Agent configuration file
//!
//! ```toml
//! [api]
//! base_url = "https://cms.example.com"
//!
//! [session]
//! email = "agent@example.com"
//!
//! [geofence]
//! latitude = -6.175392
//! longitude = 106.827153
//! radius_meters = 500
//!
//! [location]
//! track = [[-6.1754, 106.8272], [-6.1760, 106.8280]]
//! step_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! `FIELDSALES_API_TOKEN` overrides `api.token`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fieldsales_attendance::{AttendanceConfig, DEFAULT_SYNC_INTERVAL};
use fieldsales_client::{ApiConfig, DEFAULT_REQUEST_TIMEOUT};
use fieldsales_core::{DEFAULT_LOCATION_TIMEOUT, GeoPosition, GeofenceAnchor, LocationOptions};
use fieldsales_logging::LogConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Environment variable holding the API bearer token
pub const TOKEN_ENV: &str = "FIELDSALES_API_TOKEN";

/// Top-level agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub api: ApiSection,
    pub session: SessionSection,
    pub geofence: GeofenceAnchor,
    pub sync: SyncSection,
    pub location: LocationSection,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// REST root or server URL; `/api` is appended when missing
    pub base_url: String,
    /// Server root for media paths, derived from `base_url` when absent
    pub media_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            media_url: None,
            token: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Email the sales profile is registered under
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Periodic location push interval
    pub interval_secs: u64,
    /// How often `run` re-checks block and approval state
    pub profile_refresh_secs: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            profile_refresh_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSection {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    /// Inline `[latitude, longitude]` readings to replay
    pub track: Vec<[f64; 2]>,
    /// File of `latitude,longitude` lines, appended after `track`
    pub track_file: Option<PathBuf>,
    /// Delay between replayed readings
    pub step_secs: u64,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: DEFAULT_LOCATION_TIMEOUT.as_millis() as u64,
            track: Vec::new(),
            track_file: None,
            step_secs: 60,
        }
    }
}

impl AgentConfig {
    /// Load from a TOML file and apply environment overrides
    pub fn from_file(path: &Path) -> AgentResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AgentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AgentConfig = toml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.api.token = Some(token);
        }
    }

    /// Resolved REST endpoints
    pub fn api_config(&self) -> AgentResult<ApiConfig> {
        let mut api = ApiConfig::resolve(&self.api.base_url, self.api.media_url.as_deref())?
            .with_timeout(Duration::from_secs(self.api.timeout_secs));
        if let Some(token) = &self.api.token {
            api = api.with_token(token.clone());
        }
        Ok(api)
    }

    pub fn email(&self) -> AgentResult<&str> {
        match self.session.email.trim() {
            "" => Err(AgentError::Missing("session.email")),
            email => Ok(email),
        }
    }

    pub fn location_options(&self) -> LocationOptions {
        LocationOptions::default()
            .with_high_accuracy(self.location.high_accuracy)
            .with_timeout(Duration::from_millis(self.location.timeout_ms))
    }

    pub fn attendance_config(&self) -> AttendanceConfig {
        AttendanceConfig::default()
            .with_anchor(self.geofence)
            .with_sync_interval(Duration::from_secs(self.sync.interval_secs))
            .with_location(self.location_options())
    }

    /// Readings to replay, inline track first
    pub fn track(&self) -> AgentResult<Vec<GeoPosition>> {
        let mut track = self
            .location
            .track
            .iter()
            .map(|[lat, lon]| to_position(*lat, *lon))
            .collect::<AgentResult<Vec<_>>>()?;

        if let Some(path) = &self.location.track_file {
            let content = std::fs::read_to_string(path).map_err(|source| AgentError::Io {
                path: path.clone(),
                source,
            })?;
            track.extend(parse_track(&content)?);
        }
        Ok(track)
    }
}

fn to_position(latitude: f64, longitude: f64) -> AgentResult<GeoPosition> {
    GeoPosition::try_new(latitude, longitude).map_err(|e| AgentError::InvalidTrack(e.to_string()))
}

/// Parse `latitude,longitude` lines; blank lines and `#` comments are skipped
pub fn parse_track(content: &str) -> AgentResult<Vec<GeoPosition>> {
    content
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            let (lat, lon) = line
                .split_once(',')
                .ok_or_else(|| AgentError::InvalidTrack(format!("line {n}: expected lat,lon")))?;
            let parse = |v: &str| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| AgentError::InvalidTrack(format!("line {n}: {e}")))
            };
            to_position(parse(lat)?, parse(lon)?)
        })
        .collect()
}
