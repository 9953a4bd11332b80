//! The `[logging]` section of the agent configuration
//!
//! ```toml
//! [logging]
//! level = "debug"              # fieldsales crates
//! dependency_level = "warn"    # reqwest, hyper, h2, tonic, ...
//! format = "json"              # pretty | json | off
//!
//! [logging.targets]
//! fieldsales_client = "trace"
//!
//! [logging.file]
//! directory = "/var/log/fieldsales"
//! rotation = "hourly"
//!
//! [logging.otel]
//! endpoint = "http://collector:4317"
//! sample_ratio = 0.1
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Targets that get `level`; everything else gets `dependency_level`
pub const AGENT_TARGETS: [&str; 5] = [
    "fieldsales_core",
    "fieldsales_attendance",
    "fieldsales_client",
    "fieldsales_logging",
    "fieldsales_agent",
];

/// How console lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for an agent watching the terminal
    #[default]
    Pretty,
    /// One JSON object per line, for a supervisor collecting stderr
    Json,
    /// No console output
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dependency_level: String,
    pub format: LogFormat,
    pub ansi: bool,
    /// Per-target overrides, applied last
    pub targets: BTreeMap<String, String>,
    /// JSONL file output; absent means none
    pub file: Option<FileConfig>,
    /// OTLP span export; absent means none
    pub otel: Option<OtelConfig>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dependency_level: "warn".to_string(),
            format: LogFormat::Pretty,
            ansi: true,
            targets: BTreeMap::new(),
            file: None,
            otel: None,
        }
    }
}

impl LogConfig {
    /// Warnings only, plain text; used by tests
    pub fn quiet() -> Self {
        Self {
            level: "warn".to_string(),
            ansi: false,
            ..Default::default()
        }
    }

    /// The env-filter directive string
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.dependency_level.clone()];
        directives.extend(
            AGENT_TARGETS
                .iter()
                .filter(|target| !self.targets.contains_key(**target))
                .map(|target| format!("{target}={}", self.level)),
        );
        directives.extend(self.targets.iter().map(|(t, l)| format!("{t}={l}")));
        directives.join(",")
    }
}

/// Rolling JSONL log file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; `.log` is appended
    pub prefix: String,
    pub rotation: FileRotation,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "fieldsales-agent".to_string(),
            rotation: FileRotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtelConfig {
    pub endpoint: String,
    pub service_name: String,
    /// Fraction of traces kept, clamped to `0.0..=1.0`
    pub sample_ratio: f64,
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4317".to_string(),
            service_name: "fieldsales-agent".to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl OtelConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_sample_ratio(mut self, ratio: f64) -> Self {
        self.sample_ratio = ratio.clamp(0.0, 1.0);
        self
    }
}
