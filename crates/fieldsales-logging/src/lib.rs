//! Structured logging for Fieldsales
//!
//! Sets up the `tracing` subscriber used by the agent binary and by tests.
//!
//! Console lines go to stderr so command output on stdout stays clean.
//! Every span opened inside a [`SessionContextGuard`] carries the agent's
//! profile id. A rolling JSONL file and OTLP span export are optional.
//!
//! ```ignore
//! let _guard = FieldSubscriberBuilder::new()
//!     .with_config(agent_config.logging.clone())
//!     .with_level("debug")
//!     .try_init()?;
//! ```

pub mod config;
pub mod context;
pub mod layers;
pub mod otel;

pub use config::{AGENT_TARGETS, FileConfig, FileRotation, LogConfig, LogFormat, OtelConfig};
pub use context::{SessionContextData, SessionContextGuard, SessionMode};
pub use layers::SessionContextLayer;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors from subscriber initialisation
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Builds and installs the global subscriber
pub struct FieldSubscriberBuilder {
    config: LogConfig,
}

impl FieldSubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Level for the fieldsales crates
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn with_opentelemetry(mut self, config: OtelConfig) -> Self {
        self.config.otel = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn json_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync + 'static
    where
        S: tracing::Subscriber + for<'span> LookupSpan<'span>,
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .flatten_event(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer)
    }

    /// Install the subscriber globally
    ///
    /// `RUST_LOG` wins over the configured levels. Returns the file writer
    /// guard when file output is enabled; keep it alive until exit or
    /// buffered lines are lost.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter_directives()));

        let pretty = (self.config.format == LogFormat::Pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(self.config.ansi)
                .with_target(true)
        });
        let json = (self.config.format == LogFormat::Json)
            .then(|| Self::json_layer(std::io::stderr));

        let (file_layer, guard) = match &self.config.file {
            Some(file) => {
                let rotation = match file.rotation {
                    FileRotation::Daily => Rotation::DAILY,
                    FileRotation::Hourly => Rotation::HOURLY,
                    FileRotation::Never => Rotation::NEVER,
                };
                let appender = RollingFileAppender::new(
                    rotation,
                    &file.directory,
                    format!("{}.log", file.prefix),
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(Self::json_layer(writer)), Some(guard))
            }
            None => (None, None),
        };

        let otel_layer = self.config.otel.as_ref().and_then(|otel| {
            otel::otlp_layer(otel)
                .map_err(|e| eprintln!("Warning: span export disabled: {e}"))
                .ok()
        });

        Registry::default()
            .with(env_filter)
            .with(SessionContextLayer::new())
            .with(pretty)
            .with(json)
            .with(file_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for FieldSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the quiet test subscriber; repeat calls are ignored
pub fn init_testing() {
    let _ = FieldSubscriberBuilder::new()
        .with_config(LogConfig::quiet())
        .try_init();
}

/// Flush pending spans
pub fn shutdown() {
    otel::shutdown_otel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = FieldSubscriberBuilder::new();
        assert_eq!(builder.config().level, "info");
        assert_eq!(builder.config().format, LogFormat::Pretty);
    }

    #[test]
    fn test_cli_level_overrides_config_level() {
        let mut config = LogConfig::default();
        config.level = "warn".into();
        config.dependency_level = "error".into();
        let builder = FieldSubscriberBuilder::new()
            .with_config(config)
            .with_level("trace")
            .with_format(LogFormat::Off);
        assert_eq!(builder.config().level, "trace");
        assert_eq!(builder.config().dependency_level, "error");
        assert!(builder.config().filter_directives().contains("fieldsales_agent=trace"));
    }

    #[test]
    fn test_optional_outputs() {
        let builder = FieldSubscriberBuilder::new()
            .with_file_output(FileConfig::default())
            .with_opentelemetry(OtelConfig::default().with_endpoint("http://collector:4317"));
        assert_eq!(
            builder.config().file.as_ref().map(|f| f.prefix.as_str()),
            Some("fieldsales-agent")
        );
        assert_eq!(
            builder.config().otel.as_ref().map(|o| o.endpoint.as_str()),
            Some("http://collector:4317")
        );
    }
}
