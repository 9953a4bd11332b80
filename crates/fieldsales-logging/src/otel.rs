//! OTLP span export

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, Tracer, TracerProvider};
use opentelemetry_sdk::{Resource, runtime};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

use crate::config::OtelConfig;

#[derive(Debug, thiserror::Error)]
pub enum OtelError {
    #[error("Failed to create OTLP exporter for {endpoint}: {message}")]
    Exporter { endpoint: String, message: String },
}

fn sampler(ratio: f64) -> Sampler {
    match ratio.clamp(0.0, 1.0) {
        r if r == 1.0 => Sampler::AlwaysOn,
        r if r == 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    }
}

/// Build the export layer and install its provider globally
///
/// Batches are flushed on the tokio runtime; call [`shutdown_otel`] before
/// the runtime stops.
pub fn otlp_layer<S>(config: &OtelConfig) -> Result<OpenTelemetryLayer<S, Tracer>, OtelError>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| OtelError::Exporter {
            endpoint: config.endpoint.clone(),
            message: e.to_string(),
        })?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler(config.sample_ratio))
        .with_resource(Resource::new([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]))
        .build();

    let layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("fieldsales"));
    opentelemetry::global::set_tracer_provider(provider);
    Ok(layer)
}

pub fn shutdown_otel() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_bounds() {
        assert!(matches!(sampler(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler(7.0), Sampler::AlwaysOn));
        assert!(matches!(sampler(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler(0.25), Sampler::TraceIdRatioBased(r) if r == 0.25));
    }
}
