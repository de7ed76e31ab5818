use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace::TracerProvider};
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const SERVICE_NAME: &str = "wastesense-local-api";

const INFERENCE_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the log subscriber and the Prometheus recorder
///
/// Spans are exported over OTLP only when `config.otlp_endpoint` is set.
pub fn init_telemetry(config: &Config) -> Result<(), BuildError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let otel_layer = config
        .otlp_endpoint
        .as_deref()
        .and_then(otlp_tracer)
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let otel_enabled = otel_layer.is_some();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .with(otel_layer)
        .init();

    match &config.otlp_endpoint {
        Some(endpoint) if otel_enabled => {
            tracing::info!(%endpoint, "OpenTelemetry tracing enabled")
        }
        Some(endpoint) => {
            tracing::warn!(%endpoint, "OTLP exporter could not be built, tracing stays local")
        }
        None => tracing::info!("OpenTelemetry tracing disabled"),
    }

    init_metrics()
}

fn otlp_tracer(endpoint: &str) -> Option<opentelemetry_sdk::trace::Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .ok()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    let tracer = provider.tracer(SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(provider);

    Some(tracer)
}

fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("inference_duration_seconds".to_string()),
            INFERENCE_BUCKETS,
        )?
        .install_recorder()?;

    // install_recorder fails on a second call, so the cell is always empty here
    let _ = PROMETHEUS_HANDLE.set(handle);

    metrics::describe_counter!("predictions_total", "Predictions served, by waste type");
    metrics::describe_histogram!(
        "inference_duration_seconds",
        "Preprocessing plus forward pass duration in seconds"
    );
    metrics::describe_counter!("http_requests_total", "Total HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

pub async fn handler() -> Response {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_without_recorder_is_unavailable() {
        let response = handler().await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
