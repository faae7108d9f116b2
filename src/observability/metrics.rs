//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_calls_total` (counter): logical calls by method and outcome
//! - `api_call_duration_seconds` (histogram): end-to-end latency including retries
//! - `api_retries_total` (counter): retries by method
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus exporter is opt-in via configuration

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and start its HTTP listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished logical call.
pub fn record_call(method: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "api_calls_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("api_call_duration_seconds", "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record one retry.
pub fn record_retry(method: &str) {
    metrics::counter!("api_retries_total", "method" => method.to_string()).increment(1);
}
