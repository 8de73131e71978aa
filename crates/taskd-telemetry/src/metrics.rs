//! Prometheus metrics for taskd.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `taskd_requests_total` | Counter | `operation`, `status` | Total requests |
//! | `taskd_request_duration_seconds` | Histogram | `operation` | Request latency |
//! | `taskd_in_flight_requests` | Gauge | - | Admitted, unfinished requests |
//! | `taskd_classified_errors_total` | Counter | `kind` | Failures by taxonomy kind |
//!
//! The recording functions are cheap no-ops until [`init_metrics`] installs
//! a recorder, so callers never need to check whether metrics are on.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Request counter name.
pub const REQUESTS_TOTAL: &str = "taskd_requests_total";

/// Request latency histogram name.
pub const REQUEST_DURATION_SECONDS: &str = "taskd_request_duration_seconds";

/// In-flight gauge name.
pub const IN_FLIGHT_REQUESTS: &str = "taskd_in_flight_requests";

/// Classified failure counter name.
pub const CLASSIFIED_ERRORS_TOTAL: &str = "taskd_classified_errors_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether the Prometheus listener is started.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime, which drives the listener.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    register_metric_descriptions();

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "metrics listener stopped");
        }
    });

    tracing::info!(%addr, "metrics listener started");
    Ok(())
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of admitted requests that have not finished"
    );
    describe_counter!(
        CLASSIFIED_ERRORS_TOTAL,
        "Failed requests by error classification"
    );
}

/// Records a completed request.
pub fn record_request(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records one classified failure.
pub fn record_classified_error(kind: &str) {
    counter!(CLASSIFIED_ERRORS_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Sets the in-flight gauge.
pub fn set_in_flight(count: usize) {
    gauge!(IN_FLIGHT_REQUESTS).set(count as f64);
}
