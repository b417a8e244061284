//! Request metrics.
//!
//! Recording goes through the `metrics` facade, so the functions here are
//! cheap no-ops until a recorder is installed. [`init_metrics`] installs a
//! Prometheus recorder; the application exposes [`render_metrics`] on
//! whatever route it likes.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `turtle_requests_total` | Counter | `endpoint`, `status` | Completed requests |
//! | `turtle_request_duration_seconds` | Histogram | `endpoint` | Request latency |
//! | `turtle_in_flight_requests` | Gauge | - | Requests being served |
//! | `turtle_auth_failures_total` | Counter | `scheme` | Required authentication failures |
//! | `turtle_rejections_total` | Counter | `category` | Requests refused by a built-in stage |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for request duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for empty buckets and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.duration_buckets.is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "duration_buckets must not be empty".to_string(),
        ));
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("turtle_request_duration_seconds".to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the standard metrics.
pub fn describe_metrics() {
    describe_counter!("turtle_requests_total", "Total number of requests served");
    describe_histogram!(
        "turtle_request_duration_seconds",
        "Request duration in seconds"
    );
    describe_gauge!(
        "turtle_in_flight_requests",
        "Number of requests currently being served"
    );
    describe_counter!(
        "turtle_auth_failures_total",
        "Requests refused because required authentication failed"
    );
    describe_counter!(
        "turtle_rejections_total",
        "Requests refused by a built-in stage, by category"
    );
}

/// Records a completed request.
pub fn record_request(endpoint: &str, status_code: u16, duration: Duration) {
    counter!(
        "turtle_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "turtle_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a required-authentication failure for the last scheme tried.
pub fn record_auth_failure(scheme: &str) {
    counter!(
        "turtle_auth_failures_total",
        "scheme" => scheme.to_string()
    )
    .increment(1);
}

/// Records a refused request.
pub fn record_rejection(category: &str) {
    counter!(
        "turtle_rejections_total",
        "category" => category.to_string()
    )
    .increment(1);
}

/// Guard that tracks one in-flight request.
///
/// Increments the gauge on creation and decrements it on drop, so a
/// cancelled request is still accounted for.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!("turtle_in_flight_requests").increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!("turtle_in_flight_requests").decrement(1.0);
    }
}
