//! Logging and metrics for Turtle.
//!
//! - **Logging**: structured JSON (or pretty) output via `tracing-subscriber`
//! - **Metrics**: request counters and latency histograms via the `metrics`
//!   facade, with an optional Prometheus recorder
//!
//! # Example
//!
//! ```rust,ignore
//! use turtle_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::new("orders"))?;
//! // ... serve ...
//! let exposition = turtle_telemetry::render_metrics();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use metrics::{
    describe_metrics, init_metrics, record_auth_failure, record_rejection, record_request,
    render_metrics, InFlightGuard, MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
