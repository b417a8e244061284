//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name (used in logs and metric descriptions).
    pub service_name: String,

    /// Metrics configuration.
    pub metrics: MetricsConfig,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a configuration with defaults for `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        Self {
            logging: LogConfig {
                service_name: service_name.clone(),
                ..LogConfig::default()
            },
            metrics: MetricsConfig::default(),
            service_name,
        }
    }

    /// Replaces the logging configuration, keeping the service name.
    #[must_use]
    pub fn with_logging(mut self, logging: LogConfig) -> Self {
        self.logging = LogConfig {
            service_name: self.service_name.clone(),
            ..logging
        };
        self
    }

    /// Replaces the metrics configuration.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsConfig) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("turtle-service")
    }
}
