//! Configuration section types.

use serde::{Deserialize, Serialize};
use turtle_telemetry::{LogConfig, MetricsConfig, TelemetryConfig};

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "turtle-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `turtle_middleware=debug,warn`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Request duration histogram buckets, in seconds.
    ///
    /// The built-in 1ms..10s buckets are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_buckets: Option<Vec<f64>>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: None,
        }
    }
}

/// Telemetry configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigSection {
    /// Service name reported in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for TelemetryConfigSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl TelemetryConfigSection {
    /// Converts this section into the runtime telemetry configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use turtle_config::{LogFormat, TelemetryConfigSection};
    ///
    /// let mut section = TelemetryConfigSection::default();
    /// section.logging.format = LogFormat::Pretty;
    ///
    /// let config = section.to_telemetry_config();
    /// assert!(!config.logging.json_format);
    /// assert_eq!(config.logging.service_name, "turtle-service");
    /// ```
    #[must_use]
    pub fn to_telemetry_config(&self) -> TelemetryConfig {
        let logging = LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            file_line_info: self.logging.include_location,
            ..LogConfig::production()
        };

        let mut metrics = MetricsConfig {
            enabled: self.metrics.enabled,
            ..MetricsConfig::default()
        };
        if let Some(buckets) = &self.metrics.duration_buckets {
            metrics.duration_buckets.clone_from(buckets);
        }

        TelemetryConfig::new(self.service_name.clone())
            .with_logging(logging)
            .with_metrics(metrics)
    }
}

/// Authentication defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Scheme used by endpoints that list none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scheme: Option<String>,

    /// Include internal error details in 500 responses.
    #[serde(default)]
    pub expose_internal_errors: bool,
}
