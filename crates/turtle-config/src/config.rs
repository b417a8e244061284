//! Root configuration type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use turtle_core::EndpointPolicy;

use crate::{AuthConfig, ConfigError, LogFormat, TelemetryConfigSection};

/// Complete Turtle configuration.
///
/// Endpoints are kept in file order so that build logs and validation errors
/// follow the layout of the configuration file.
///
/// # Example
///
/// ```
/// use turtle_config::TurtleConfig;
///
/// let config: TurtleConfig = toml::from_str(r#"
///     [auth]
///     default_scheme = "bearer"
///
///     [endpoints.orders]
///     roles = ["admin"]
///     allow = ["application/json"]
/// "#).unwrap();
///
/// config.validate().unwrap();
/// assert_eq!(config.endpoint("orders").unwrap().auth_mode, "required");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TurtleConfig {
    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,

    /// Authentication defaults.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-endpoint security policies keyed by endpoint name.
    #[serde(default)]
    pub endpoints: IndexMap<String, EndpointPolicy>,
}

impl TurtleConfig {
    /// Development preset: debug level, pretty logs, internal errors exposed.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.include_location = true;
        config.auth.expose_internal_errors = true;
        config
    }

    /// Production preset: info level, JSON logs, internal errors hidden.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.format = LogFormat::Json;
        config.auth.expose_internal_errors = false;
        config
    }

    /// Returns the policy for `name`, if configured.
    #[must_use]
    pub fn endpoint(&self, name: &str) -> Option<&EndpointPolicy> {
        self.endpoints.get(name)
    }

    /// Validates everything that can be checked without a scheme registry.
    ///
    /// Scheme names are checked when the endpoint is built, since schemes
    /// are registered in code.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if let Err(err) = turtle_telemetry::create_env_filter(&self.telemetry.logging.level) {
            return Err(ConfigError::invalid_value(
                "telemetry.logging.level",
                err.to_string(),
            ));
        }

        if self
            .telemetry
            .metrics
            .duration_buckets
            .as_ref()
            .is_some_and(Vec::is_empty)
        {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.duration_buckets",
                "must not be empty",
            ));
        }

        if self
            .auth
            .default_scheme
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "auth.default_scheme",
                "must not be empty",
            ));
        }

        for (name, policy) in &self.endpoints {
            if name.trim().is_empty() {
                return Err(ConfigError::validation_error("endpoint name must not be empty"));
            }
            policy
                .validate()
                .map_err(|err| ConfigError::invalid_endpoint(name, err))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turtle_core::{AuthMode, BuildError};

    fn with_endpoint(name: &str, policy: EndpointPolicy) -> TurtleConfig {
        let mut config = TurtleConfig::default();
        config.endpoints.insert(name.to_string(), policy);
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = TurtleConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.endpoints.is_empty());
        assert!(config.auth.default_scheme.is_none());
    }

    #[test]
    fn test_presets() {
        let dev = TurtleConfig::development();
        assert_eq!(dev.telemetry.logging.level, "debug");
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert!(dev.auth.expose_internal_errors);
        assert!(dev.validate().is_ok());

        let prod = TurtleConfig::production();
        assert_eq!(prod.telemetry.logging.format, LogFormat::Json);
        assert!(!prod.auth.expose_internal_errors);
    }

    #[test]
    fn test_invalid_auth_mode_names_endpoint() {
        let config = with_endpoint(
            "reports",
            EndpointPolicy {
                auth_mode: "sometimes".to_string(),
                ..Default::default()
            },
        );

        match config.validate() {
            Err(ConfigError::InvalidEndpoint { endpoint, source }) => {
                assert_eq!(endpoint, "reports");
                assert_eq!(
                    source,
                    BuildError::InvalidAuthMode {
                        mode: "sometimes".to_string()
                    }
                );
            }
            other => panic!("expected InvalidEndpoint, got {other:?}"),
        }
    }

    #[test]
    fn test_roles_without_required_mode_rejected() {
        let config = with_endpoint(
            "feed",
            EndpointPolicy {
                roles: vec!["reader".to_string()],
                auth_mode: "try".to_string(),
                ..Default::default()
            },
        );

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint {
                source: BuildError::RolesRequireAuthRequired {
                    mode: AuthMode::Try,
                    roles: 1
                },
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = TurtleConfig::default();
        config.telemetry.logging.level = "turtle=notalevel".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "telemetry.logging.level"
        ));
    }

    #[test]
    fn test_empty_values_rejected() {
        let mut config = TurtleConfig::default();
        config.auth.default_scheme = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = TurtleConfig::default();
        config.telemetry.metrics.duration_buckets = Some(Vec::new());
        assert!(config.validate().is_err());

        let mut config = TurtleConfig::default();
        config.telemetry.service_name = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoints_keep_file_order() {
        let config: TurtleConfig = toml::from_str(
            r#"
            [endpoints.zeta]
            auth_mode = "none"

            [endpoints.alpha]
            schemes = ["spiffe", "bearer"]
            "#,
        )
        .unwrap();

        let names: Vec<_> = config.endpoints.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(
            config.endpoint("alpha").unwrap().schemes,
            vec!["spiffe".to_string(), "bearer".to_string()]
        );
    }

    #[test]
    fn test_unknown_top_level_section_rejected() {
        let result = toml::from_str::<TurtleConfig>("[server]\nport = 8080\n");
        assert!(result.is_err());
    }
}
