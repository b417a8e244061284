//! Layered configuration loading.
//!
//! Layers apply in order, later ones winning:
//! 1. built-in defaults or a preset
//! 2. a TOML or JSON file (or string)
//! 3. environment variables under a prefix

use std::env;
use std::fs;
use std::path::Path;

use turtle_core::EndpointPolicy;

use crate::{ConfigError, LogFormat, TurtleConfig};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use turtle_config::ConfigLoader;
///
/// # fn main() -> Result<(), turtle_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_file("turtle.toml")?
///     .with_env_prefix("TURTLE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: TurtleConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TurtleConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = TurtleConfig::default();
        self
    }

    /// Starts from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use turtle_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = TurtleConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = TurtleConfig::production();
        self
    }

    /// Loads a configuration file, choosing the format by extension.
    ///
    /// The file replaces the current layer; sections it omits take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, has an
    /// unsupported extension, or fails to parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Loads a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Same as [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `toml` or `json` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown format or a parse failure.
    ///
    /// # Example
    ///
    /// ```
    /// use turtle_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(r#"{"auth": {"default_scheme": "bearer"}}"#, "json")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.auth.default_scheme.as_deref(), Some("bearer"));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Sets the environment variable prefix.
    ///
    /// Variables use the form `PREFIX__SECTION__KEY`, e.g.
    /// `TURTLE__AUTH__DEFAULT_SCHEME=bearer` or
    /// `TURTLE__ENDPOINTS__ORDERS__ROLES=admin,ops`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory or its parents, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(err) if err.not_found() => Ok(self),
            Err(err) => Err(ConfigError::validation_error(format!(
                "failed to load .env: {err}"
            ))),
        }
    }

    /// Loads environment variables from a specific dotenv file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or cannot be parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        dotenvy::from_path(path).map_err(|err| {
            ConfigError::validation_error(format!("failed to load {}: {err}", path.display()))
        })?;
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or the final
    /// configuration is invalid.
    pub fn load(mut self) -> Result<TurtleConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current layer without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> TurtleConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<TurtleConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(&marker))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = rest.split("__").collect();
        let bool_value = || {
            parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
        };

        match parts.as_slice() {
            ["TELEMETRY", "SERVICE_NAME"] => {
                self.config.telemetry.service_name = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                self.config.telemetry.logging.enabled = bool_value()?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                self.config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                self.config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                self.config.telemetry.logging.include_location = bool_value()?;
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                self.config.telemetry.metrics.enabled = bool_value()?;
            }
            ["TELEMETRY", "METRICS", "DURATION_BUCKETS"] => {
                let buckets = split_list(value)
                    .into_iter()
                    .map(|b| b.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| {
                        ConfigError::env_parse_error(key, "expected comma-separated numbers")
                    })?;
                self.config.telemetry.metrics.duration_buckets = Some(buckets);
            }

            ["AUTH", "DEFAULT_SCHEME"] => {
                self.config.auth.default_scheme = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["AUTH", "EXPOSE_INTERNAL_ERRORS"] => {
                self.config.auth.expose_internal_errors = bool_value()?;
            }

            ["ENDPOINTS", name, field] => {
                let policy = self.endpoint_mut(name);
                match *field {
                    "AUTH_MODE" => policy.auth_mode = value.to_string(),
                    "ALLOW" => policy.allow = split_list(value),
                    "ROLES" => policy.roles = split_list(value),
                    "SCHEMES" => policy.schemes = split_list(value),
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected AUTH_MODE, ALLOW, ROLES or SCHEMES",
                        ))
                    }
                }
            }

            _ => {}
        }

        Ok(())
    }

    // Env keys are upper case; match existing endpoints case-insensitively.
    fn endpoint_mut(&mut self, env_name: &str) -> &mut EndpointPolicy {
        let name = self
            .config
            .endpoints
            .keys()
            .find(|existing| existing.eq_ignore_ascii_case(env_name))
            .cloned()
            .unwrap_or_else(|| env_name.to_lowercase());

        self.config.endpoints.entry(name).or_default()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
