//! Wiring configuration into a [`Bundler`].

use thiserror::Error;
use turtle_config::{ConfigError, TurtleConfig};
use turtle_core::BuildError;
use turtle_middleware::{Bundler, ComposedHandler, Handler, JsonErrorWriter, Options, TelemetryHook};
use turtle_telemetry::TelemetryError;

/// Errors raised while bringing up configured endpoints.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics failed to initialize.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The configuration names no such endpoint.
    #[error("endpoint not configured: {name}")]
    UnknownEndpoint {
        /// The requested endpoint name.
        name: String,
    },

    /// An endpoint or the default scheme failed to build.
    #[error("failed to build {endpoint}: {source}")]
    Build {
        /// Endpoint name, or `auth.default_scheme`.
        endpoint: String,
        /// Underlying build error.
        #[source]
        source: BuildError,
    },
}

/// Initializes logging and metrics from the telemetry section.
///
/// # Errors
///
/// Returns [`SetupError::Telemetry`] if a global subscriber or recorder is
/// already installed, or the log filter is invalid.
pub fn init_telemetry(config: &TurtleConfig) -> Result<(), SetupError> {
    turtle_telemetry::init_telemetry(&config.telemetry.to_telemetry_config())?;
    Ok(())
}

/// Applies the `auth` section to a bundler whose schemes are registered.
///
/// Installs a [`JsonErrorWriter`] honoring `expose_internal_errors` and sets
/// the default scheme, if one is configured.
///
/// # Errors
///
/// Returns [`SetupError::Build`] if the default scheme is not registered.
pub fn configure(bundler: Bundler, config: &TurtleConfig) -> Result<Bundler, SetupError> {
    let mut bundler = bundler.with_error_writer(
        JsonErrorWriter::new().expose_internal_errors(config.auth.expose_internal_errors),
    );

    if let Some(name) = &config.auth.default_scheme {
        bundler
            .set_default_scheme(name.clone())
            .map_err(|source| SetupError::Build {
                endpoint: "auth.default_scheme".to_string(),
                source,
            })?;
    }

    tracing::debug!(
        schemes = ?bundler.registry().names(),
        default_scheme = ?config.auth.default_scheme,
        "Bundler configured"
    );
    Ok(bundler)
}

/// Returns options for the configured endpoint `name`.
///
/// The options carry the endpoint's policy and a [`TelemetryHook`]; callers
/// can add hooks before passing them to [`Bundler::build`].
///
/// # Errors
///
/// Returns [`SetupError::UnknownEndpoint`] if `name` is not configured and
/// [`SetupError::Build`] if its auth mode is invalid.
pub fn endpoint_options(
    config: &TurtleConfig,
    name: &str,
    handler: impl Handler,
) -> Result<Options, SetupError> {
    let policy = config
        .endpoint(name)
        .ok_or_else(|| SetupError::UnknownEndpoint {
            name: name.to_string(),
        })?;

    let options = Options::from_policy(policy, handler).map_err(|source| SetupError::Build {
        endpoint: name.to_string(),
        source,
    })?;

    Ok(options.name(name).after_hook(TelemetryHook::new(name)))
}

/// Builds the configured endpoint `name` around `handler`.
///
/// # Errors
///
/// Everything [`endpoint_options`] rejects, plus build failures such as an
/// unregistered scheme.
pub fn build_endpoint(
    bundler: &Bundler,
    config: &TurtleConfig,
    name: &str,
    handler: impl Handler,
) -> Result<ComposedHandler, SetupError> {
    let options = endpoint_options(config, name, handler)?;
    bundler.build(options).map_err(|source| SetupError::Build {
        endpoint: name.to_string(),
        source,
    })
}
