//! Typed configuration for Turtle.
//!
//! Describes endpoint security policies and telemetry settings in TOML or
//! JSON, with environment variable overrides. Unknown fields are rejected
//! so that a typo in a policy never silently weakens it.
//!
//! # Example
//!
//! ```no_run
//! use turtle_config::ConfigLoader;
//!
//! # fn main() -> Result<(), turtle_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_file("turtle.toml")?
//!     .with_env_prefix("TURTLE")
//!     .load()?;
//!
//! for (name, policy) in &config.endpoints {
//!     println!("{name}: {} via {:?}", policy.auth_mode, policy.schemes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [telemetry]
//! service_name = "orders"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//!
//! [auth]
//! default_scheme = "bearer"
//!
//! [endpoints.create_order]
//! allow = ["application/json"]
//! roles = ["writer", "admin"]
//! schemes = ["spiffe", "bearer"]
//!
//! [endpoints.health]
//! auth_mode = "none"
//! ```
//!
//! # Environment Overrides
//!
//! Variables take the form `PREFIX__SECTION__KEY`:
//!
//! - `TURTLE__TELEMETRY__LOGGING__LEVEL=debug`
//! - `TURTLE__AUTH__DEFAULT_SCHEME=bearer`
//! - `TURTLE__ENDPOINTS__CREATE_ORDER__ROLES=writer,admin`
//!
//! List values are comma separated. Endpoint names match existing entries
//! case-insensitively; new ones are created in lower case.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::TurtleConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AuthConfig, LogFormat, LoggingConfig, MetricsSection, TelemetryConfigSection};
