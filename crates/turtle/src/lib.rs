//! # Turtle
//!
//! **Declarative authentication, authorization and content-type checks for
//! HTTP handlers.**
//!
//! Each endpoint declares which authentication schemes to try, which roles
//! grant access and which content types it accepts. Turtle validates that
//! declaration once, at build time, and wraps the handler in a fixed chain:
//!
//! ```text
//! Request → authenticate → authorize → allow → before hooks → handler
//!                                                                ↓
//!                                   after hooks (observe only) ←─┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use turtle::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_file("turtle.toml")?
//!         .with_env_prefix("TURTLE")
//!         .load()?;
//!     turtle::init_telemetry(&config)?;
//!
//!     let mut bundler = Bundler::new();
//!     bundler.register_scheme("bearer", BearerScheme::new(verify_token));
//!     let bundler = turtle::configure(bundler, &config)?;
//!
//!     let create_order = turtle::build_endpoint(&bundler, &config, "create_order", create_order)?;
//!     // hand `create_order.call(request)` to your server
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/turtle/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod setup;

pub use setup::{build_endpoint, configure, endpoint_options, init_telemetry, SetupError};

pub use turtle_config as config;
pub use turtle_core as core;
pub use turtle_middleware as middleware;
pub use turtle_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use turtle::prelude::*;
/// ```
pub mod prelude {
    pub use turtle_config::{ConfigLoader, TurtleConfig};
    pub use turtle_core::{
        AuthError, AuthMode, BuildError, CallerIdentity, Credential, EndpointPolicy, RequestId,
        Roler,
    };
    pub use turtle_middleware::schemes::{ApiKeyScheme, BearerScheme, SpiffeScheme};
    pub use turtle_middleware::{
        Bundler, ComposedHandler, FnMiddleware, FnPostHook, FnScheme, HookError,
        MiddlewareContext, Options, Request, Response, ResponseExt, Scheme,
    };

    pub use crate::SetupError;
}
