//! # Turtle Core
//!
//! Core types for the Turtle request-interceptor composer.
//!
//! - [`AuthMode`] - How authentication failures are treated
//! - [`Credential`] / [`Roler`] - What a successful scheme attaches to a request
//! - [`CallerIdentity`] - Ready-made role-capable credential
//! - [`EndpointPolicy`] - Declarative per-endpoint policy
//! - [`BuildError`] / [`ServeError`] - Build-time and per-request failures
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/turtle-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credential;
mod error;
mod identity;
mod mode;
mod policy;
mod request_id;

pub use credential::{Credential, Roler};
pub use error::{
    AuthError, BuildError, BuildResult, ErrorCategory, ErrorDetail, ErrorEnvelope, ServeError,
};
pub use identity::{ApiKeyIdentity, CallerIdentity, SpiffeIdentity, UserIdentity};
pub use mode::AuthMode;
pub use policy::{validate_roles, EndpointPolicy};
pub use request_id::RequestId;
