//! Built-in stages.
//!
//! Every composed handler runs the same three stages, in this order, before
//! any caller-supplied pre hook:
//!
//! 1. [`authenticate`] - try the endpoint's schemes and attach a credential
//! 2. [`authorize`] - require at least one of the endpoint's roles
//! 3. [`allow`] - check the content type of body-bearing requests
//!
//! [`telemetry`] provides a post hook that records request metrics.
//!
//! A stage that refuses a request hands the error to the endpoint's
//! [`ErrorWriter`](crate::error_writer::ErrorWriter) and does not call the
//! rest of the chain.

pub mod allow;
pub mod authenticate;
pub mod authorize;
pub mod telemetry;

pub use allow::AllowStage;
pub use authenticate::AuthenticateStage;
pub use authorize::AuthorizeStage;
pub use telemetry::TelemetryHook;
