//! Error reporting.
//!
//! Built-in stages never build error responses themselves. They hand a
//! [`ServeError`] to the endpoint's [`ErrorWriter`], and whatever it returns
//! is the terminal response for the request.
//!
//! The default [`JsonErrorWriter`] renders the standard envelope:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "FORBIDDEN",
//!     "message": "missing required roles: admin",
//!     "category": "forbidden",
//!     "request_id": "0190b0c4-..."
//!   }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response, ResponseExt};
use std::sync::Arc;
use turtle_core::{ErrorCategory, ServeError};

/// A shared, type-erased error writer.
pub type BoxedErrorWriter = Arc<dyn ErrorWriter>;

/// Renders the terminal response for a refused request.
///
/// Each method corresponds to one [`ErrorCategory`].
pub trait ErrorWriter: Send + Sync + 'static {
    /// Authentication was required and did not succeed.
    fn unauthorized(
        &self,
        ctx: &MiddlewareContext,
        request: &Request,
        error: &ServeError,
    ) -> Response;

    /// The caller lacks every required role.
    fn forbidden(&self, ctx: &MiddlewareContext, request: &Request, error: &ServeError) -> Response;

    /// The request content type is not accepted.
    fn bad_request(
        &self,
        ctx: &MiddlewareContext,
        request: &Request,
        error: &ServeError,
    ) -> Response;

    /// The endpoint is inconsistently configured.
    fn server_error(
        &self,
        ctx: &MiddlewareContext,
        request: &Request,
        error: &ServeError,
    ) -> Response;
}

/// Logs `error` and dispatches it to the writer method for its category.
pub(crate) fn write_error(
    writer: &dyn ErrorWriter,
    ctx: &MiddlewareContext,
    request: &Request,
    error: &ServeError,
) -> Response {
    let category = error.category();
    turtle_telemetry::record_rejection(category.code());
    match category {
        ErrorCategory::ServerError => tracing::error!(
            request_id = %ctx.request_id(),
            method = %request.method(),
            path = %request.uri().path(),
            error = %error,
            "Request refused"
        ),
        _ => tracing::debug!(
            request_id = %ctx.request_id(),
            method = %request.method(),
            path = %request.uri().path(),
            category = category.code(),
            error = %error,
            "Request refused"
        ),
    }

    match category {
        ErrorCategory::Unauthorized => writer.unauthorized(ctx, request, error),
        ErrorCategory::Forbidden => writer.forbidden(ctx, request, error),
        ErrorCategory::BadRequest => writer.bad_request(ctx, request, error),
        ErrorCategory::ServerError => writer.server_error(ctx, request, error),
    }
}

/// Writes errors as JSON envelopes.
#[derive(Debug, Clone, Default)]
pub struct JsonErrorWriter {
    expose_internal_errors: bool,
}

impl JsonErrorWriter {
    /// Creates a writer that hides server error details.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether server error messages are sent to clients.
    ///
    /// **Warning**: Only enable this in development environments.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    fn render(&self, ctx: &MiddlewareContext, error: &ServeError) -> Response {
        let request_id = ctx.request_id().to_string();
        let envelope = error.to_envelope(Some(&request_id), self.expose_internal_errors);
        match serde_json::to_string(&envelope) {
            Ok(body) => Response::json(error.status_code(), body),
            Err(_) => Response::json_error(
                error.status_code(),
                error.category().code(),
                error.category().code(),
            ),
        }
    }
}

impl ErrorWriter for JsonErrorWriter {
    fn unauthorized(
        &self,
        ctx: &MiddlewareContext,
        _request: &Request,
        error: &ServeError,
    ) -> Response {
        self.render(ctx, error)
    }

    fn forbidden(
        &self,
        ctx: &MiddlewareContext,
        _request: &Request,
        error: &ServeError,
    ) -> Response {
        self.render(ctx, error)
    }

    fn bad_request(
        &self,
        ctx: &MiddlewareContext,
        _request: &Request,
        error: &ServeError,
    ) -> Response {
        self.render(ctx, error)
    }

    fn server_error(
        &self,
        ctx: &MiddlewareContext,
        _request: &Request,
        error: &ServeError,
    ) -> Response {
        self.render(ctx, error)
    }
}
