//! Authentication stage.
//!
//! | Mode | Behavior |
//! |------|----------|
//! | `none` | no scheme is consulted |
//! | `try` | schemes are tried in order; failures are ignored |
//! | `required` | schemes are tried in order; if the last one fails the request is refused with 401 |
//!
//! The first scheme to succeed wins: its credential is attached to the
//! context (and to the request extensions, for closure handlers) and no
//! further scheme is tried.

use crate::{
    context::MiddlewareContext,
    error_writer::{write_error, BoxedErrorWriter},
    middleware::{BoxFuture, Middleware, Next},
    scheme::SchemeRegistry,
    types::{Request, Response},
};
use std::sync::Arc;
use turtle_core::{AuthError, AuthMode, ServeError};

/// Tries an endpoint's schemes in order.
pub struct AuthenticateStage {
    mode: AuthMode,
    schemes: Vec<String>,
    registry: Arc<SchemeRegistry>,
    writer: BoxedErrorWriter,
}

impl AuthenticateStage {
    /// Creates the stage over a registry snapshot.
    #[must_use]
    pub fn new(
        mode: AuthMode,
        schemes: Vec<String>,
        registry: Arc<SchemeRegistry>,
        writer: BoxedErrorWriter,
    ) -> Self {
        Self {
            mode,
            schemes,
            registry,
            writer,
        }
    }

    /// Returns the scheme names tried, in order.
    #[must_use]
    pub fn schemes(&self) -> &[String] {
        &self.schemes
    }

    fn refuse(&self, ctx: &MiddlewareContext, request: &Request, error: ServeError) -> Response {
        write_error(self.writer.as_ref(), ctx, request, &error)
    }
}

impl Middleware for AuthenticateStage {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: &'a Next,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if self.mode == AuthMode::None {
                return next.run(ctx, request).await;
            }

            let last = self.schemes.len().saturating_sub(1);
            for (index, name) in self.schemes.iter().enumerate() {
                let Some(scheme) = self.registry.get(name) else {
                    let error = ServeError::SchemeNotRegistered { name: name.clone() };
                    return self.refuse(ctx, &request, error);
                };

                let outcome = scheme.authenticate(&request).await;
                match outcome {
                    Ok(credential) => {
                        tracing::debug!(
                            request_id = %ctx.request_id(),
                            scheme = %name,
                            credential = credential.type_name(),
                            "Authenticated"
                        );
                        request.extensions_mut().insert(credential.clone());
                        ctx.set_credential(name.as_str(), credential);
                        break;
                    }
                    Err(err) => {
                        tracing::debug!(
                            request_id = %ctx.request_id(),
                            scheme = %name,
                            mode = %self.mode,
                            error = %err,
                            "Authentication attempt failed"
                        );
                        if self.mode.is_required() && index == last {
                            turtle_telemetry::record_auth_failure(name);
                            return self.refuse(ctx, &request, ServeError::Unauthenticated(err));
                        }
                    }
                }
            }

            if self.mode.is_required() && !ctx.is_authenticated() {
                let error = ServeError::Unauthenticated(AuthError::missing(
                    "no authentication scheme configured",
                ));
                return self.refuse(ctx, &request, error);
            }

            next.run(ctx, request).await
        })
    }
}
