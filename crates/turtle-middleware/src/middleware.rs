//! Core middleware trait and chain types.
//!
//! Every stage of a composed handler, built-in or caller supplied, is a
//! [`Middleware`]. The chain is assembled once at build time as a linked list
//! of [`Next`] values ending in the target [`Handler`]; serving a request only
//! walks it.
//!
//! # Example
//!
//! ```
//! use turtle_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: &'a Next,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::debug!(request_id = %ctx.request_id(), "request");
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// Middleware receives the mutable per-request context, the request, and the
/// rest of the chain. It either calls [`Next::run`] to continue or returns its
/// own response to short-circuit.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` at most once
/// - A middleware that short-circuits MUST return the terminal response itself
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs and
    /// [`ComposedHandler::stage_names`](crate::bundler::ComposedHandler::stage_names).
    fn name(&self) -> &'static str;

    /// Processes the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: &'a Next,
    ) -> BoxFuture<'a, Response>;
}

/// The business logic at the end of the chain.
///
/// Any `Fn(Request) -> impl Future<Output = Response>` closure is a handler.
/// The credential attached by the authenticate stage is also available in the
/// request extensions, so closures can read it without the context.
/// Implement the trait directly to see the full [`MiddlewareContext`].
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        _ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        Box::pin(self(request))
    }
}

/// The remainder of a middleware chain.
///
/// Built once and shared by every request served by a composed handler.
pub struct Next {
    inner: NextInner,
}

enum NextInner {
    Chain {
        middleware: BoxedMiddleware,
        next: Box<Next>,
    },
    Handler(Arc<dyn Handler>),
}

impl Next {
    /// Creates a link that runs `middleware` before `next`.
    #[must_use]
    pub fn new(middleware: BoxedMiddleware, next: Next) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal link that invokes the handler.
    #[must_use]
    pub fn handler(handler: Arc<dyn Handler>) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Folds `middleware` right-to-left around `handler`.
    ///
    /// The first element of the iterator runs first.
    #[must_use]
    pub fn fold<I>(middleware: I, handler: Arc<dyn Handler>) -> Self
    where
        I: IntoIterator<Item = BoxedMiddleware>,
        I::IntoIter: DoubleEndedIterator,
    {
        middleware
            .into_iter()
            .rev()
            .fold(Self::handler(handler), |next, mw| Self::new(mw, next))
    }

    /// Invokes the next middleware or the handler.
    pub fn run<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
    ) -> BoxFuture<'a, Response> {
        match &self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, next),
            NextInner::Handler(handler) => handler.call(ctx, request),
        }
    }

    /// Returns the middleware names from this link to the handler.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut cursor = self;
        while let NextInner::Chain { middleware, next } = &cursor.inner {
            names.push(middleware.name());
            cursor = next;
        }
        names
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("stages", &self.names()).finish()
    }
}

/// Rejection returned by a [`FnMiddleware`] closure.
#[derive(Debug, Clone)]
pub struct HookError {
    /// Status of the short-circuit response.
    pub status: StatusCode,
    /// Error message
    pub message: String,
}

impl HookError {
    /// Creates a hook error with the given status.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Creates a 400 hook error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 403 hook error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook error: {}", self.message)
    }
}

impl std::error::Error for HookError {}

/// A middleware built from a synchronous check.
///
/// The closure may inspect the request and enrich the context. Returning an
/// error short-circuits with a JSON error response carrying the error status.
///
/// # Example
///
/// ```
/// use turtle_middleware::{FnMiddleware, HookError};
///
/// let require_tenant = FnMiddleware::new("require_tenant", |_ctx, request| {
///     if request.headers().contains_key("x-tenant") {
///         Ok(())
///     } else {
///         Err(HookError::bad_request("x-tenant header is required"))
///     }
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, &Request) -> Result<(), HookError> + Send + Sync + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, &Request) -> Result<(), HookError> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: &'a Next,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Err(err) = (self.func)(ctx, &request) {
                tracing::debug!(
                    hook = self.name,
                    request_id = %ctx.request_id(),
                    status = err.status.as_u16(),
                    error = %err.message,
                    "Hook rejected request"
                );
                return Response::json_error(err.status, "REQUEST_REJECTED", &err.message);
            }
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: &'a Next,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler() -> Arc<dyn Handler> {
        Arc::new(|_req: Request| async {
            http::Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("OK")))
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_handler_only_chain() {
        let next = Next::handler(ok_handler());
        let mut ctx = MiddlewareContext::new();
        let response = next.run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(next.names().is_empty());
    }

    #[tokio::test]
    async fn test_fold_preserves_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages: Vec<BoxedMiddleware> = ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                Arc::new(Recording {
                    name,
                    log: log.clone(),
                }) as BoxedMiddleware
            })
            .collect();

        let next = Next::fold(stages, ok_handler());
        assert_eq!(next.names(), vec!["first", "second", "third"]);

        let mut ctx = MiddlewareContext::new();
        let response = next.run(&mut ctx, request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_chain_is_reusable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let next = Next::new(
            Arc::new(Recording {
                name: "only",
                log: log.clone(),
            }),
            Next::handler(ok_handler()),
        );

        for _ in 0..3 {
            let mut ctx = MiddlewareContext::new();
            next.run(&mut ctx, request()).await;
        }
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fn_middleware_passes_through() {
        struct Seen;

        let mw = FnMiddleware::new("mark", |ctx, _req| {
            ctx.set_extension(Seen);
            Ok(())
        });
        assert_eq!(mw.name(), "mark");

        let next = Next::handler(ok_handler());
        let mut ctx = MiddlewareContext::new();
        let response = mw.process(&mut ctx, request(), &next).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.get_extension::<Seen>().is_some());
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuits() {
        let reached = Arc::new(Mutex::new(false));
        let flag = reached.clone();
        let handler: Arc<dyn Handler> = Arc::new(move |_req: Request| {
            *flag.lock().unwrap() = true;
            async {
                http::Response::builder()
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
        });

        let mw = FnMiddleware::new("deny", |_ctx, _req| Err(HookError::forbidden("nope")));
        let next = Next::handler(handler);
        let mut ctx = MiddlewareContext::new();
        let response = mw.process(&mut ctx, request(), &next).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_hook_error_display() {
        let err = HookError::bad_request("missing header");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Hook error: missing header");
    }
}
