//! Chain builder.
//!
//! A [`Bundler`] owns the scheme registry and turns [`Options`] into a
//! [`ComposedHandler`]:
//!
//! ```text
//! Request → authenticate → authorize → allow → before hooks → handler
//!                                                                ↓
//!                                   after hooks (observe only) ←─┘
//! ```
//!
//! All validation happens in [`Bundler::build`]. A build error means the
//! endpoint's security configuration is wrong; the caller must not start
//! serving with it.

use crate::context::MiddlewareContext;
use crate::error_writer::{BoxedErrorWriter, ErrorWriter, JsonErrorWriter};
use crate::hooks::AfterNext;
use crate::middleware::{BoxedMiddleware, Handler, Next};
use crate::options::Options;
use crate::scheme::{Scheme, SchemeRegistry};
use crate::stages::{AllowStage, AuthenticateStage, AuthorizeStage};
use crate::types::{Request, Response};
use std::fmt;
use std::sync::Arc;
use turtle_core::{validate_roles, BuildResult, EndpointPolicy, RequestId};
use turtle_telemetry::InFlightGuard;

/// Header used to propagate a caller-supplied request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Builds composed handlers against a registry of schemes.
///
/// Registering schemes takes `&mut self`; building takes `&self` and captures
/// a snapshot of the registry, so handlers built earlier never observe later
/// registrations.
///
/// # Example
///
/// ```
/// use turtle_core::{AuthError, CallerIdentity};
/// use turtle_middleware::schemes::BearerScheme;
/// use turtle_middleware::{Bundler, Options, Request, Response, ResponseExt};
///
/// let mut bundler = Bundler::new();
/// bundler.register_scheme(
///     "bearer",
///     BearerScheme::new(|token| match token {
///         "s3cret" => Ok(CallerIdentity::user("alice", ["admin"]).into_credential()),
///         _ => Err(AuthError::invalid("unknown token")),
///     }),
/// );
/// bundler.set_default_scheme("bearer").unwrap();
///
/// let handler = bundler
///     .build(Options::new(|_req: Request| async {
///         Response::json(http::StatusCode::OK, "{}".to_string())
///     }).roles(["admin"]))
///     .unwrap();
///
/// assert_eq!(handler.stage_names(), vec!["authenticate", "authorize", "allow"]);
/// ```
pub struct Bundler {
    registry: Arc<SchemeRegistry>,
    error_writer: BoxedErrorWriter,
}

impl Bundler {
    /// Creates a bundler with an empty registry and a [`JsonErrorWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(SchemeRegistry::new()),
            error_writer: Arc::new(JsonErrorWriter::new()),
        }
    }

    /// Sets the error writer used by endpoints that do not override it.
    #[must_use]
    pub fn with_error_writer(mut self, writer: impl ErrorWriter) -> Self {
        self.error_writer = Arc::new(writer);
        self
    }

    /// Registers `scheme` under `name`, replacing any previous entry.
    pub fn register_scheme(&mut self, name: impl Into<String>, scheme: impl Scheme) {
        Arc::make_mut(&mut self.registry).register(name, Arc::new(scheme));
    }

    /// Makes `name` the scheme used by endpoints that list none.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnregisteredScheme`](turtle_core::BuildError::UnregisteredScheme)
    /// if `name` is not registered.
    pub fn set_default_scheme(&mut self, name: impl Into<String>) -> BuildResult<()> {
        Arc::make_mut(&mut self.registry).set_default(name)
    }

    /// Returns the current registry.
    #[must_use]
    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Validates `options` and composes the handler.
    ///
    /// # Errors
    ///
    /// - [`BuildError::RolesRequireAuthRequired`] if roles are set and the
    ///   auth mode is not `required`
    /// - [`BuildError::UnregisteredScheme`] if a listed scheme is unknown
    ///
    /// Build errors are fatal: do not serve traffic with a configuration
    /// that fails here.
    ///
    /// [`BuildError::RolesRequireAuthRequired`]: turtle_core::BuildError::RolesRequireAuthRequired
    /// [`BuildError::UnregisteredScheme`]: turtle_core::BuildError::UnregisteredScheme
    pub fn build(&self, options: Options) -> BuildResult<ComposedHandler> {
        let endpoint = options.name.clone();
        self.assemble(options).map_err(|err| {
            tracing::error!(
                endpoint = endpoint.as_deref().unwrap_or("-"),
                error = %err,
                "Invalid endpoint configuration"
            );
            err
        })
    }

    /// Like [`build`](Self::build) but panics on a configuration error.
    ///
    /// # Panics
    ///
    /// Panics with the build error's message.
    #[must_use]
    pub fn must_build(&self, options: Options) -> ComposedHandler {
        match self.build(options) {
            Ok(handler) => handler,
            Err(err) => panic!("{err}"),
        }
    }

    /// Composes a handler from a declarative policy.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) rejects, plus
    /// [`BuildError::InvalidAuthMode`](turtle_core::BuildError::InvalidAuthMode).
    pub fn build_policy(
        &self,
        name: &str,
        policy: &EndpointPolicy,
        handler: impl Handler,
    ) -> BuildResult<ComposedHandler> {
        let options = Options::from_policy(policy, handler).map_err(|err| {
            tracing::error!(endpoint = name, error = %err, "Invalid endpoint configuration");
            err
        })?;
        self.build(options.name(name))
    }

    fn assemble(&self, options: Options) -> BuildResult<ComposedHandler> {
        validate_roles(options.auth_mode, &options.roles)?;
        let schemes = self.registry.resolve(&options.schemes)?;

        let writer = options
            .error_writer
            .unwrap_or_else(|| Arc::clone(&self.error_writer));

        let stages: Vec<BoxedMiddleware> = vec![
            Arc::new(AuthenticateStage::new(
                options.auth_mode,
                schemes.clone(),
                Arc::clone(&self.registry),
                Arc::clone(&writer),
            )),
            Arc::new(AuthorizeStage::new(options.roles, Arc::clone(&writer))),
            Arc::new(AllowStage::new(options.allow, writer)),
        ];

        let main = Next::fold(stages.into_iter().chain(options.before), options.handler);
        let after = AfterNext::fold(options.after);

        tracing::info!(
            endpoint = options.name.as_deref().unwrap_or("-"),
            mode = %options.auth_mode,
            schemes = ?schemes,
            stages = ?main.names(),
            post_hooks = ?after.names(),
            "Built handler"
        );

        Ok(ComposedHandler {
            inner: Arc::new(Inner {
                name: options.name,
                main,
                after,
            }),
        })
    }
}

impl Default for Bundler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundler")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A validated, immutable handler.
///
/// Cloning is cheap and clones share the same chain, so one handler can
/// serve any number of concurrent requests.
#[derive(Clone)]
pub struct ComposedHandler {
    inner: Arc<Inner>,
}

struct Inner {
    name: Option<String>,
    main: Next,
    after: AfterNext,
}

impl ComposedHandler {
    /// Serves one request.
    ///
    /// A valid UUID in the `x-request-id` header becomes the request ID;
    /// otherwise a fresh one is generated.
    pub async fn call(&self, request: Request) -> Response {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();
        self.call_with_context(MiddlewareContext::with_request_id(request_id), request)
            .await
    }

    /// Serves one request with a caller-prepared context.
    ///
    /// The main chain runs first; the post hooks then run exactly once with
    /// its response, whether the handler produced it or a stage refused the
    /// request. The response is returned unchanged.
    pub async fn call_with_context(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
    ) -> Response {
        let _in_flight = InFlightGuard::new();
        let response = self.inner.main.run(&mut ctx, request).await;
        self.inner.after.run(&ctx, &response).await;
        response
    }

    /// Returns the endpoint name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Returns the pre-handler stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.inner.main.names()
    }

    /// Returns the post hook names in execution order.
    #[must_use]
    pub fn post_hook_names(&self) -> Vec<&'static str> {
        self.inner.after.names()
    }
}

impl fmt::Debug for ComposedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedHandler")
            .field("name", &self.inner.name)
            .field("stages", &self.stage_names())
            .field("post_hooks", &self.post_hook_names())
            .finish()
    }
}
