//! Per-endpoint options.

use crate::error_writer::{BoxedErrorWriter, ErrorWriter};
use crate::hooks::{BoxedPostHook, PostHook};
use crate::middleware::{BoxedMiddleware, Handler, Middleware};
use std::fmt;
use std::sync::Arc;
use turtle_core::{AuthMode, BuildResult, EndpointPolicy};

/// Everything [`Bundler::build`](crate::bundler::Bundler::build) needs to
/// compose one endpoint.
///
/// Defaults: authentication required, no roles, no schemes (the bundler's
/// default scheme is substituted), empty allow list, no hooks.
///
/// # Example
///
/// ```
/// use turtle_core::AuthMode;
/// use turtle_middleware::{Options, Request, Response, ResponseExt};
///
/// let options = Options::new(|_req: Request| async {
///     Response::json(http::StatusCode::OK, "{}".to_string())
/// })
/// .name("list_orders")
/// .schemes(["bearer"])
/// .roles(["reader", "admin"])
/// .allow(["application/json"])
/// .auth_mode(AuthMode::Required);
/// ```
pub struct Options {
    pub(crate) name: Option<String>,
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) allow: Vec<String>,
    pub(crate) roles: Vec<String>,
    pub(crate) schemes: Vec<String>,
    pub(crate) auth_mode: AuthMode,
    pub(crate) before: Vec<BoxedMiddleware>,
    pub(crate) after: Vec<BoxedPostHook>,
    pub(crate) error_writer: Option<BoxedErrorWriter>,
}

impl Options {
    /// Creates options for `handler` with the defaults.
    pub fn new(handler: impl Handler) -> Self {
        Self {
            name: None,
            handler: Arc::new(handler),
            allow: Vec::new(),
            roles: Vec::new(),
            schemes: Vec::new(),
            auth_mode: AuthMode::Required,
            before: Vec::new(),
            after: Vec::new(),
            error_writer: None,
        }
    }

    /// Creates options from a declarative policy.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidAuthMode`](turtle_core::BuildError::InvalidAuthMode)
    /// if the policy's auth mode text is not recognized.
    pub fn from_policy(policy: &EndpointPolicy, handler: impl Handler) -> BuildResult<Self> {
        let auth_mode = policy.auth_mode()?;
        Ok(Self::new(handler)
            .allow(policy.allow.iter().cloned())
            .roles(policy.roles.iter().cloned())
            .schemes(policy.schemes.iter().cloned())
            .auth_mode(auth_mode))
    }

    /// Names the endpoint for logs and metrics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the accepted content types.
    #[must_use]
    pub fn allow<I, S>(mut self, allow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = allow.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the roles of which the caller must hold at least one.
    #[must_use]
    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the schemes to try, in order.
    #[must_use]
    pub fn schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the authentication mode.
    #[must_use]
    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Appends pre hooks; they run after the built-in stages, in order.
    #[must_use]
    pub fn before(mut self, hooks: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        self.before.extend(hooks);
        self
    }

    /// Appends a single pre hook.
    #[must_use]
    pub fn before_hook(mut self, hook: impl Middleware) -> Self {
        self.before.push(Arc::new(hook));
        self
    }

    /// Appends post hooks; they run after the response is produced, in order.
    #[must_use]
    pub fn after(mut self, hooks: impl IntoIterator<Item = BoxedPostHook>) -> Self {
        self.after.extend(hooks);
        self
    }

    /// Appends a single post hook.
    #[must_use]
    pub fn after_hook(mut self, hook: impl PostHook) -> Self {
        self.after.push(Arc::new(hook));
        self
    }

    /// Overrides the bundler's error writer for this endpoint.
    #[must_use]
    pub fn error_writer(mut self, writer: impl ErrorWriter) -> Self {
        self.error_writer = Some(Arc::new(writer));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("name", &self.name)
            .field("allow", &self.allow)
            .field("roles", &self.roles)
            .field("schemes", &self.schemes)
            .field("auth_mode", &self.auth_mode)
            .field(
                "before",
                &self.before.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field(
                "after",
                &self.after.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Request, Response, ResponseExt};
    use http::StatusCode;
    use turtle_core::BuildError;

    async fn ok(_req: Request) -> Response {
        Response::error(StatusCode::OK, "ok")
    }

    #[test]
    fn test_defaults() {
        let options = Options::new(ok);
        assert_eq!(options.auth_mode, AuthMode::Required);
        assert!(options.allow.is_empty());
        assert!(options.roles.is_empty());
        assert!(options.schemes.is_empty());
        assert!(options.before.is_empty());
        assert!(options.after.is_empty());
        assert!(options.error_writer.is_none());
    }

    #[test]
    fn test_from_policy() {
        let policy = EndpointPolicy {
            allow: vec!["application/json".to_string()],
            roles: vec!["admin".to_string()],
            schemes: vec!["bearer".to_string()],
            auth_mode: "required".to_string(),
        };
        let options = Options::from_policy(&policy, ok).unwrap();
        assert_eq!(options.allow, policy.allow);
        assert_eq!(options.roles, policy.roles);
        assert_eq!(options.schemes, policy.schemes);
    }

    #[test]
    fn test_from_policy_rejects_bad_mode() {
        let policy = EndpointPolicy {
            auth_mode: "sometimes".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Options::from_policy(&policy, ok),
            Err(BuildError::InvalidAuthMode { mode }) if mode == "sometimes"
        ));
    }

    #[test]
    fn test_debug_lists_fields() {
        let debug = format!("{:?}", Options::new(ok).name("orders").roles(["admin"]));
        assert!(debug.contains("orders"));
        assert!(debug.contains("admin"));
    }
}
