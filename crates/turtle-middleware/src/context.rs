//! Per-request context.
//!
//! A [`MiddlewareContext`] is created by [`ComposedHandler::call`] for every
//! request and threaded mutably through the stage chain. The authenticate
//! stage records the credential here; the authorize stage, hooks and the
//! target handler read it back.
//!
//! [`ComposedHandler::call`]: crate::bundler::ComposedHandler::call

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use turtle_core::{Credential, RequestId};

/// State carried through one invocation of a composed handler.
///
/// # Example
///
/// ```
/// use turtle_core::{CallerIdentity, Credential};
/// use turtle_middleware::MiddlewareContext;
///
/// let mut ctx = MiddlewareContext::new();
/// assert!(!ctx.is_authenticated());
///
/// ctx.set_credential("bearer", CallerIdentity::user("u-1", ["admin"]).into_credential());
/// assert!(ctx.is_authenticated());
/// assert_eq!(ctx.scheme(), Some("bearer"));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    started_at: Instant,
    credential: Option<Credential>,
    scheme: Option<String>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    ///
    /// Useful when the request ID was provided by a client or upstream service.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            credential: None,
            scheme: None,
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the credential attached by the authenticate stage, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Returns the name of the scheme that produced the credential.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Attaches a credential produced by the named scheme.
    pub fn set_credential(&mut self, scheme: impl Into<String>, credential: Credential) {
        self.scheme = Some(scheme.into());
        self.credential = Some(credential);
    }

    /// Returns `true` once a scheme has succeeded for this request.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous value of `T`.
    ///
    /// # Example
    ///
    /// ```
    /// use turtle_middleware::MiddlewareContext;
    ///
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>().map(|t| t.0), Some("acme"));
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_unauthenticated() {
        let ctx = MiddlewareContext::new();
        assert!(ctx.credential().is_none());
        assert!(ctx.scheme().is_none());
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_with_request_id() {
        let id = RequestId::new();
        let ctx = MiddlewareContext::with_request_id(id);
        assert_eq!(ctx.request_id(), id);
    }

    #[test]
    fn test_set_credential_records_scheme() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_credential("spiffe", Credential::new("svc".to_string()));

        assert!(ctx.is_authenticated());
        assert_eq!(ctx.scheme(), Some("spiffe"));
        assert_eq!(
            ctx.credential()
                .and_then(|c| c.downcast_ref::<String>())
                .map(String::as_str),
            Some("svc")
        );
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Attempts(u32);

        let mut ctx = MiddlewareContext::new();
        assert!(ctx.get_extension::<Attempts>().is_none());

        ctx.set_extension(Attempts(1));
        ctx.set_extension(Attempts(2));
        assert_eq!(ctx.get_extension::<Attempts>(), Some(&Attempts(2)));

        assert_eq!(ctx.remove_extension::<Attempts>(), Some(Attempts(2)));
        assert!(ctx.get_extension::<Attempts>().is_none());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = MiddlewareContext::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(ctx.elapsed() >= Duration::from_millis(5));
    }
}
