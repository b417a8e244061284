//! Authentication schemes and the scheme registry.
//!
//! A [`Scheme`] turns a request into a [`Credential`] or an [`AuthError`].
//! Schemes are registered by name; endpoints refer to them by that name.

use crate::middleware::BoxFuture;
use crate::types::Request;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use turtle_core::{AuthError, BuildError, BuildResult, Credential};

/// A shared, type-erased scheme.
pub type BoxedScheme = Arc<dyn Scheme>;

/// An authentication method.
///
/// # Example
///
/// ```
/// use turtle_core::{AuthError, Credential};
/// use turtle_middleware::{BoxFuture, Request, Scheme};
///
/// struct InternalNetwork;
///
/// impl Scheme for InternalNetwork {
///     fn authenticate<'a>(
///         &'a self,
///         request: &'a Request,
///     ) -> BoxFuture<'a, Result<Credential, AuthError>> {
///         Box::pin(async move {
///             match request.headers().get("x-internal") {
///                 Some(_) => Ok(Credential::new("internal")),
///                 None => Err(AuthError::missing("x-internal header")),
///             }
///         })
///     }
/// }
/// ```
pub trait Scheme: Send + Sync + 'static {
    /// Verifies the request's credentials.
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Credential, AuthError>>;
}

/// A scheme built from a synchronous closure.
pub struct FnScheme<F> {
    func: F,
}

impl<F> FnScheme<F>
where
    F: Fn(&Request) -> Result<Credential, AuthError> + Send + Sync + 'static,
{
    /// Creates a new function-based scheme.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Scheme for FnScheme<F>
where
    F: Fn(&Request) -> Result<Credential, AuthError> + Send + Sync + 'static,
{
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Credential, AuthError>> {
        let result = (self.func)(request);
        Box::pin(async move { result })
    }
}

/// Named schemes plus an optional default.
///
/// Registering a name twice replaces the earlier scheme.
#[derive(Clone, Default)]
pub struct SchemeRegistry {
    schemes: HashMap<String, BoxedScheme>,
    default_scheme: Option<String>,
}

impl SchemeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `scheme` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, scheme: BoxedScheme) {
        let name = name.into();
        if self.schemes.insert(name.clone(), scheme).is_some() {
            tracing::debug!(scheme = %name, "Replaced registered scheme");
        } else {
            tracing::debug!(scheme = %name, "Registered scheme");
        }
    }

    /// Returns the scheme registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxedScheme> {
        self.schemes.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemes.contains_key(name)
    }

    /// Makes `name` the scheme used by endpoints that list none.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnregisteredScheme`] if `name` is not registered.
    pub fn set_default(&mut self, name: impl Into<String>) -> BuildResult<()> {
        let name = name.into();
        if !self.contains(&name) {
            return Err(BuildError::UnregisteredScheme { name });
        }
        self.default_scheme = Some(name);
        Ok(())
    }

    /// Returns the default scheme name, if set.
    #[must_use]
    pub fn default_scheme(&self) -> Option<&str> {
        self.default_scheme.as_deref()
    }

    /// Returns the registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves an endpoint's scheme list.
    ///
    /// An empty list becomes the default scheme alone, when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnregisteredScheme`] for the first unknown name.
    pub fn resolve(&self, schemes: &[String]) -> BuildResult<Vec<String>> {
        if let Some(name) = schemes.iter().find(|name| !self.contains(name)) {
            return Err(BuildError::unregistered_scheme(name.as_str()));
        }

        match (schemes.is_empty(), &self.default_scheme) {
            (true, Some(default)) => Ok(vec![default.clone()]),
            _ => Ok(schemes.to_vec()),
        }
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("schemes", &self.names())
            .field("default_scheme", &self.default_scheme)
            .finish()
    }
}
