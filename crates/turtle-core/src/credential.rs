//! Authenticated credentials.
//!
//! A [`Credential`] is whatever a scheme produced on success. The core never
//! looks inside it except through the optional [`Roler`] capability used by
//! the authorize stage. Handlers recover their concrete type with
//! [`Credential::downcast_ref`].

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Role-membership capability of a credential.
pub trait Roler: Send + Sync {
    /// Returns `true` if the credential holds `role`.
    fn has_role(&self, role: &str) -> bool;
}

/// Type-erased credential attached to a request after authentication.
///
/// Cloning is cheap; the value is shared.
///
/// # Example
///
/// ```
/// use turtle_core::{Credential, Roler};
///
/// struct Admin;
///
/// impl Roler for Admin {
///     fn has_role(&self, role: &str) -> bool {
///         role == "admin"
///     }
/// }
///
/// let credential = Credential::with_roles(Admin);
/// assert!(credential.roler().unwrap().has_role("admin"));
/// assert!(credential.downcast_ref::<Admin>().is_some());
///
/// let opaque = Credential::new(42_u64);
/// assert!(opaque.roler().is_none());
/// ```
#[derive(Clone)]
pub struct Credential {
    value: Arc<dyn Any + Send + Sync>,
    roler: Option<Arc<dyn Roler>>,
    type_name: &'static str,
}

impl Credential {
    /// Wraps an opaque credential value without role capability.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            roler: None,
            type_name: type_name::<T>(),
        }
    }

    /// Wraps a credential value that can answer role-membership checks.
    #[must_use]
    pub fn with_roles<T: Roler + 'static>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            value: value.clone(),
            roler: Some(value),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the role-membership capability, if the value has one.
    #[must_use]
    pub fn roler(&self) -> Option<&dyn Roler> {
        self.roler.as_deref()
    }

    /// Returns the wrapped value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Returns the type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("type", &self.type_name)
            .field("roles", &self.roler.is_some())
            .finish()
    }
}
