//! Declarative endpoint policies.
//!
//! An [`EndpointPolicy`] is the serializable half of an endpoint's options:
//! everything except the hooks and the handler. It is what configuration
//! files describe.

use crate::error::{BuildError, BuildResult};
use crate::mode::AuthMode;
use serde::{Deserialize, Serialize};

/// Security policy for one endpoint.
///
/// The auth mode is kept as text so an invalid value surfaces as
/// [`BuildError::InvalidAuthMode`] when the endpoint is built rather than as
/// an opaque parse error.
///
/// # Example
///
/// ```
/// use turtle_core::{AuthMode, EndpointPolicy};
///
/// let policy = EndpointPolicy {
///     allow: vec!["application/json".to_string()],
///     roles: vec!["admin".to_string()],
///     schemes: vec!["bearer".to_string()],
///     auth_mode: "required".to_string(),
/// };
/// assert_eq!(policy.validate(), Ok(AuthMode::Required));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointPolicy {
    /// Content types accepted on body-bearing methods (substring match).
    #[serde(default)]
    pub allow: Vec<String>,

    /// Roles of which the caller must hold at least one.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Scheme names to try, in order.
    #[serde(default)]
    pub schemes: Vec<String>,

    /// One of `required`, `try`, `none`.
    #[serde(default = "default_auth_mode")]
    pub auth_mode: String,
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self {
            allow: Vec::new(),
            roles: Vec::new(),
            schemes: Vec::new(),
            auth_mode: default_auth_mode(),
        }
    }
}

fn default_auth_mode() -> String {
    AuthMode::Required.to_string()
}

impl EndpointPolicy {
    /// Parses the configured auth mode.
    pub fn auth_mode(&self) -> BuildResult<AuthMode> {
        self.auth_mode.parse()
    }

    /// Checks the rules that do not depend on the scheme registry.
    ///
    /// Returns the parsed auth mode on success.
    pub fn validate(&self) -> BuildResult<AuthMode> {
        let mode = self.auth_mode()?;
        validate_roles(mode, &self.roles)?;
        Ok(mode)
    }
}

/// Rejects roles on an endpoint whose auth mode is not `required`.
pub fn validate_roles(mode: AuthMode, roles: &[String]) -> BuildResult<()> {
    if !mode.is_required() && !roles.is_empty() {
        return Err(BuildError::RolesRequireAuthRequired {
            mode,
            roles: roles.len(),
        });
    }
    Ok(())
}
