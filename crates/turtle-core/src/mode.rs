//! Authentication modes.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Controls how the authenticate stage treats scheme failures.
///
/// | Mode | Behavior |
/// |------|----------|
/// | `required` | every scheme failing ends the request with 401 |
/// | `try` | best effort; failures are silent and the request continues unauthenticated |
/// | `none` | schemes are never consulted |
///
/// # Example
///
/// ```
/// use turtle_core::AuthMode;
///
/// let mode: AuthMode = "try".parse().unwrap();
/// assert_eq!(mode, AuthMode::Try);
/// assert!("sometimes".parse::<AuthMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthMode {
    /// Authentication must succeed.
    #[default]
    Required,
    /// Authentication is attempted but optional.
    Try,
    /// Authentication is skipped.
    None,
}

impl AuthMode {
    /// Returns the mode as it appears in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Try => "try",
            Self::None => "none",
        }
    }

    /// Returns `true` for [`AuthMode::Required`].
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "required" => Ok(Self::Required),
            "try" => Ok(Self::Try),
            "none" => Ok(Self::None),
            other => Err(BuildError::InvalidAuthMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AuthMode {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuthMode> for String {
    fn from(mode: AuthMode) -> Self {
        mode.as_str().to_string()
    }
}
