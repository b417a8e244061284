//! Caller identities produced by the bundled schemes.
//!
//! Schemes are free to produce any credential type. [`CallerIdentity`] is a
//! ready-made one covering the common cases (workload identity, end user,
//! API key) that already implements [`Roler`].

use crate::credential::{Credential, Roler};
use serde::{Deserialize, Serialize};

/// SPIFFE workload identity, usually asserted by an mTLS-terminating proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiffeIdentity {
    /// Full SPIFFE ID (`spiffe://trust-domain/path`).
    pub spiffe_id: String,
    /// Trust domain component of the ID.
    pub trust_domain: String,
    /// Roles granted to the workload.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// End-user identity, typically decoded from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user identifier.
    pub user_id: String,
    /// Email address, if known.
    #[serde(default)]
    pub email: Option<String>,
    /// Roles held by the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// API key identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyIdentity {
    /// Key identifier (never the secret itself).
    pub key_id: String,
    /// Scopes granted to the key; used as roles.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Authenticated caller identity.
///
/// # Example
///
/// ```rust
/// use turtle_core::{CallerIdentity, Roler};
///
/// let identity = CallerIdentity::user("u-123", ["admin"]);
/// assert!(identity.has_role("admin"));
/// assert_eq!(identity.log_id(), "user:u-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// Workload identity.
    Spiffe(SpiffeIdentity),
    /// End user.
    User(UserIdentity),
    /// API key.
    ApiKey(ApiKeyIdentity),
}

impl CallerIdentity {
    /// Creates a SPIFFE identity, deriving the trust domain from the ID.
    ///
    /// Returns `None` if `spiffe_id` is not a `spiffe://` URI with a
    /// non-empty trust domain.
    #[must_use]
    pub fn spiffe(spiffe_id: impl Into<String>) -> Option<Self> {
        let spiffe_id = spiffe_id.into();
        let trust_domain = spiffe_id
            .strip_prefix("spiffe://")?
            .split('/')
            .next()
            .filter(|domain| !domain.is_empty())?
            .to_string();

        Some(Self::Spiffe(SpiffeIdentity {
            spiffe_id,
            trust_domain,
            roles: Vec::new(),
        }))
    }

    /// Creates a user identity with the given roles.
    #[must_use]
    pub fn user<I>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::User(UserIdentity {
            user_id: user_id.into(),
            email: None,
            roles: roles.into_iter().map(Into::into).collect(),
        })
    }

    /// Creates an API key identity with the given scopes.
    #[must_use]
    pub fn api_key<I>(key_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::ApiKey(ApiKeyIdentity {
            key_id: key_id.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        })
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes secrets.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Spiffe(s) => s.spiffe_id.clone(),
            Self::User(u) => format!("user:{}", u.user_id),
            Self::ApiKey(k) => format!("apikey:{}", k.key_id),
        }
    }

    /// Returns the roles carried by this identity.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        match self {
            Self::Spiffe(s) => &s.roles,
            Self::User(u) => &u.roles,
            Self::ApiKey(k) => &k.scopes,
        }
    }

    /// Wraps this identity into a role-capable [`Credential`].
    #[must_use]
    pub fn into_credential(self) -> Credential {
        Credential::with_roles(self)
    }
}

impl Roler for CallerIdentity {
    fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }
}
