//! Bearer tokens.

use crate::middleware::BoxFuture;
use crate::scheme::Scheme;
use crate::types::Request;
use std::fmt;
use turtle_core::{AuthError, Credential};

/// Extracts `Authorization: Bearer <token>` and hands the token to a
/// validator.
///
/// Token verification (signature, expiry, revocation) is the validator's job.
///
/// # Example
///
/// ```
/// use turtle_core::{AuthError, CallerIdentity};
/// use turtle_middleware::schemes::BearerScheme;
///
/// let scheme = BearerScheme::new(|token| match token {
///     "s3cret" => Ok(CallerIdentity::user("alice", ["admin"]).into_credential()),
///     _ => Err(AuthError::invalid("unknown token")),
/// });
/// ```
pub struct BearerScheme<V> {
    validator: V,
}

impl<V> BearerScheme<V>
where
    V: Fn(&str) -> Result<Credential, AuthError> + Send + Sync + 'static,
{
    /// Creates a scheme that validates tokens with `validator`.
    pub const fn new(validator: V) -> Self {
        Self { validator }
    }
}

/// Returns the token of a bearer `Authorization` header value.
///
/// The scheme keyword is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (keyword, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (keyword.eq_ignore_ascii_case("bearer") && !token.is_empty())
        .then_some(token)
}

impl<V> Scheme for BearerScheme<V>
where
    V: Fn(&str) -> Result<Credential, AuthError> + Send + Sync + 'static,
{
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Credential, AuthError>> {
        let result = request
            .headers()
            .get(http::header::AUTHORIZATION)
            .ok_or_else(|| AuthError::missing("authorization header"))
            .and_then(|value| {
                value
                    .to_str()
                    .ok()
                    .and_then(bearer_token)
                    .ok_or_else(|| AuthError::invalid("authorization header is not a bearer token"))
            })
            .and_then(|token| (self.validator)(token));
        Box::pin(async move { result })
    }
}

impl<V> fmt::Debug for BearerScheme<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerScheme").finish_non_exhaustive()
    }
}
