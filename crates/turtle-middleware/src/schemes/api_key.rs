//! Static API keys.

use crate::middleware::BoxFuture;
use crate::scheme::Scheme;
use crate::types::Request;
use std::collections::HashMap;
use std::fmt;
use turtle_core::{AuthError, CallerIdentity, Credential};

/// Header for API keys.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Looks up the `x-api-key` header in a fixed key table.
#[derive(Clone, Default)]
pub struct ApiKeyScheme {
    keys: HashMap<String, CallerIdentity>,
}

impl ApiKeyScheme {
    /// Creates a scheme with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `secret`, identifying the caller as `key_id` with `scopes`.
    #[must_use]
    pub fn key<I, S>(
        mut self,
        secret: impl Into<String>,
        key_id: impl Into<String>,
        scopes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys
            .insert(secret.into(), CallerIdentity::api_key(key_id, scopes));
        self
    }
}

impl Scheme for ApiKeyScheme {
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Credential, AuthError>> {
        let result = match request.headers().get(API_KEY_HEADER) {
            None => Err(AuthError::missing(API_KEY_HEADER)),
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|secret| self.keys.get(secret))
                .cloned()
                .map(CallerIdentity::into_credential)
                .ok_or_else(|| AuthError::invalid("unknown API key")),
        };
        Box::pin(async move { result })
    }
}

impl fmt::Debug for ApiKeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<_> = self.keys.values().map(CallerIdentity::log_id).collect();
        f.debug_struct("ApiKeyScheme").field("keys", &ids).finish()
    }
}
