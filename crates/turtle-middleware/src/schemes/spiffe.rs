//! SPIFFE workload identity from a trusted header.

use crate::middleware::BoxFuture;
use crate::scheme::Scheme;
use crate::types::Request;
use std::collections::HashMap;
use turtle_core::{AuthError, CallerIdentity, Credential};

/// Header for SPIFFE ID (set by ingress/sidecar).
pub const SPIFFE_ID_HEADER: &str = "x-spiffe-id";

/// Trusts the SPIFFE ID asserted by an ingress or sidecar.
///
/// The header must only be reachable through a proxy that strips it from
/// client traffic.
///
/// # Example
///
/// ```
/// use turtle_middleware::schemes::SpiffeScheme;
///
/// let scheme = SpiffeScheme::new()
///     .trust_domain("prod.example.org")
///     .grant("spiffe://prod.example.org/billing", ["payments:write"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpiffeScheme {
    trust_domain: Option<String>,
    grants: HashMap<String, Vec<String>>,
}

impl SpiffeScheme {
    /// Creates a scheme accepting any trust domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects IDs from any other trust domain.
    #[must_use]
    pub fn trust_domain(mut self, trust_domain: impl Into<String>) -> Self {
        self.trust_domain = Some(trust_domain.into());
        self
    }

    /// Grants roles to one workload.
    #[must_use]
    pub fn grant<I, S>(mut self, spiffe_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .entry(spiffe_id.into())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    fn identify(&self, request: &Request) -> Result<CallerIdentity, AuthError> {
        let header = request
            .headers()
            .get(SPIFFE_ID_HEADER)
            .ok_or_else(|| AuthError::missing(SPIFFE_ID_HEADER))?;
        let spiffe_id = header
            .to_str()
            .map_err(|_| AuthError::invalid("SPIFFE ID is not valid UTF-8"))?;

        let mut identity = CallerIdentity::spiffe(spiffe_id)
            .ok_or_else(|| AuthError::invalid(format!("malformed SPIFFE ID: {spiffe_id}")))?;

        if let CallerIdentity::Spiffe(spiffe) = &mut identity {
            if let Some(trusted) = &self.trust_domain {
                if &spiffe.trust_domain != trusted {
                    return Err(AuthError::invalid(format!(
                        "untrusted SPIFFE trust domain: {}",
                        spiffe.trust_domain
                    )));
                }
            }
            if let Some(roles) = self.grants.get(&spiffe.spiffe_id) {
                spiffe.roles.clone_from(roles);
            }
        }

        Ok(identity)
    }
}

impl Scheme for SpiffeScheme {
    fn authenticate<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<Credential, AuthError>> {
        let result = self.identify(request).map(CallerIdentity::into_credential);
        Box::pin(async move { result })
    }
}
