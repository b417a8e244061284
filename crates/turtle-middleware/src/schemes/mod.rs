//! Ready-made schemes.
//!
//! | Scheme | Reads | Produces |
//! |--------|-------|----------|
//! | [`SpiffeScheme`] | `x-spiffe-id` (set by an mTLS-terminating ingress) | [`CallerIdentity::Spiffe`] |
//! | [`BearerScheme`] | `Authorization: Bearer <token>` | whatever the validator returns |
//! | [`ApiKeyScheme`] | `x-api-key` | [`CallerIdentity::ApiKey`] |
//!
//! [`CallerIdentity::Spiffe`]: turtle_core::CallerIdentity::Spiffe
//! [`CallerIdentity::ApiKey`]: turtle_core::CallerIdentity::ApiKey

pub mod api_key;
pub mod bearer;
pub mod spiffe;

pub use api_key::{ApiKeyScheme, API_KEY_HEADER};
pub use bearer::BearerScheme;
pub use spiffe::{SpiffeScheme, SPIFFE_ID_HEADER};
