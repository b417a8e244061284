//! Error types for Turtle.
//!
//! Errors come in two tiers:
//!
//! - [`BuildError`] is returned while composing a handler. A build error means
//!   an endpoint's security configuration is invalid and the process must not
//!   start serving traffic with it.
//! - [`ServeError`] describes why a single request was refused. It is never
//!   propagated out of the chain; the stage that detects it hands it to an
//!   error writer, which renders exactly one terminal response.
//!
//! Each [`ServeError`] maps to one of four [`ErrorCategory`] values, which in
//! turn select the HTTP status and the error-writer operation.

use crate::mode::AuthMode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`BuildError`].
pub type BuildResult<T> = Result<T, BuildError>;

/// Construction-time configuration errors.
///
/// These are fatal: a handler is never produced for a misconfigured endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The auth mode text is not one of `required`, `try`, `none`.
    #[error("invalid auth mode: {mode}")]
    InvalidAuthMode {
        /// The rejected mode text.
        mode: String,
    },

    /// Roles were configured on an endpoint that does not require authentication.
    #[error("invalid authentication mode {mode} for amount of roles {roles}")]
    RolesRequireAuthRequired {
        /// The configured auth mode.
        mode: AuthMode,
        /// Number of configured roles.
        roles: usize,
    },

    /// A scheme name is not present in the registry.
    #[error("scheme not registered: {name}")]
    UnregisteredScheme {
        /// The missing scheme name.
        name: String,
    },
}

impl BuildError {
    /// Creates an unregistered scheme error.
    #[must_use]
    pub fn unregistered_scheme(name: impl Into<String>) -> Self {
        Self::UnregisteredScheme { name: name.into() }
    }
}

/// Failure reported by an authentication scheme.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The request carries no credentials this scheme understands.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Credentials were present but rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Any other failure raised while verifying credentials.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthError {
    /// Creates a missing credentials error.
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingCredentials(message.into())
    }

    /// Creates an invalid credentials error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidCredentials(message.into())
    }
}

/// The four terminal response kinds a refused request can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Authentication required and every scheme failed.
    Unauthorized,
    /// Authenticated but none of the required roles matched.
    Forbidden,
    /// The request body type is not accepted.
    BadRequest,
    /// Internal consistency failure.
    ServerError,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::BadRequest => "BAD_REQUEST",
            Self::ServerError => "INTERNAL_ERROR",
        }
    }
}

/// Reasons a request is refused by one of the built-in stages.
#[derive(Error, Debug)]
pub enum ServeError {
    /// A scheme listed for the endpoint is missing from the registry snapshot.
    #[error("authentication scheme not registered: {name}")]
    SchemeNotRegistered {
        /// The missing scheme name.
        name: String,
    },

    /// Authentication was required and did not succeed.
    #[error("authentication failed: {0}")]
    Unauthenticated(#[source] AuthError),

    /// Roles are required but no credential was attached to the request.
    #[error("no credentials attached to the request")]
    MissingCredentials,

    /// The attached credential cannot answer role-membership questions.
    #[error("credentials do not implement role membership")]
    CredentialsNotRoler,

    /// None of the required roles are held by the caller.
    #[error("missing required roles: {}", roles.join(" "))]
    MissingRoles {
        /// Every role configured for the endpoint.
        roles: Vec<String>,
    },

    /// The request content type is not in the allow list.
    #[error("invalid request content-type: {content_type}")]
    UnsupportedContentType {
        /// The offending content type (empty when the header is absent).
        content_type: String,
    },
}

impl ServeError {
    /// Returns the response category for this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated(_) => ErrorCategory::Unauthorized,
            Self::MissingRoles { .. } => ErrorCategory::Forbidden,
            Self::UnsupportedContentType { .. } => ErrorCategory::BadRequest,
            Self::SchemeNotRegistered { .. }
            | Self::MissingCredentials
            | Self::CredentialsNotRoler => ErrorCategory::ServerError,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    /// Converts this error to a serializable error envelope.
    ///
    /// Server errors are reduced to a generic message unless `expose_internal`
    /// is set, since they describe internal misconfiguration.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>, expose_internal: bool) -> ErrorEnvelope {
        let category = self.category();
        let message = if category == ErrorCategory::ServerError && !expose_internal {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        ErrorEnvelope {
            error: ErrorDetail {
                code: category.code().to_string(),
                message,
                category,
                request_id: request_id.map(ToString::to_string),
            },
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
