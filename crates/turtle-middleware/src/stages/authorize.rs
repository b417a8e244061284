//! Role-based authorization stage.
//!
//! Role checks are an OR: holding any one of the endpoint's roles is enough.
//! An endpoint without roles lets every request through.

use crate::{
    context::MiddlewareContext,
    error_writer::{write_error, BoxedErrorWriter},
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};
use turtle_core::{Credential, ServeError};

/// Requires the credential to hold at least one role.
pub struct AuthorizeStage {
    roles: Vec<String>,
    writer: BoxedErrorWriter,
}

impl AuthorizeStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(roles: Vec<String>, writer: BoxedErrorWriter) -> Self {
        Self { roles, writer }
    }

    /// Returns the configured roles.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Checks the context's credential, returning the refusal if any.
    fn check(&self, ctx: &MiddlewareContext) -> Option<ServeError> {
        if self.roles.is_empty() {
            return None;
        }

        match ctx.credential().map(Credential::roler) {
            None => Some(ServeError::MissingCredentials),
            Some(None) => Some(ServeError::CredentialsNotRoler),
            Some(Some(roler)) if self.roles.iter().any(|role| roler.has_role(role)) => None,
            Some(Some(_)) => Some(ServeError::MissingRoles {
                roles: self.roles.clone(),
            }),
        }
    }
}

impl Middleware for AuthorizeStage {
    fn name(&self) -> &'static str {
        "authorize"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: &'a Next,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match self.check(ctx) {
                Some(error) => write_error(self.writer.as_ref(), ctx, &request, &error),
                None => next.run(ctx, request).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_writer::JsonErrorWriter;
    use crate::middleware::Handler;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use proptest::prelude::*;
    use std::sync::Arc;
    use turtle_core::CallerIdentity;

    fn stage(roles: &[&str]) -> AuthorizeStage {
        AuthorizeStage::new(
            roles.iter().map(ToString::to_string).collect(),
            Arc::new(JsonErrorWriter::new().expose_internal_errors(true)),
        )
    }

    fn terminal() -> Next {
        let handler: Arc<dyn Handler> =
            Arc::new(|_req: Request| async { Response::error(StatusCode::OK, "ok") });
        Next::handler(handler)
    }

    fn request() -> Request {
        http::Request::new(Full::new(Bytes::new()))
    }

    fn with_user(roles: &[&str]) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        ctx.set_credential(
            "test",
            CallerIdentity::user("u1", roles.iter().copied()).into_credential(),
        );
        ctx
    }

    #[tokio::test]
    async fn test_no_roles_passes_without_credential() {
        let mut ctx = MiddlewareContext::new();
        let response = stage(&[]).process(&mut ctx, request(), &terminal()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_any_matching_role_passes() {
        let mut ctx = with_user(&["editor"]);
        let response = stage(&["admin", "editor"])
            .process(&mut ctx, request(), &terminal())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_matching_role_is_forbidden() {
        let mut ctx = with_user(&["viewer"]);
        let response = stage(&["admin", "editor"])
            .process(&mut ctx, request(), &terminal())
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["error"]["message"],
            "missing required roles: admin editor"
        );
    }

    #[tokio::test]
    async fn test_missing_credential_is_server_error() {
        let mut ctx = MiddlewareContext::new();
        let response = stage(&["admin"])
            .process(&mut ctx, request(), &terminal())
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_credential_without_roles_is_server_error() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_credential("opaque", Credential::new(42_u32));
        let response = stage(&["admin"])
            .process(&mut ctx, request(), &terminal())
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    proptest! {
        #[test]
        fn prop_role_check_is_or(
            required in proptest::collection::vec("[a-d]", 1..4),
            held in proptest::collection::vec("[a-d]", 0..4),
        ) {
            let required: Vec<&str> = required.iter().map(String::as_str).collect();
            let held: Vec<&str> = held.iter().map(String::as_str).collect();
            let expected_pass = required.iter().any(|role| held.contains(role));

            let outcome = stage(&required).check(&with_user(&held));
            prop_assert_eq!(outcome.is_none(), expected_pass);
            if let Some(error) = outcome {
                let is_missing_roles = matches!(error, ServeError::MissingRoles { .. });
                prop_assert!(is_missing_roles);
            }
        }
    }
}
