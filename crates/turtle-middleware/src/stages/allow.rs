//! Content-type allow-list stage.
//!
//! Requests that normally carry no body (`GET`, `HEAD`, `DELETE`) are never
//! checked. For every other method the `Content-Type` header must contain
//! one of the allowed values as a substring, so `application/json` accepts
//! `application/json; charset=utf-8`. An empty allow list accepts nothing.

use crate::{
    context::MiddlewareContext,
    error_writer::{write_error, BoxedErrorWriter},
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};
use http::Method;
use turtle_core::ServeError;

/// Rejects body-bearing requests with an unexpected content type.
pub struct AllowStage {
    allow: Vec<String>,
    writer: BoxedErrorWriter,
}

impl AllowStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(allow: Vec<String>, writer: BoxedErrorWriter) -> Self {
        Self { allow, writer }
    }

    /// Returns `true` if `method` skips the content-type check.
    #[must_use]
    pub fn is_exempt(method: &Method) -> bool {
        *method == Method::GET || *method == Method::HEAD || *method == Method::DELETE
    }

    /// Returns `true` if `content_type` contains an allowed value.
    #[must_use]
    pub fn accepts(&self, content_type: &str) -> bool {
        self.allow
            .iter()
            .any(|allowed| content_type.contains(allowed.as_str()))
    }
}

impl Middleware for AllowStage {
    fn name(&self) -> &'static str {
        "allow"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: &'a Next,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if Self::is_exempt(request.method()) {
                return next.run(ctx, request).await;
            }

            let content_type = request
                .headers()
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();

            if self.accepts(content_type) {
                next.run(ctx, request).await
            } else {
                let error = ServeError::UnsupportedContentType {
                    content_type: content_type.to_string(),
                };
                write_error(self.writer.as_ref(), ctx, &request, &error)
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
    use http_body_util::Full;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn stage(allow: &[&str]) -> AllowStage {
        AllowStage::new(
            allow.iter().map(ToString::to_string).collect(),
            Arc::new(JsonErrorWriter::new()),
        )
    }

    fn terminal() -> Next {
        let handler: Arc<dyn Handler> =
            Arc::new(|_req: Request| async { Response::error(StatusCode::OK, "ok") });
        Next::handler(handler)
    }

    fn request(method: Method, content_type: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method(method).uri("/upload");
        if let Some(ct) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, ct);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn status(stage: &AllowStage, request: Request) -> StatusCode {
        let mut ctx = MiddlewareContext::new();
        stage.process(&mut ctx, request, &terminal()).await.status()
    }

    #[tokio::test]
    async fn test_substring_match() {
        let stage = stage(&["application/json"]);
        assert_eq!(
            status(
                &stage,
                request(Method::POST, Some("application/json; charset=utf-8"))
            )
            .await,
            StatusCode::OK
        );
        assert_eq!(
            status(&stage, request(Method::POST, Some("text/plain"))).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let stage = stage(&["application/json"]);
        assert_eq!(
            status(&stage, request(Method::PUT, None)).await,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_exempt_methods_bypass_check() {
        let stage = stage(&[]);
        for method in [Method::GET, Method::HEAD, Method::DELETE] {
            assert_eq!(
                status(&stage, request(method, Some("text/plain"))).await,
                StatusCode::OK
            );
        }
    }

    #[tokio::test]
    async fn test_empty_allow_list_rejects_body_methods() {
        let stage = stage(&[]);
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            assert_eq!(
                status(&stage, request(method, Some("application/json"))).await,
                StatusCode::BAD_REQUEST
            );
        }
    }

    #[tokio::test]
    async fn test_non_utf8_header_treated_as_empty() {
        let stage = stage(&["application/json"]);
        let mut request = request(Method::POST, None);
        request.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_bytes(b"application/\xffjson").unwrap(),
        );
        assert_eq!(status(&stage, request).await, StatusCode::BAD_REQUEST);
    }

    proptest! {
        #[test]
        fn prop_accepts_iff_substring(
            allowed in "[a-z]{1,8}/[a-z]{1,8}",
            prefix in "[a-z ;=]{0,6}",
            suffix in "[a-z ;=]{0,6}",
            other in "[a-z]{1,8}/[a-z]{1,8}",
        ) {
            let stage = stage(&[allowed.as_str()]);
            let wrapped = format!("{prefix}{allowed}{suffix}");
            prop_assert!(stage.accepts(&wrapped));
            prop_assert_eq!(stage.accepts(&other), other.contains(allowed.as_str()));
        }
    }
}
