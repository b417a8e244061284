//! HTTP types used throughout the interceptor chain.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type seen by schemes, stages and handlers.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by handlers and error writers.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses.
pub trait ResponseExt {
    /// Creates a plain-text error response.
    fn error(status: http::StatusCode, message: &str) -> Response;

    /// Creates a JSON error response with the standard envelope.
    fn json_error(status: http::StatusCode, code: &str, message: &str) -> Response;

    /// Creates a JSON response from an already serialized body.
    fn json(status: http::StatusCode, body: String) -> Response;
}

impl ResponseExt for Response {
    fn error(status: http::StatusCode, message: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(message.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: http::StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        Self::json(status, body.to_string())
    }

    fn json(status: http::StatusCode, body: String) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}
