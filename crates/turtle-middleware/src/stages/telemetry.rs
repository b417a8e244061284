//! Request telemetry post hook.
//!
//! # Metrics Emitted
//!
//! - `turtle_requests_total` - counter by endpoint and status
//! - `turtle_request_duration_seconds` - histogram by endpoint
//!
//! Every completed request is also logged at `info` with its request ID,
//! status, duration and the scheme that authenticated it.

use crate::{
    context::MiddlewareContext,
    hooks::{AfterNext, PostHook},
    middleware::BoxFuture,
    types::Response,
};

/// Post hook that records metrics and a completion log line.
#[derive(Debug, Clone)]
pub struct TelemetryHook {
    endpoint: String,
}

impl TelemetryHook {
    /// Creates a hook labelling its metrics with `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Returns the endpoint label.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PostHook for TelemetryHook {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a MiddlewareContext,
        response: &'a Response,
        next: &'a AfterNext,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let duration = ctx.elapsed();
            let status = response.status().as_u16();

            turtle_telemetry::record_request(&self.endpoint, status, duration);
            tracing::info!(
                request_id = %ctx.request_id(),
                endpoint = %self.endpoint,
                status_code = status,
                duration_ms = duration.as_secs_f64() * 1000.0,
                scheme = ctx.scheme().unwrap_or("-"),
                "Request completed"
            );

            next.run(ctx, response).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::FnPostHook;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_endpoint_label() {
        let hook = TelemetryHook::new("create_order");
        assert_eq!(hook.endpoint(), "create_order");
        assert_eq!(hook.name(), "telemetry");
    }

    #[tokio::test]
    async fn test_hands_over_to_next_hook() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = reached.clone();
        let next = AfterNext::new(
            Arc::new(FnPostHook::new(
                "after",
                move |_ctx: &MiddlewareContext, _res: &Response| {
                    flag.store(true, Ordering::SeqCst);
                },
            )),
            AfterNext::end(),
        );

        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::ACCEPTED;

        let ctx = MiddlewareContext::new();
        TelemetryHook::new("orders")
            .process(&ctx, &response, &next)
            .await;
        assert!(reached.load(Ordering::SeqCst));
    }
}
