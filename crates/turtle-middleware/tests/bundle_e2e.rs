//! End-to-end tests for composed handlers.
//!
//! Each test builds a handler through [`Bundler`] and drives it with plain
//! `http` requests, checking what reaches the target handler and what the
//! client gets back.

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use turtle_core::{AuthError, AuthMode, BuildError, CallerIdentity, Credential, EndpointPolicy};
use turtle_middleware::schemes::{BearerScheme, SpiffeScheme, SPIFFE_ID_HEADER};
use turtle_middleware::{
    after_slice, wrap_slice, Bundler, FnMiddleware, FnPostHook, FnScheme, MiddlewareContext,
    Options, Request, Response, ResponseExt, TelemetryHook,
};

/// Counts handler invocations and remembers the credential it saw.
#[derive(Clone, Default)]
struct Tally {
    calls: Arc<AtomicUsize>,
    credential: Arc<Mutex<Option<Credential>>>,
}

impl Tally {
    fn options(&self) -> Options {
        let tally = self.clone();
        Options::new(move |req: Request| {
            tally.calls.fetch_add(1, Ordering::SeqCst);
            *tally.credential.lock().unwrap() = req.extensions().get::<Credential>().cloned();
            async { Response::json(StatusCode::OK, r#"{"status":"ok"}"#.to_string()) }
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn saw_credential(&self) -> bool {
        self.credential.lock().unwrap().is_some()
    }
}

/// Registers a scheme that counts calls and always fails or always succeeds.
fn counting_scheme(bundler: &mut Bundler, name: &str, succeed: bool) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let identity = name.to_string();
    bundler.register_scheme(
        name,
        FnScheme::new(move |_req: &Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            if succeed {
                Ok(CallerIdentity::user(identity.clone(), ["member"])
                    .into_credential())
            } else {
                Err(AuthError::invalid(format!("{identity} rejected")))
            }
        }),
    );
    calls
}

fn bearer_bundler() -> Bundler {
    let mut bundler = Bundler::new();
    bundler.register_scheme(
        "bearer",
        BearerScheme::new(|token: &str| match token {
            "admin-token" => Ok(CallerIdentity::user("alice", ["admin"]).into_credential()),
            "viewer-token" => Ok(CallerIdentity::user("bob", ["viewer"]).into_credential()),
            _ => Err(AuthError::invalid("unknown token")),
        }),
    );
    bundler
}

fn request(method: Method, content_type: Option<&str>, token: Option<&str>) -> Request {
    let mut builder = http::Request::builder().method(method).uri("/orders");
    if let Some(ct) = content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct);
    }
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Full::new(Bytes::from(r#"{"item":"tea"}"#)))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Authentication modes
// =============================================================================

#[tokio::test]
async fn test_mode_none_never_calls_a_scheme() {
    let mut bundler = Bundler::new();
    let calls = counting_scheme(&mut bundler, "strict", false);
    let tally = Tally::default();

    let handler = bundler
        .build(
            tally
                .options()
                .schemes(["strict"])
                .auth_mode(AuthMode::None),
        )
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(tally.calls(), 1);
    assert!(!tally.saw_credential());
}

#[tokio::test]
async fn test_mode_try_with_failing_schemes_reaches_handler() {
    let mut bundler = Bundler::new();
    let first = counting_scheme(&mut bundler, "a", false);
    let second = counting_scheme(&mut bundler, "b", false);
    let third = counting_scheme(&mut bundler, "c", false);
    let tally = Tally::default();

    let handler = bundler
        .build(
            tally
                .options()
                .schemes(["a", "b", "c"])
                .auth_mode(AuthMode::Try),
        )
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    for calls in [first, second, third] {
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
    assert_eq!(tally.calls(), 1);
    assert!(!tally.saw_credential());
}

#[tokio::test]
async fn test_mode_required_stops_at_first_success() {
    let mut bundler = Bundler::new();
    let first = counting_scheme(&mut bundler, "a", false);
    let second = counting_scheme(&mut bundler, "b", true);
    let third = counting_scheme(&mut bundler, "c", true);
    let tally = Tally::default();

    let handler = bundler
        .build(tally.options().schemes(["a", "b", "c"]))
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(third.load(Ordering::SeqCst), 0);

    let credential = tally.credential.lock().unwrap().clone().unwrap();
    assert_eq!(
        credential
            .downcast_ref::<CallerIdentity>()
            .map(CallerIdentity::log_id),
        Some("user:b".to_string())
    );
}

#[tokio::test]
async fn test_mode_required_reports_last_scheme_error() {
    let mut bundler = Bundler::new();
    counting_scheme(&mut bundler, "a", false);
    counting_scheme(&mut bundler, "b", false);
    let tally = Tally::default();

    let handler = bundler.build(tally.options().schemes(["a", "b"])).unwrap();
    let response = handler.call(request(Method::GET, None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tally.calls(), 0);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("b rejected"));
}

#[tokio::test]
async fn test_mode_required_without_schemes_is_unauthorized() {
    let tally = Tally::default();
    let handler = Bundler::new().build(tally.options()).unwrap();

    let response = handler
        .call(request(Method::GET, None, Some("admin-token")))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tally.calls(), 0);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("no authentication scheme configured"));
}

#[tokio::test]
async fn test_scheme_internal_failure_is_unauthorized() {
    let mut bundler = Bundler::new();
    bundler.register_scheme(
        "flaky",
        FnScheme::new(|_req: &Request| Err(anyhow::anyhow!("key server unreachable").into())),
    );
    let tally = Tally::default();

    let handler = bundler.build(tally.options().schemes(["flaky"])).unwrap();
    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tally.calls(), 0);
}

// =============================================================================
// Build-time validation
// =============================================================================

#[test]
fn test_roles_without_required_mode_fail_to_build() {
    let bundler = bearer_bundler();
    let tally = Tally::default();

    for mode in [AuthMode::Try, AuthMode::None] {
        let result = bundler.build(tally.options().auth_mode(mode).roles(["admin"]));
        assert!(matches!(
            result,
            Err(BuildError::RolesRequireAuthRequired { roles: 1, .. })
        ));
    }
}

#[test]
fn test_policy_with_unknown_mode_fails_to_build() {
    let bundler = bearer_bundler();
    let policy = EndpointPolicy {
        auth_mode: "optional".to_string(),
        ..Default::default()
    };
    let err = bundler
        .build_policy("orders", &policy, |_req: Request| async {
            Response::error(StatusCode::OK, "")
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid auth mode: optional");
}

#[test]
fn test_unknown_scheme_fails_to_build() {
    let bundler = bearer_bundler();
    let result = bundler.build(Tally::default().options().schemes(["bearer", "mtls"]));
    assert!(matches!(result, Err(BuildError::UnregisteredScheme { name }) if name == "mtls"));
}

#[test]
fn test_default_scheme_must_be_registered() {
    let mut bundler = bearer_bundler();
    assert!(bundler.set_default_scheme("mtls").is_err());
    assert!(bundler.set_default_scheme("bearer").is_ok());
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_any_listed_role_is_enough() {
    let bundler = bearer_bundler();
    let tally = Tally::default();
    let handler = bundler
        .build(
            tally
                .options()
                .schemes(["bearer"])
                .roles(["viewer", "admin"]),
        )
        .unwrap();

    for token in ["admin-token", "viewer-token"] {
        let response = handler
            .call(request(Method::GET, None, Some(token)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(tally.calls(), 2);
}

#[tokio::test]
async fn test_no_matching_role_is_forbidden_listing_all_roles() {
    let bundler = bearer_bundler();
    let tally = Tally::default();
    let handler = bundler
        .build(
            tally
                .options()
                .schemes(["bearer"])
                .roles(["admin", "auditor"]),
        )
        .unwrap();

    let response = handler
        .call(request(Method::GET, None, Some("viewer-token")))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(tally.calls(), 0);

    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "missing required roles: admin auditor"
    );
}

#[tokio::test]
async fn test_credential_without_roles_is_server_error() {
    let mut bundler = Bundler::new();
    bundler.register_scheme(
        "opaque",
        FnScheme::new(|_req: &Request| Ok(Credential::new("subject-42".to_string()))),
    );
    let tally = Tally::default();
    let handler = bundler
        .build(tally.options().schemes(["opaque"]).roles(["admin"]))
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(tally.calls(), 0);

    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "An internal error occurred");
}

// =============================================================================
// Content types
// =============================================================================

#[tokio::test]
async fn test_allow_list_substring_match() {
    let tally = Tally::default();
    let handler = Bundler::new()
        .build(
            tally
                .options()
                .auth_mode(AuthMode::None)
                .allow(["application/json"]),
        )
        .unwrap();

    let response = handler
        .call(request(
            Method::POST,
            Some("application/json; charset=utf-8"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = handler
        .call(request(Method::POST, Some("text/plain"), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["message"],
        "invalid request content-type: text/plain"
    );

    assert_eq!(tally.calls(), 1);
}

#[tokio::test]
async fn test_bodyless_methods_bypass_content_type_check() {
    let tally = Tally::default();
    let handler = Bundler::new()
        .build(tally.options().auth_mode(AuthMode::None))
        .unwrap();

    for method in [Method::GET, Method::HEAD, Method::DELETE] {
        let response = handler
            .call(request(method, Some("text/plain"), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = handler
        .call(request(Method::PATCH, Some("text/plain"), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(tally.calls(), 3);
}

proptest! {
    #[test]
    fn prop_post_reaches_handler_iff_allowed(content_type in "[a-z/+.-]{0,24}") {
        let handler = Bundler::new()
            .build(
                Tally::default()
                    .options()
                    .auth_mode(AuthMode::None)
                    .allow(["json", "text/csv"]),
            )
            .unwrap();

        let response =
            tokio_test::block_on(handler.call(request(Method::POST, Some(&content_type), None)));
        let allowed = content_type.contains("json") || content_type.contains("text/csv");
        prop_assert_eq!(response.status() == StatusCode::OK, allowed);
    }
}

// =============================================================================
// Hooks
// =============================================================================

#[tokio::test]
async fn test_before_hooks_run_in_order_after_builtin_stages() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let hooks = ["first", "second"].map(|name| {
        let order = order.clone();
        FnMiddleware::new(name, move |ctx: &mut MiddlewareContext, _req: &Request| {
            order
                .lock()
                .unwrap()
                .push((name, ctx.is_authenticated()));
            Ok(())
        })
    });

    let tally = Tally::default();
    let handler = bearer_bundler()
        .build(
            tally
                .options()
                .schemes(["bearer"])
                .before(wrap_slice(hooks)),
        )
        .unwrap();

    let response = handler
        .call(request(Method::GET, None, Some("admin-token")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        *order.lock().unwrap(),
        vec![("first", true), ("second", true)]
    );
}

#[tokio::test]
async fn test_post_hooks_run_once_even_after_short_circuit() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hooks = ["audit", "metrics"].map(|name| {
        let seen = seen.clone();
        FnPostHook::new(name, move |_ctx: &MiddlewareContext, res: &Response| {
            seen.lock().unwrap().push((name, res.status()));
        })
    });

    let tally = Tally::default();
    let handler = bearer_bundler()
        .build(
            tally
                .options()
                .schemes(["bearer"])
                .after(after_slice(hooks))
                .after_hook(TelemetryHook::new("orders")),
        )
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tally.calls(), 0);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("audit", StatusCode::UNAUTHORIZED),
            ("metrics", StatusCode::UNAUTHORIZED)
        ]
    );

    seen.lock().unwrap().clear();
    let response = handler
        .call(request(Method::GET, None, Some("admin-token")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_post_hooks_do_not_alter_response() {
    let tally = Tally::default();
    let handler = Bundler::new()
        .build(
            tally
                .options()
                .auth_mode(AuthMode::None)
                .after_hook(FnPostHook::new("noop", |_ctx, _res| {})),
        )
        .unwrap();

    let response = handler.call(request(Method::GET, None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

// =============================================================================
// Reference schemes
// =============================================================================

#[tokio::test]
async fn test_bearer_valid_and_invalid_tokens() {
    let tally = Tally::default();
    let handler = bearer_bundler()
        .build(tally.options().schemes(["bearer"]))
        .unwrap();

    let response = handler
        .call(request(Method::GET, None, Some("admin-token")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(tally.saw_credential());

    let response = handler
        .call(request(Method::GET, None, Some("forged")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(tally.calls(), 1);
}

#[tokio::test]
async fn test_spiffe_then_bearer_fallback() {
    let mut bundler = bearer_bundler();
    bundler.register_scheme(
        "spiffe",
        SpiffeScheme::new()
            .trust_domain("prod.example.org")
            .grant("spiffe://prod.example.org/billing", ["admin"]),
    );
    let tally = Tally::default();
    let handler = bundler
        .build(
            tally
                .options()
                .schemes(["spiffe", "bearer"])
                .roles(["admin"]),
        )
        .unwrap();

    let workload = http::Request::builder()
        .uri("/orders")
        .header(SPIFFE_ID_HEADER, "spiffe://prod.example.org/billing")
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(handler.call(workload).await.status(), StatusCode::OK);

    let user = request(Method::GET, None, Some("admin-token"));
    assert_eq!(handler.call(user).await.status(), StatusCode::OK);
    assert_eq!(tally.calls(), 2);
}

#[tokio::test]
async fn test_handler_is_shared_across_tasks() {
    let tally = Tally::default();
    let handler = bearer_bundler()
        .build(tally.options().schemes(["bearer"]))
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let token = if i % 2 == 0 { "admin-token" } else { "forged" };
                handler
                    .call(request(Method::GET, None, Some(token)))
                    .await
                    .status()
            })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            ok += 1;
        }
    }
    assert_eq!(ok, 4);
    assert_eq!(tally.calls(), 4);
}
