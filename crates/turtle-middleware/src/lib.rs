//! # Turtle Middleware
//!
//! Composes a request handler with authentication, role-based authorization
//! and content-type validation, plus caller-supplied hooks.
//!
//! ## Chain
//!
//! ```text
//! Request → authenticate → authorize → allow → before hooks → handler
//!                                                                ↓
//!                                   after hooks (observe only) ←─┘
//! ```
//!
//! | Stage | Refuses with | When |
//! |-------|--------------|------|
//! | `authenticate` | 401 | auth mode `required` and every scheme failed |
//! | `authorize` | 403 | roles configured and none held |
//! | `allow` | 400 | body-bearing method with an unlisted content type |
//!
//! The built-in stages always run in this order and cannot be reordered.
//! The chain is assembled once, when the handler is built; all validation
//! of the endpoint's options happens then.
//!
//! ## Example
//!
//! ```
//! use turtle_core::{AuthError, CallerIdentity};
//! use turtle_middleware::schemes::BearerScheme;
//! use turtle_middleware::{Bundler, Options, Request, Response, ResponseExt};
//!
//! let mut bundler = Bundler::new();
//! bundler.register_scheme(
//!     "bearer",
//!     BearerScheme::new(|token| match token {
//!         "s3cret" => Ok(CallerIdentity::user("alice", ["admin"]).into_credential()),
//!         _ => Err(AuthError::invalid("unknown token")),
//!     }),
//! );
//!
//! let create_order = bundler
//!     .build(
//!         Options::new(|_req: Request| async {
//!             Response::json(http::StatusCode::CREATED, r#"{"id":1}"#.to_string())
//!         })
//!         .name("create_order")
//!         .schemes(["bearer"])
//!         .roles(["admin"])
//!         .allow(["application/json"]),
//!     )
//!     .unwrap();
//!
//! assert_eq!(create_order.name(), Some("create_order"));
//! ```

#![doc(html_root_url = "https://docs.rs/turtle-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bundler;
pub mod context;
pub mod error_writer;
pub mod hooks;
pub mod middleware;
pub mod options;
pub mod scheme;
pub mod schemes;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use bundler::{Bundler, ComposedHandler, REQUEST_ID_HEADER};
pub use context::MiddlewareContext;
pub use error_writer::{BoxedErrorWriter, ErrorWriter, JsonErrorWriter};
pub use hooks::{after_slice, wrap_slice, AfterNext, BoxedPostHook, FnPostHook, PostHook};
pub use middleware::{
    BoxFuture, BoxedMiddleware, FnMiddleware, Handler, HookError, Middleware, Next,
};
pub use options::Options;
pub use scheme::{BoxedScheme, FnScheme, Scheme, SchemeRegistry};
pub use stages::TelemetryHook;
pub use types::{Request, Response, ResponseExt};
