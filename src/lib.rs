//! # hiweb
//!
//! **hiweb** is a small blocking web framework: typed route binding, a bearer-token auth gate,
//! a TTL session store and gzip-negotiated responses.
//!
//! ## Overview
//!
//! A service registers routes once at startup. Each route names a path pattern, an HTTP method
//! (or `*`), whether it requires authentication, and an ordered list of parameter specs that are
//! bound, in order, to the handler's typed arguments. The dispatcher then serves requests from any
//! number of worker threads.
//!
//! ## Architecture
//!
//! - **[`router`]** - Exact and prefix path matching, route builder and route table
//! - **[`binder`]** - Parameter kinds, validators and argument binding
//! - **[`handler`]** - The typed handler trait and its type-erased form
//! - **[`context`]** - Per-request state: body, form/JSON/multipart values, claims, response
//! - **[`dispatcher`]** - CORS, method filter, IP block, auth gate, binding and panic boundary
//! - **[`security`]** - Bearer JWT provider, custom auth hook and HS256 token helpers
//! - **[`session`]** - Claims sessions with TTL eviction by a background sweeper
//! - **[`response`]** - Response writers with gzip/deflate negotiation and JSON escaping
//! - **[`server`]** - Request/response types and the blocking HTTP listener
//! - **[`config`]** - Framework configuration from YAML, environment and builders
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(tiny_http)
//!     participant Dispatcher
//!     participant Auth as Auth gate
//!     participant Binder
//!     participant Handler
//!
//!     Client->>Server: HTTP request
//!     Server->>Dispatcher: HttpRequest
//!     Dispatcher->>Dispatcher: resolve path
//!     alt No Route Match
//!         Dispatcher-->>Client: 404 page not found
//!     end
//!     Dispatcher->>Dispatcher: CORS headers, OPTIONS, method, IP block
//!     alt Authentication Required
//!         Dispatcher->>Auth: authenticate(ctx)
//!         alt Rejected
//!             Auth-->>Client: 401
//!         end
//!     end
//!     Dispatcher->>Binder: bind ParamSpecs
//!     alt Bind Failed
//!         Binder-->>Client: 400 param error
//!     end
//!     Dispatcher->>Handler: call(ctx, args...)
//!     alt Handler Panics
//!         Dispatcher-->>Client: 400 err param
//!     end
//!     Handler->>Dispatcher: response written to ctx
//!     Dispatcher-->>Client: HttpResponse
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hiweb::{Dispatcher, ParamSpec, RequestContext, WebConfig};
//! use hiweb::server::HttpServer;
//! use serde_json::json;
//!
//! let config = Arc::new(WebConfig::default().with_secret_key("change-me"));
//! let mut dispatcher = Dispatcher::new(config);
//! dispatcher
//!     .route("/user/get", "POST", vec![ParamSpec::int("id")], true,
//!         |ctx: &mut RequestContext, id: i64| -> anyhow::Result<()> {
//!             ctx.serve_json(200, &json!({ "id": id }))?;
//!             Ok(())
//!         })
//!     .expect("route");
//!
//! let handle = HttpServer::new(dispatcher).start("127.0.0.1:8111").expect("bind");
//! handle.join().ok();
//! ```
//!
//! ## Concurrency
//!
//! Handlers run on the listener's worker threads and must not assume anything about which
//! thread serves a request. The route table is immutable once serving starts; the session store
//! is a concurrent map shared by request threads and the sweeper.

pub mod binder;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod response;
pub mod router;
pub mod security;
pub mod server;
pub mod session;

pub use binder::{Body, ParamKind, ParamSpec, Validate, Validator};
pub use config::WebConfig;
pub use context::{RequestContext, UploadedFile};
pub use dispatcher::Dispatcher;
pub use error::{AuthError, BindError, RouteError, SessionError, ValidationError, WebError};
pub use ids::RequestId;
pub use router::Route;
pub use security::token::Claims;
pub use security::{AuthProvider, AuthState, BearerJwtProvider};
