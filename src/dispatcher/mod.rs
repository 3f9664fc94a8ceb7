//! # Dispatcher Module
//!
//! Ties the route table, auth gate, binder and handlers together for each
//! request.
//!
//! ## Request Flow
//!
//! 1. Resolve the path. No match: 404 without further processing.
//! 2. Set the permissive CORS headers.
//! 3. `OPTIONS`: answer 200.
//! 4. No entry for the request method: 404 `not found`.
//! 5. Remote address in the block set (loopback exempt): 404 `not found`,
//!    indistinguishable from a missing route.
//! 6. Inside a panic boundary:
//!    - run the auth gate if the route requires it (401 on rejection)
//!    - log the accepted request
//!    - bind every argument (400 `param error` on the first failure)
//!    - call the handler (an `Err` becomes 500 unless a status was written)
//! 7. A panic anywhere in step 6 discards the partial response and answers
//!    400 `err param`; the panic and a backtrace are logged and serving
//!    continues.
//!
//! Every dispatched response carries `X-Request-Id`.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hiweb::binder::ParamSpec;
//! use hiweb::config::WebConfig;
//! use hiweb::dispatcher::Dispatcher;
//! use hiweb::server::HttpRequest;
//! use hiweb::RequestContext;
//! use http::Method;
//!
//! let mut dispatcher = Dispatcher::new(Arc::new(WebConfig::default()));
//! dispatcher
//!     .route("/hello", "GET", vec![ParamSpec::string("name")], false,
//!         |ctx: &mut RequestContext, name: String| {
//!             ctx.serve_body(200, format!("hello {name}").as_bytes());
//!         })
//!     .expect("route");
//!
//! let res = dispatcher.dispatch(HttpRequest::new(Method::GET, "/hello?name=bob"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body_str(), "hello bob");
//! ```

mod core;

pub use core::{Dispatcher, CORS_HEADERS};
