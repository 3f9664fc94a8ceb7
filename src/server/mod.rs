//! Transport types and the blocking HTTP listener.
//!
//! [`HttpRequest`] and [`HttpResponse`] are the framework's view of a
//! request and response, independent of the listener; the dispatcher can be
//! driven directly with them in tests.

pub mod http_server;
pub mod request;
pub mod response;

pub use http_server::{HttpServer, ServerHandle, ShutdownTrigger};
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseWriter};
