//! # Router Module
//!
//! Route registration and path resolution.
//!
//! ## Overview
//!
//! A route is a (pattern, method) pair bound to a typed handler and an ordered
//! list of [`crate::binder::ParamSpec`]s. Routes are registered once at
//! startup; the table is read-only while serving.
//!
//! ## Matching
//!
//! 1. A path equal to a registered pattern matches it.
//! 2. Otherwise the longest registered pattern ending in `/` that prefixes
//!    the path matches. The non-empty path segments after the prefix become
//!    positional argument values, in order.
//!
//! ```text
//! pattern  /session/get/
//! path     /session/get/4f2a.../extra
//! segments ["4f2a...", "extra"]
//! ```
//!
//! ## Methods
//!
//! The method token is `*` for every method or any valid HTTP method, matched
//! case-insensitively. A path that matches but has no entry for the request
//! method is answered with 404.

mod core;

pub use core::{MethodMatch, Route, RouteEntry, RouteMatch, RouteTable};
