//! Route table: registration and path resolution.

use std::collections::HashMap;
use std::fmt;

use http::Method;
use tracing::{debug, info};

use crate::binder::{ParamKind, ParamSpec};
use crate::context::{RequestContext, Segments};
use crate::error::{BindError, RouteError};
use crate::handler::{self, Handler, HandlerResult, RouteFn};

/// Method a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatch {
    /// `*`: every method
    Any,
    Only(Method),
}

impl MethodMatch {
    /// Parse a method token. `*` means any method; otherwise the token must be
    /// a valid HTTP method (case-insensitive).
    pub fn parse(token: &str) -> Result<Self, RouteError> {
        let token = token.trim();
        if token == "*" {
            return Ok(MethodMatch::Any);
        }
        if token.is_empty() {
            return Err(RouteError::InvalidMethod(token.to_string()));
        }
        Method::from_bytes(token.to_ascii_uppercase().as_bytes())
            .map(MethodMatch::Only)
            .map_err(|_| RouteError::InvalidMethod(token.to_string()))
    }

    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodMatch::Any => true,
            MethodMatch::Only(m) => m == method,
        }
    }
}

impl fmt::Display for MethodMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodMatch::Any => f.write_str("*"),
            MethodMatch::Only(m) => write!(f, "{m}"),
        }
    }
}

/// Builder for one route.
///
/// ```rust
/// use hiweb::binder::ParamSpec;
/// use hiweb::router::Route;
/// use hiweb::RequestContext;
///
/// let entry = Route::new("/user/get", "POST")
///     .param(ParamSpec::int("id"))
///     .auth(true)
///     .to(|ctx: &mut RequestContext, id: i64| {
///         ctx.serve_body(200, id.to_string().as_bytes());
///     })
///     .expect("valid route");
/// assert!(entry.requires_auth);
/// ```
#[derive(Debug, Clone)]
pub struct Route {
    pattern: String,
    method: String,
    params: Vec<ParamSpec>,
    auth: bool,
}

impl Route {
    pub fn new(pattern: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            method: method.into(),
            params: Vec::new(),
            auth: false,
        }
    }

    /// Declare the next handler argument.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(specs);
        self
    }

    /// Require the auth gate for this route.
    pub fn auth(mut self, required: bool) -> Self {
        self.auth = required;
        self
    }

    /// Bind the handler. Fails on an empty pattern, a malformed method token,
    /// or declared parameters that do not match the handler's arguments.
    pub fn to<H, Args>(self, handler: H) -> Result<RouteEntry, RouteError>
    where
        H: Handler<Args>,
    {
        if self.pattern.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        let method = MethodMatch::parse(&self.method)?;
        let expected = <H as Handler<Args>>::kinds();
        let declared: Vec<ParamKind> = self.params.iter().map(|p| p.kind).collect();
        if declared != expected {
            return Err(RouteError::ParamMismatch {
                pattern: self.pattern,
                declared,
                expected,
            });
        }
        Ok(RouteEntry {
            pattern: self.pattern,
            method,
            params: self.params,
            requires_auth: self.auth,
            handler: handler::erase(handler),
        })
    }
}

/// A registered route.
pub struct RouteEntry {
    pub pattern: String,
    pub method: MethodMatch,
    pub params: Vec<ParamSpec>,
    pub requires_auth: bool,
    handler: RouteFn,
}

impl RouteEntry {
    /// Whether the pattern captures trailing positional segments.
    #[must_use]
    pub fn accepts_segments(&self) -> bool {
        self.pattern.ends_with('/')
    }

    /// Bind the declared parameters and call the handler.
    pub fn invoke(
        &self,
        ctx: &mut RequestContext,
        positional: &[String],
    ) -> Result<HandlerResult, BindError> {
        (self.handler)(ctx, &self.params, positional)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("requires_auth", &self.requires_auth)
            .finish_non_exhaustive()
    }
}

/// Result of resolving a path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub pattern: &'a str,
    pub entries: &'a [RouteEntry],
    /// Non-empty, percent-decoded path segments after a prefix pattern
    pub segments: Segments,
}

impl<'a> RouteMatch<'a> {
    /// The entry answering `method`: an exact method registration first,
    /// then a `*` registration.
    #[must_use]
    pub fn entry_for(&self, method: &Method) -> Option<&'a RouteEntry> {
        let entries = self.entries;
        entries
            .iter()
            .find(|e| matches!(&e.method, MethodMatch::Only(m) if m == method))
            .or_else(|| entries.iter().find(|e| e.method == MethodMatch::Any))
    }
}

/// Registered routes, built before serving and read-only afterwards.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<String, Vec<RouteEntry>>,
    /// Patterns ending in `/`, longest first
    prefixes: Vec<String>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. A (pattern, method) pair may be registered once.
    pub fn insert(&mut self, entry: RouteEntry) -> Result<(), RouteError> {
        let slot = self.routes.entry(entry.pattern.clone()).or_default();
        if slot.iter().any(|e| e.method == entry.method) {
            return Err(RouteError::Duplicate {
                pattern: entry.pattern,
                method: entry.method.to_string(),
            });
        }
        if entry.accepts_segments() && slot.is_empty() {
            self.prefixes.push(entry.pattern.clone());
            self.prefixes
                .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }
        info!(
            pattern = %entry.pattern,
            method = %entry.method,
            auth = entry.requires_auth,
            params = entry.params.len(),
            "route registered"
        );
        slot.push(entry);
        Ok(())
    }

    /// Find the routes for `path`: an exact pattern first, then the longest
    /// prefix pattern.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        if let Some((pattern, entries)) = self.routes.get_key_value(path) {
            return Some(RouteMatch {
                pattern,
                entries,
                segments: Segments::new(),
            });
        }
        let prefix = self.prefixes.iter().find(|p| path.starts_with(p.as_str()))?;
        let entries = self.routes.get(prefix)?;
        let segments = split_segments(&path[prefix.len()..]);
        debug!(path, prefix = %prefix, segments = segments.len(), "prefix route matched");
        Some(RouteMatch {
            pattern: prefix,
            entries,
            segments,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn split_segments(rest: &str) -> Segments {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect()
}
