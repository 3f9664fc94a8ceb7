use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use std::fmt;
use std::io::{Cursor, Read};
use std::net::SocketAddr;
use tracing::warn;

/// Inbound request as handed to the dispatcher by a transport.
///
/// The body is a one-shot reader; [`crate::context::RequestContext::body`]
/// drains and caches it.
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Path including the query string
    pub uri: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Transport-level peer address, if known
    pub peer_addr: Option<SocketAddr>,
    /// Request body stream
    pub body: Box<dyn Read + Send>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderMap::new(),
            peer_addr: None,
            body: Box::new(std::io::empty()),
        }
    }

    /// Append a header. Invalid names or values are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => warn!(header = %name, "dropping invalid request header"),
        }
        self
    }

    /// Use an in-memory body.
    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Box::new(Cursor::new(bytes.into()));
        self
    }

    /// Use a streaming body.
    pub fn reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.body = Box::new(reader);
        self
    }

    pub fn peer(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("/")
    }

    /// Raw query string, without the `?`.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, q)| q)
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("peer_addr", &self.peer_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let req = HttpRequest::new(Method::GET, "/a/b?x=1&y=2");
        assert_eq!(req.path(), "/a/b");
        assert_eq!(req.query(), Some("x=1&y=2"));
        assert_eq!(HttpRequest::new(Method::GET, "/a").query(), None);
    }

    #[test]
    fn test_invalid_header_dropped() {
        let req = HttpRequest::new(Method::GET, "/")
            .header("bad header", "x")
            .header("X-Ok", "1");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.headers.get("x-ok").unwrap(), "1");
    }
}
