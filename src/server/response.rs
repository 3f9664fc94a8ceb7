use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use tracing::{debug, warn};

/// Response sink owned by a request context.
///
/// The status is written at most once: the first non-zero code wins and later
/// writes are ignored, so a handler and the dispatcher never fight over it.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<u16>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status code. `0` leaves it unset. Returns whether the write
    /// took effect.
    pub fn write_status(&mut self, status: u16) -> bool {
        if status == 0 {
            return false;
        }
        if let Some(existing) = self.status {
            debug!(existing, ignored = status, "status already written");
            return false;
        }
        self.status = Some(status);
        true
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Insert or replace a header. Invalid names or values are dropped.
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
                true
            }
            _ => {
                warn!(header = %name, "dropping invalid response header");
                false
            }
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Append bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Discard everything written so far.
    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }

    /// Seal the response. An unset status becomes 200.
    #[must_use]
    pub fn finish(self) -> HttpResponse {
        HttpResponse {
            status: self.status.unwrap_or(200),
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Completed response handed back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
