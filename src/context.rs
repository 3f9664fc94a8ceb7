//! # Request Context Module
//!
//! Per-request state shared by the auth gate, the binder, the handler and the
//! response pipeline.
//!
//! ## Body Caching
//!
//! The transport hands over a one-shot body stream. [`RequestContext::body`]
//! drains it on first use (bounded by `max_body_bytes`) and returns the cached
//! bytes on every later call, whoever asked first.
//!
//! ## Unified Input
//!
//! [`RequestContext::query`] resolves a named value in this order:
//!
//! 1. a non-empty form or query-string value
//! 2. JSON content: the body parsed once into a flat top-level map
//! 3. multipart content: the multipart form parsed (bounded), then step 1 again
//! 4. urlencoded content: the trimmed body parsed as a query string
//! 5. otherwise an empty string
//!
//! A caller-supplied default replaces a missing value. Without one, a missing
//! key is an error only for JSON content; every other content type yields an
//! empty string.

use std::collections::HashMap;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::{debug, error};

use crate::binder::{self, Validate, Validator};
use crate::config::WebConfig;
use crate::error::BindError;
use crate::ids::RequestId;
use crate::security::token::Claims;
use crate::security::AuthState;
use crate::server::{HttpRequest, HttpResponse, ResponseWriter};

/// Trailing path segments captured by a prefix route.
pub type Segments = SmallVec<[String; 4]>;

/// Form values keyed by field name, in arrival order.
pub type FormValues = HashMap<String, Vec<String>>;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Whether `body` looks like a JSON object or array.
#[must_use]
pub fn is_json_body(body: &[u8]) -> bool {
    body.len() > 2 && (body[0] == b'{' || body[0] == b'[')
}

pub(crate) fn is_json_content(content_type: &str) -> bool {
    content_type.starts_with("application/json") || content_type.starts_with("application/*+json")
}

pub(crate) fn is_multipart_content(content_type: &str) -> bool {
    content_type.starts_with("multipart/form-data")
}

pub(crate) fn is_urlencoded_content(content_type: &str) -> bool {
    content_type.starts_with("application/x-www-form-urlencoded")
}

/// Request and response state for one dispatched request.
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: String,
    headers: HeaderMap,
    peer_addr: Option<SocketAddr>,
    body_reader: Option<Box<dyn Read + Send>>,
    body_cache: Option<Vec<u8>>,
    body_error: Option<(io::ErrorKind, String)>,
    form: Option<FormValues>,
    multipart_parsed: bool,
    files: HashMap<String, Vec<UploadedFile>>,
    json_params: Option<Map<String, Value>>,
    claims: Claims,
    auth_state: AuthState,
    segments: Segments,
    config: Arc<WebConfig>,
    response: ResponseWriter,
}

impl RequestContext {
    pub fn new(req: HttpRequest, config: Arc<WebConfig>) -> Self {
        let request_id = RequestId::from_header_or_new(
            req.headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        );
        Self {
            request_id,
            method: req.method,
            uri: req.uri,
            headers: req.headers,
            peer_addr: req.peer_addr,
            body_reader: Some(req.body),
            body_cache: None,
            body_error: None,
            form: None,
            multipart_parsed: false,
            files: HashMap::new(),
            json_params: None,
            claims: Claims::new(),
            auth_state: AuthState::default(),
            segments: Segments::new(),
            config,
            response: ResponseWriter::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.split('?').next().unwrap_or("/")
    }

    #[must_use]
    pub fn query_string(&self) -> &str {
        self.uri.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Header value by name, case-insensitive.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or("")
    }

    /// Client address: the first `X-Forwarded-For` entry when present,
    /// otherwise the peer IP without its port.
    #[must_use]
    pub fn remote_addr(&self) -> String {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
                return first.to_string();
            }
        }
        self.peer_addr
            .map(|a| a.ip().to_string())
            .unwrap_or_default()
    }

    /// Whether the resolved remote address is a loopback address.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        let addr = self.remote_addr();
        addr == "localhost" || addr.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
    }

    /// The full request body, read once and cached.
    ///
    /// A failed read is cached too: every later call returns the same error.
    pub fn body(&mut self) -> io::Result<&[u8]> {
        if let Some((kind, message)) = &self.body_error {
            return Err(io::Error::new(*kind, message.clone()));
        }
        if self.body_cache.is_none() {
            match self.read_body() {
                Ok(buf) => self.body_cache = Some(buf),
                Err(e) => {
                    self.body_error = Some((e.kind(), e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(self.body_cache.as_deref().unwrap_or_default())
    }

    fn read_body(&mut self) -> io::Result<Vec<u8>> {
        let limit = self.config.max_body_bytes;
        let mut buf = Vec::new();
        if let Some(reader) = self.body_reader.take() {
            reader.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
        }
        if buf.len() as u64 > limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("request body exceeds {limit} bytes"),
            ));
        }
        Ok(buf)
    }

    /// Query-string values merged with urlencoded body values for
    /// POST, PUT and PATCH. Body values come first.
    ///
    /// Fails when the body of a form request cannot be read.
    pub fn input(&mut self) -> Result<&FormValues, BindError> {
        if self.form.is_none() {
            let mut form = FormValues::new();
            let has_form_body = matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
                && is_urlencoded_content(self.content_type());
            if has_form_body {
                let request_id = self.request_id;
                let body = self.body().inspect_err(|e| {
                    error!(request_id = %request_id, error = %e, "parse form body failed");
                })?;
                for (k, v) in url::form_urlencoded::parse(body) {
                    form.entry(k.into_owned()).or_default().push(v.into_owned());
                }
            }
            for (k, v) in url::form_urlencoded::parse(self.query_string().as_bytes()) {
                form.entry(k.into_owned()).or_default().push(v.into_owned());
            }
            self.form = Some(form);
        }
        Ok(self.form.get_or_insert_with(FormValues::new))
    }

    /// First form or query value for `key`, or an empty string.
    pub fn param(&mut self, key: &str) -> Result<String, BindError> {
        Ok(self
            .input()?
            .get(key)
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_default())
    }

    /// Parse the body into the flat JSON parameter map, at most once.
    ///
    /// An empty or non-JSON-shaped body leaves the map empty.
    pub fn parse_json(&mut self) -> Result<(), BindError> {
        if self.json_params.is_some() {
            return Ok(());
        }
        self.json_params = Some(Map::new());
        let body = self.body()?.trim_ascii();
        if body.is_empty() || !is_json_body(body) {
            return Ok(());
        }
        let parsed: Map<String, Value> = serde_json::from_slice(body)?;
        self.json_params = Some(parsed);
        Ok(())
    }

    #[must_use]
    pub fn json_params(&self) -> Option<&Map<String, Value>> {
        self.json_params.as_ref()
    }

    /// Parse a multipart body into form values and files, at most once.
    pub fn parse_multipart(&mut self) -> Result<(), BindError> {
        if self.multipart_parsed {
            return Ok(());
        }
        self.multipart_parsed = true;

        let limit = self.config.max_multipart_bytes;
        let boundary = multer::parse_boundary(self.content_type())
            .map_err(|e| BindError::Multipart(e.to_string()))?;
        let body = self.body()?;
        if body.len() as u64 > limit {
            return Err(BindError::MultipartTooLarge { limit });
        }
        let chunk = Bytes::copy_from_slice(body);

        let stream = futures::stream::iter([Ok::<Bytes, io::Error>(chunk)]);
        let constraints =
            multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
        let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);

        let parts = futures::executor::block_on(async move {
            let mut parts = Vec::new();
            while let Some(field) = multipart.next_field().await? {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(ToString::to_string);
                let data = field.bytes().await?;
                parts.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            Ok::<_, multer::Error>(parts)
        })
        .map_err(|e| match e {
            multer::Error::StreamSizeExceeded { limit } => BindError::MultipartTooLarge { limit },
            other => BindError::Multipart(other.to_string()),
        })?;

        self.input()?;
        let form = self.form.get_or_insert_with(FormValues::new);
        for part in parts {
            if part.file_name.is_some() {
                self.files.entry(part.field.clone()).or_default().push(part);
            } else {
                let value = String::from_utf8_lossy(&part.data).into_owned();
                form.entry(part.field).or_default().push(value);
            }
        }
        debug!(
            request_id = %self.request_id,
            fields = form.len(),
            files = self.files.len(),
            "multipart parsed"
        );
        Ok(())
    }

    /// First uploaded file for a multipart field.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|f| f.first())
    }

    #[must_use]
    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Resolve `key` across form, JSON, multipart and urlencoded input.
    pub fn query(&mut self, key: &str, default: Option<Value>) -> Result<Value, BindError> {
        let found = self.lookup(key)?;
        match (found, default) {
            (Some(v), _) => Ok(v),
            (None, Some(d)) => Ok(d),
            (None, None) if is_json_content(self.content_type()) => {
                Err(BindError::NotFound(key.to_string()))
            }
            (None, None) => Ok(Value::String(String::new())),
        }
    }

    fn lookup(&mut self, key: &str) -> Result<Option<Value>, BindError> {
        let v = self.param(key)?;
        if !v.is_empty() {
            return Ok(Some(Value::String(v)));
        }

        let content_type = self.content_type().to_string();
        if is_json_content(&content_type) {
            self.parse_json()?;
            return Ok(self.json_params.as_ref().and_then(|m| m.get(key)).cloned());
        }
        if is_multipart_content(&content_type) {
            self.parse_multipart()?;
            let v = self.param(key)?;
            return Ok((!v.is_empty()).then_some(Value::String(v)));
        }
        if is_urlencoded_content(&content_type) {
            let body = self.body()?.trim_ascii();
            let v = url::form_urlencoded::parse(body)
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty());
            return Ok(v.map(Value::String));
        }
        Ok(None)
    }

    /// `key` as a string, falling back to `default` when missing.
    pub fn get_string(&mut self, key: &str, default: Option<&str>) -> Result<String, BindError> {
        let v = self.query(key, default.map(Value::from))?;
        binder::value_to_string(key, &v)
    }

    /// `key` as an integer, falling back to `default` when missing.
    pub fn get_int(&mut self, key: &str, default: Option<i64>) -> Result<i64, BindError> {
        let v = self.query(key, default.map(Value::from))?;
        binder::value_to_int(0, key, &v)
    }

    /// Every value submitted for `key`, as from a checkbox group or a
    /// multi-select.
    pub fn get_strings(
        &mut self,
        key: &str,
        default: Option<Vec<String>>,
    ) -> Result<Vec<String>, BindError> {
        let mut values = self.input()?.get(key).cloned().unwrap_or_default();
        let content_type = self.content_type().to_string();
        if values.is_empty() && is_multipart_content(&content_type) {
            self.parse_multipart()?;
            values = self.input()?.get(key).cloned().unwrap_or_default();
        }
        if values.is_empty() && is_json_content(&content_type) {
            self.parse_json()?;
            if let Some(Value::Array(items)) = self.json_params.as_ref().and_then(|m| m.get(key)) {
                values = items
                    .iter()
                    .map(|item| binder::value_to_string(key, item))
                    .collect::<Result<_, _>>()?;
            }
        }
        if values.is_empty() {
            return Ok(default.unwrap_or_default());
        }
        Ok(values)
    }

    /// Populate `T` from the body according to content type, then run
    /// `validators` in order. The first failure aborts.
    pub fn parse_valid<T: DeserializeOwned>(
        &mut self,
        validators: &[&dyn Validator<T>],
    ) -> Result<T, BindError> {
        let content_type = self.content_type().to_string();
        let value: T = if is_json_content(&content_type) {
            let body = self.body()?.trim_ascii();
            if body.is_empty() || !is_json_body(body) {
                return Err(BindError::NotJson);
            }
            serde_json::from_slice(body)?
        } else {
            if is_multipart_content(&content_type) {
                self.parse_multipart()?;
            }
            binder::form_to_struct(self.input()?)?
        };
        for v in validators {
            v.validate(&value)?;
        }
        Ok(value)
    }

    /// [`parse_valid`](Self::parse_valid) followed by the type's own
    /// [`Validate`] rules.
    pub fn parse_check<T: DeserializeOwned + Validate>(&mut self) -> Result<T, BindError> {
        let value: T = self.parse_valid(&[])?;
        value.validate()?;
        Ok(value)
    }

    /// A verified claim, or `None` when absent.
    #[must_use]
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn set_claims(&mut self, claims: Claims) {
        self.claims = claims;
    }

    #[must_use]
    pub fn auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    pub(crate) fn set_auth_state(&mut self, state: AuthState) {
        self.auth_state = state;
    }

    /// Trailing path segments captured by a prefix route.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub(crate) fn set_segments(&mut self, segments: Segments) {
        self.segments = segments;
    }

    /// Insert or replace a response header.
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.response.set_header(key, value);
    }

    #[must_use]
    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        self.response.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(req: HttpRequest) -> RequestContext {
        RequestContext::new(req, Arc::new(WebConfig::default()))
    }

    fn post(content_type: &str, body: &str) -> RequestContext {
        ctx(HttpRequest::new(Method::POST, "/x")
            .header("Content-Type", content_type)
            .body(body))
    }

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_body_is_read_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            inner: Cursor::new(b"payload".to_vec()),
            reads: reads.clone(),
        };
        let mut c = ctx(HttpRequest::new(Method::POST, "/").reader(reader));
        let first = c.body().unwrap().to_vec();
        let after_first = reads.load(Ordering::SeqCst);
        let second = c.body().unwrap().to_vec();
        assert_eq!(first, b"payload");
        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn test_body_limit() {
        let mut config = WebConfig::default();
        config.max_body_bytes = 4;
        let mut c = RequestContext::new(
            HttpRequest::new(Method::POST, "/").body("too long"),
            Arc::new(config),
        );
        assert!(c.body().is_err());
    }

    #[test]
    fn test_body_error_is_cached() {
        let mut config = WebConfig::default();
        config.max_body_bytes = 4;
        let mut c = RequestContext::new(
            HttpRequest::new(Method::POST, "/").body("too long"),
            Arc::new(config),
        );
        let first = c.body().unwrap_err();
        let second = c.body().unwrap_err();
        assert_eq!(first.kind(), io::ErrorKind::InvalidData);
        assert_eq!(second.kind(), first.kind());
        assert_eq!(second.to_string(), first.to_string());
    }

    #[test]
    fn test_unreadable_form_body_fails_binding() {
        let mut config = WebConfig::default();
        config.max_body_bytes = 4;
        let mut c = RequestContext::new(
            HttpRequest::new(Method::POST, "/x")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body("name=alice"),
            Arc::new(config),
        );
        assert!(matches!(c.input(), Err(BindError::Body(_))));
        assert!(matches!(c.query("name", None), Err(BindError::Body(_))));
        assert!(matches!(
            c.get_string("name", Some("fallback")),
            Err(BindError::Body(_))
        ));
    }

    #[test]
    fn test_param_reads_query_string() {
        let mut c = ctx(HttpRequest::new(Method::GET, "/x?a=1&a=2"));
        assert_eq!(c.param("a").unwrap(), "1");
        assert_eq!(c.param("b").unwrap(), "");
    }

    #[test]
    fn test_remote_addr_prefers_forwarded() {
        let c = ctx(HttpRequest::new(Method::GET, "/")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .peer("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(c.remote_addr(), "203.0.113.9");
        assert!(!c.is_loopback());

        let c = ctx(HttpRequest::new(Method::GET, "/").peer("127.0.0.1:5000".parse().unwrap()));
        assert_eq!(c.remote_addr(), "127.0.0.1");
        assert!(c.is_loopback());
    }

    #[test]
    fn test_is_json_body() {
        assert!(is_json_body(b"{\"a\":1}"));
        assert!(is_json_body(b"[1,2]"));
        assert!(!is_json_body(b"{}"));
        assert!(!is_json_body(b"abc"));
    }

    #[test]
    fn test_query_json() {
        let mut c = post("application/json", r#"{"name":"bob","age":30}"#);
        assert_eq!(c.query("name", None).unwrap(), json!("bob"));
        assert_eq!(c.query("age", None).unwrap(), json!(30));
        assert!(matches!(c.query("missing", None), Err(BindError::NotFound(_))));
        assert_eq!(c.query("missing", Some(json!(7))).unwrap(), json!(7));
    }

    #[test]
    fn test_query_json_value_wins_over_default() {
        let mut c = post("application/json", r#"{"name":"bob"}"#);
        assert_eq!(c.query("name", Some(json!("dflt"))).unwrap(), json!("bob"));
        let mut c = post("application/json", r#"{"name": oops}"#);
        assert!(matches!(
            c.query("name", Some(json!("dflt"))),
            Err(BindError::Json(_))
        ));
    }

    #[test]
    fn test_query_json_empty_body_is_failure() {
        let mut c = post("application/json", "");
        assert!(c.query("name", None).is_err());
        let mut c = post("application/json", "not json");
        assert!(c.query("name", None).is_err());
    }

    #[test]
    fn test_query_form_missing_is_empty() {
        let mut c = post("application/x-www-form-urlencoded", "a=1");
        assert_eq!(c.query("a", None).unwrap(), json!("1"));
        assert_eq!(c.query("b", None).unwrap(), json!(""));
        assert_eq!(c.query("b", Some(json!("d"))).unwrap(), json!("d"));
    }

    #[test]
    fn test_query_string_wins() {
        let mut c = ctx(HttpRequest::new(Method::POST, "/x?name=q")
            .header("Content-Type", "application/json")
            .body(r#"{"name":"body"}"#));
        assert_eq!(c.query("name", None).unwrap(), json!("q"));
    }

    #[test]
    fn test_urlencoded_body_on_get() {
        let mut c = ctx(HttpRequest::new(Method::GET, "/x")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(" k=v "));
        assert_eq!(c.query("k", None).unwrap(), json!("v"));
    }

    #[test]
    fn test_get_strings_multi_value() {
        let mut c = post("application/x-www-form-urlencoded", "c=a&c=b");
        assert_eq!(c.get_strings("c", None).unwrap(), vec!["a", "b"]);
        assert!(c.get_strings("none", None).unwrap().is_empty());
    }

    #[test]
    fn test_multipart_fields_and_files() {
        let body = "--XB\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            hello\r\n\
            --XB\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            file body\r\n\
            --XB--\r\n";
        let mut c = post("multipart/form-data; boundary=XB", body);
        assert_eq!(c.query("title", None).unwrap(), json!("hello"));
        let file = c.file("doc").unwrap();
        assert_eq!(file.file_name.as_deref(), Some("a.txt"));
        assert_eq!(&file.data[..], b"file body");
    }

    #[test]
    fn test_multipart_limit() {
        let mut config = WebConfig::default();
        config.max_multipart_bytes = 8;
        let mut c = RequestContext::new(
            HttpRequest::new(Method::POST, "/")
                .header("Content-Type", "multipart/form-data; boundary=XB")
                .body("--XB\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--XB--\r\n"),
            Arc::new(config),
        );
        assert!(matches!(
            c.parse_multipart(),
            Err(BindError::MultipartTooLarge { limit: 8 })
        ));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        user: String,
        age: i64,
    }

    #[test]
    fn test_parse_valid_json_and_form() {
        let mut c = post("application/json", r#"{"user":"x","age":3}"#);
        let v: Login = c.parse_valid(&[]).unwrap();
        assert_eq!(v, Login { user: "x".into(), age: 3 });

        let mut c = post("application/x-www-form-urlencoded", "user=y&age=4");
        let v: Login = c.parse_valid(&[]).unwrap();
        assert_eq!(v, Login { user: "y".into(), age: 4 });
    }

    #[test]
    fn test_parse_valid_rejects_non_json_shape() {
        let mut c = post("application/json", "   ");
        assert!(matches!(c.parse_valid::<Login>(&[]), Err(BindError::NotJson)));
    }

    #[test]
    fn test_claim_absent_is_none() {
        let mut c = post("text/plain", "");
        assert!(c.claim("name").is_none());
        let mut claims = Claims::new();
        claims.insert("name".into(), json!("admin"));
        c.set_claims(claims);
        assert_eq!(c.claim("name"), Some(&json!("admin")));
    }
}
