//! # Response Module
//!
//! Status, header and body emission for handlers.
//!
//! ## Compression
//!
//! [`RequestContext::serve_body`] compresses only when
//! [`crate::config::WebConfig::enable_gzip`] is set and the client's
//! `Accept-Encoding` allows it. `gzip` is preferred over `deflate` on equal
//! quality; `*` selects gzip; `q=0` excludes an encoding. `Content-Length`
//! always reflects the bytes actually sent.
//!
//! ## Status
//!
//! A status of `0` leaves the status unset so the transport default (200)
//! applies. Only the first status written for a request takes effect.
//!
//! ## JSON
//!
//! [`RequestContext::json`] can re-encode every non-ASCII character as a
//! `\uXXXX` escape (surrogate pairs above U+FFFF) for clients that mishandle
//! raw UTF-8. The result is still valid JSON.

use std::io::Write;
use std::path::Path;

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::Serialize;
use tracing::{debug, error};

use crate::context::RequestContext;
use crate::error::ResponseError;

/// Content coding negotiated for a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }
}

/// Pick a content coding from an `Accept-Encoding` header value.
#[must_use]
pub fn negotiate_encoding(accept: &str) -> Option<Encoding> {
    let mut gzip: Option<f32> = None;
    let mut deflate: Option<f32> = None;
    let mut wildcard: Option<f32> = None;

    for item in accept.split(',') {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let mut q = 1.0_f32;
        for param in parts {
            if let Some((k, v)) = param.split_once('=') {
                if k.trim().eq_ignore_ascii_case("q") {
                    // Unparsable or non-finite weights exclude the coding.
                    q = v
                        .trim()
                        .parse::<f32>()
                        .ok()
                        .filter(|q| q.is_finite())
                        .unwrap_or(0.0);
                }
            }
        }
        match coding.as_str() {
            "gzip" | "x-gzip" => gzip = Some(q),
            "deflate" => deflate = Some(q),
            "*" => wildcard = Some(q),
            _ => {}
        }
    }

    let gzip = gzip.or(wildcard).unwrap_or(0.0);
    let deflate = deflate.unwrap_or(0.0);
    if gzip <= 0.0 && deflate <= 0.0 {
        None
    } else if gzip >= deflate {
        Some(Encoding::Gzip)
    } else {
        Some(Encoding::Deflate)
    }
}

/// Compress `content` with `encoding`.
pub fn encode_body(encoding: Encoding, content: &[u8]) -> std::io::Result<Vec<u8>> {
    match encoding {
        Encoding::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(content)?;
            enc.finish()
        }
        Encoding::Deflate => {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(content)?;
            enc.finish()
        }
    }
}

/// Replace every non-ASCII character with a `\uXXXX` escape.
#[must_use]
pub fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

const DOWNLOAD_HEADERS: [(&str, &str); 6] = [
    ("Content-Description", "File Transfer"),
    ("Content-Type", "application/octet-stream"),
    ("Content-Transfer-Encoding", "binary"),
    ("Expires", "0"),
    ("Cache-Control", "must-revalidate"),
    ("Pragma", "public"),
];

impl RequestContext {
    /// Write `content`, compressed when negotiated, with `status` (0 = unset).
    pub fn serve_body(&mut self, status: u16, content: &[u8]) {
        let encoding = if self.config().enable_gzip {
            self.header("accept-encoding").and_then(negotiate_encoding)
        } else {
            None
        };

        let encoded = encoding.and_then(|enc| match encode_body(enc, content) {
            Ok(bytes) => Some((enc, bytes)),
            Err(e) => {
                error!(request_id = %self.request_id(), error = %e, "compress response failed");
                None
            }
        });

        let response = self.response_mut();
        match encoded {
            Some((enc, bytes)) => {
                response.set_header("Content-Encoding", enc.as_str());
                response.set_header("Content-Length", &bytes.len().to_string());
                response.write_status(status);
                response.write(&bytes);
            }
            None => {
                response.set_header("Content-Length", &content.len().to_string());
                response.write_status(status);
                response.write(content);
            }
        }
    }

    /// Serialize `data` as JSON and serve it.
    ///
    /// On a serialization failure a 500 with the error text is written and the
    /// error returned.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        data: &T,
        indent: bool,
        escape: bool,
    ) -> Result<(), ResponseError> {
        self.set_header("Content-Type", "application/json; charset=utf-8");
        let encoded = if indent {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        let content = match encoded {
            Ok(s) => s,
            Err(e) => {
                let response = self.response_mut();
                response.set_header("Content-Type", "text/plain; charset=utf-8");
                response.write_status(500);
                response.write(e.to_string().as_bytes());
                return Err(e.into());
            }
        };
        let content = if escape {
            escape_non_ascii(&content)
        } else {
            content
        };
        self.serve_body(status, content.as_bytes());
        Ok(())
    }

    /// Pretty-printed JSON without escaping.
    pub fn serve_json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        data: &T,
    ) -> Result<(), ResponseError> {
        self.json(status, data, true, false)
    }

    /// Serve a file from disk as an attachment named `filename`, or the file's
    /// own name when `filename` is `None` or empty. An unreadable file is
    /// answered with 404.
    pub fn serve_download(
        &mut self,
        path: impl AsRef<Path>,
        filename: Option<&str>,
    ) -> Result<(), ResponseError> {
        let path = path.as_ref();
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "download file unreadable");
                self.not_found();
                self.response_mut().write(b"404 page not found");
                return Err(e.into());
            }
        };
        let name = match filename {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        self.serve_download_content(200, &content, &name);
        Ok(())
    }

    /// Serve in-memory bytes as an attachment.
    pub fn serve_download_content(&mut self, status: u16, content: &[u8], filename: &str) {
        let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes()).collect();
        self.set_header(
            "Content-Disposition",
            &format!("attachment; filename={encoded}"),
        );
        for (k, v) in DOWNLOAD_HEADERS {
            self.set_header(k, v);
        }
        self.serve_body(status, content);
    }

    pub fn forbidden(&mut self) {
        self.response_mut().write_status(403);
    }

    pub fn not_found(&mut self) {
        self.response_mut().write_status(404);
    }

    pub fn internal_server_error(&mut self) {
        self.response_mut().write_status(500);
    }
}
