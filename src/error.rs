//! # Error Module
//!
//! Error taxonomy shared by the dispatcher, the parameter binder, the auth gate
//! and the session store.
//!
//! Every failure a request can hit is a value of one of these types. The
//! dispatcher maps them to HTTP statuses at its boundary; none of them ever
//! escapes to terminate the serving process.
//!
//! | Error | Status | Meaning |
//! |-------|--------|---------|
//! | [`BindError`] | 400 | an argument could not be converted or a required field was missing |
//! | [`AuthError`] | 401 | missing/invalid/expired bearer token or custom hook rejection |
//! | [`WebError::MethodNotFound`] | 404 | the path matched but not the method |
//! | [`WebError::Forbidden`] | 404 | remote address is blocked (indistinguishable from "not found") |
//! | [`WebError::Fault`] | 400 | unexpected panic caught by the dispatch boundary |
//! | [`WebError::Handler`] | 500 | the handler returned an error and wrote no status |

use std::io;

use thiserror::Error;

/// Failure while converting request data into a handler argument.
#[derive(Debug, Error)]
pub enum BindError {
    /// A string value did not parse as an integer.
    #[error("argument {index} {value:?} convert int failed: {reason}")]
    InvalidInt {
        index: usize,
        value: String,
        reason: String,
    },

    /// The resolved value has a JSON type the target kind cannot accept.
    #[error("key:{name} val:{value} not support")]
    Unsupported { name: String, value: String },

    /// A JSON request did not contain the requested top-level key.
    #[error("not found:{0}")]
    NotFound(String),

    /// The body of a JSON request was empty or not JSON-shaped.
    #[error("input not json")]
    NotJson,

    /// The JSON body could not be decoded.
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form fields could not be mapped onto the target struct.
    #[error("form decode failed: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    /// The multipart body was malformed.
    #[error("multipart parse failed: {0}")]
    Multipart(String),

    /// The multipart body exceeded the configured bound.
    #[error("multipart body exceeds {limit} bytes")]
    MultipartTooLarge { limit: u64 },

    /// A populated struct was rejected by a validator.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Reading the request body failed.
    #[error("read body failed: {0}")]
    Body(#[from] io::Error),

    /// The route declared fewer parameter specs than the handler needs.
    #[error("argument {index} has no parameter spec")]
    MissingSpec { index: usize },
}

/// Rejection produced by the auth gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized access to this resource")]
    MissingToken,

    #[error("Token is malformed: {0}")]
    MalformedToken(String),

    #[error("Token is not valid")]
    InvalidToken,

    #[error("Token is expired")]
    ExpiredToken,

    /// Returned by a custom auth hook; the message is sent to the client.
    #[error("{0}")]
    Rejected(String),
}

/// Error raised by a [`crate::binder::Validator`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Route registration failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route pattern is empty")]
    EmptyPattern,

    #[error("invalid method token {0:?}")]
    InvalidMethod(String),

    #[error("route {pattern} {method} is already registered")]
    Duplicate { pattern: String, method: String },

    #[error("route {pattern} declares {declared:?} but the handler takes {expected:?}")]
    ParamMismatch {
        pattern: String,
        declared: Vec<crate::binder::ParamKind>,
        expected: Vec<crate::binder::ParamKind>,
    },
}

/// Session store failure. Lookups of unknown ids are not errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("sid is blank")]
    BlankId,

    #[error("session store is not initialised")]
    NotInitialized,
}

/// Failure while writing a response body.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("serialize response failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("write response failed: {0}")]
    Io(#[from] io::Error),
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },
}

/// Every way the dispatcher can refuse or abort a request, with the status
/// and body text it is answered with.
#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The path matched but no entry answers the method.
    #[error("no route for method {0}")]
    MethodNotFound(String),

    #[error("remote address {0} is blocked")]
    Forbidden(String),

    #[error("runtime fault: {0}")]
    Fault(String),

    /// The handler ran and returned an error.
    #[error("{0}")]
    Handler(anyhow::Error),
}

impl WebError {
    /// HTTP status the dispatcher answers with for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            WebError::Bind(_) | WebError::Fault(_) => 400,
            WebError::Auth(_) => 401,
            WebError::MethodNotFound(_) | WebError::Forbidden(_) => 404,
            WebError::Handler(_) => 500,
        }
    }

    /// Body sent to the client. Binding and panic details only go to the log.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            WebError::Bind(_) => "param error".to_string(),
            WebError::Fault(_) => "err param".to_string(),
            WebError::MethodNotFound(_) | WebError::Forbidden(_) => "not found".to_string(),
            WebError::Auth(e) => e.to_string(),
            WebError::Handler(e) => e.to_string(),
        }
    }
}
