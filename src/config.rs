//! # Configuration Module
//!
//! Process configuration consumed by the dispatcher, the auth gate, the response
//! pipeline and the session store.
//!
//! ## Overview
//!
//! [`WebConfig`] is an explicit value: build it once at startup, wrap it in an
//! `Arc` and hand it to [`crate::dispatcher::Dispatcher::new`]. Nothing in the
//! request path reads ambient state. A process-wide default is kept behind
//! [`global`] / [`set_global`] for ergonomic startup only.
//!
//! ## Sources
//!
//! Values are layered in this order, later layers winning:
//!
//! 1. [`WebConfig::default`]
//! 2. a YAML file ([`WebConfig::from_yaml_file`])
//! 3. environment variables ([`WebConfig::apply_env_overrides`])
//!
//! ```yaml
//! secret_key: change-me
//! enable_gzip: true
//! blocked_ips: ["203.0.113.7"]
//! max_multipart_bytes: 67108864
//! session_ttl_secs: 3600
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HIWEB_SECRET_KEY` | `secret_key` |
//! | `HIWEB_ENABLE_GZIP` | `enable_gzip` |
//! | `HIWEB_BLOCKED_IPS` | `blocked_ips` (comma separated) |
//! | `HIWEB_MAX_BODY_BYTES` | `max_body_bytes` |
//! | `HIWEB_MAX_MULTIPART_BYTES` | `max_multipart_bytes` |
//! | `HIWEB_SESSION_TTL_SECS` | `session_ttl_secs` |
//! | `HIWEB_SESSION_SWEEP_INTERVAL_SECS` | `session_sweep_interval_secs` |
//! | `HIWEB_HTTP_WORKERS` | `http_workers` |
//!
//! The configuration is read on every request and is never mutated by the core.
//! Mutating a shared instance after serving has started is the caller's
//! responsibility.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{AuthError, ConfigError};

/// Signing key used when nothing else is configured. Only fit for development.
pub const DEFAULT_SECRET_KEY: &str = "hiweb-development-secret";

/// Upper bound for multipart parsing (64 MiB).
pub const DEFAULT_MAX_MULTIPART_BYTES: u64 = 1 << 26;

/// Upper bound for reading any request body at the transport (64 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1 << 26;

/// Process-wide custom authentication hook.
///
/// When set, it replaces bearer-token verification for every route that
/// requires auth. Returning an error rejects the request with 401 and the
/// error text as body. The hook may attach claims with
/// [`RequestContext::set_claims`].
pub type AuthHook = Arc<dyn Fn(&mut RequestContext) -> Result<(), AuthError> + Send + Sync>;

/// Configuration shared by every request.
#[derive(Clone)]
pub struct WebConfig {
    /// HMAC secret for signing and verifying bearer tokens
    pub secret_key: String,
    /// Whether responses may be compressed when the client supports it
    pub enable_gzip: bool,
    /// Remote addresses answered with 404 regardless of route
    pub blocked_ips: HashSet<String>,
    /// Optional replacement for bearer-token verification
    pub auth_hook: Option<AuthHook>,
    /// Largest request body the transport adapter will read
    pub max_body_bytes: u64,
    /// Largest multipart body the binder will parse
    pub max_multipart_bytes: u64,
    /// Session lifetime used by [`crate::session::init_session`]
    pub session_ttl_secs: u64,
    /// Wake interval of the session sweeper
    pub session_sweep_interval_secs: u64,
    /// Worker threads pulling requests off the listener
    pub http_workers: usize,
    params: HashMap<String, Value>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            enable_gzip: true,
            blocked_ips: HashSet::new(),
            auth_hook: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_multipart_bytes: DEFAULT_MAX_MULTIPART_BYTES,
            session_ttl_secs: 3600,
            session_sweep_interval_secs: 600,
            http_workers: 4,
            params: HashMap::new(),
        }
    }
}

impl fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebConfig")
            .field("secret_key", &"<redacted>")
            .field("enable_gzip", &self.enable_gzip)
            .field("blocked_ips", &self.blocked_ips)
            .field("auth_hook", &self.auth_hook.is_some())
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_multipart_bytes", &self.max_multipart_bytes)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field(
                "session_sweep_interval_secs",
                &self.session_sweep_interval_secs,
            )
            .field("http_workers", &self.http_workers)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// On-disk shape of the YAML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    secret_key: Option<String>,
    enable_gzip: Option<bool>,
    blocked_ips: Option<Vec<String>>,
    max_body_bytes: Option<u64>,
    max_multipart_bytes: Option<u64>,
    session_ttl_secs: Option<u64>,
    session_sweep_interval_secs: Option<u64>,
    http_workers: Option<usize>,
    #[serde(default)]
    params: HashMap<String, Value>,
}

impl WebConfig {
    /// Parse a YAML document on top of the defaults.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_yaml::from_str(source)?;
        let mut config = Self::default();
        if let Some(v) = file.secret_key {
            config.secret_key = v;
        }
        if let Some(v) = file.enable_gzip {
            config.enable_gzip = v;
        }
        if let Some(v) = file.blocked_ips {
            config.blocked_ips = v.into_iter().collect();
        }
        if let Some(v) = file.max_body_bytes {
            config.max_body_bytes = v;
        }
        if let Some(v) = file.max_multipart_bytes {
            config.max_multipart_bytes = v;
        }
        if let Some(v) = file.session_ttl_secs {
            config.session_ttl_secs = v;
        }
        if let Some(v) = file.session_sweep_interval_secs {
            config.session_sweep_interval_secs = v;
        }
        if let Some(v) = file.http_workers {
            config.http_workers = v;
        }
        config.params = file.params;
        Ok(config)
    }

    /// Load a YAML file on top of the defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env_overrides()
    }

    /// Apply `HIWEB_*` environment variables on top of `self`.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HIWEB_SECRET_KEY") {
            self.secret_key = v;
        }
        if let Some(v) = lookup("HIWEB_ENABLE_GZIP") {
            self.enable_gzip = parse_env("HIWEB_ENABLE_GZIP", &v)?;
        }
        if let Some(v) = lookup("HIWEB_BLOCKED_IPS") {
            self.blocked_ips = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("HIWEB_MAX_BODY_BYTES") {
            self.max_body_bytes = parse_env("HIWEB_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("HIWEB_MAX_MULTIPART_BYTES") {
            self.max_multipart_bytes = parse_env("HIWEB_MAX_MULTIPART_BYTES", &v)?;
        }
        if let Some(v) = lookup("HIWEB_SESSION_TTL_SECS") {
            self.session_ttl_secs = parse_env("HIWEB_SESSION_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("HIWEB_SESSION_SWEEP_INTERVAL_SECS") {
            self.session_sweep_interval_secs =
                parse_env("HIWEB_SESSION_SWEEP_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("HIWEB_HTTP_WORKERS") {
            self.http_workers = parse_env("HIWEB_HTTP_WORKERS", &v)?;
        }
        Ok(self)
    }

    pub fn with_secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = secret.into();
        self
    }

    pub fn with_gzip(mut self, enabled: bool) -> Self {
        self.enable_gzip = enabled;
        self
    }

    pub fn block_ip(mut self, addr: impl Into<String>) -> Self {
        self.blocked_ips.insert(addr.into());
        self
    }

    pub fn with_auth_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), AuthError> + Send + Sync + 'static,
    {
        self.auth_hook = Some(Arc::new(hook));
        self
    }

    /// Store an arbitrary application parameter.
    pub fn set_param(&mut self, key: impl Into<String>, value: Value) {
        self.params.insert(key.into(), value);
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    #[must_use]
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

static GLOBAL: Lazy<ArcSwap<WebConfig>> = Lazy::new(|| ArcSwap::from_pointee(WebConfig::default()));

/// Process-wide default configuration.
#[must_use]
pub fn global() -> Arc<WebConfig> {
    GLOBAL.load_full()
}

/// Replace the process-wide default. Call before serving starts.
pub fn set_global(config: WebConfig) {
    GLOBAL.store(Arc::new(config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = WebConfig::default();
        assert!(c.enable_gzip);
        assert!(c.uses_default_secret());
        assert_eq!(c.max_multipart_bytes, 1 << 26);
        assert_eq!(c.session_sweep_interval(), Duration::from_secs(600));
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let c = WebConfig::from_yaml_str(
            "secret_key: s3cret\nenable_gzip: false\nblocked_ips: [\"10.1.1.1\"]\nparams:\n  site: demo\n",
        )
        .unwrap();
        assert_eq!(c.secret_key, "s3cret");
        assert!(!c.enable_gzip);
        assert!(c.blocked_ips.contains("10.1.1.1"));
        assert_eq!(c.param("site"), Some(&Value::from("demo")));
        assert_eq!(c.session_ttl_secs, 3600);
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        assert!(WebConfig::from_yaml_str("secret: x\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HIWEB_ENABLE_GZIP", "false"),
            ("HIWEB_BLOCKED_IPS", "1.2.3.4, 5.6.7.8,"),
            ("HIWEB_HTTP_WORKERS", "8"),
        ]
        .into_iter()
        .collect();
        let c = WebConfig::default()
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(!c.enable_gzip);
        assert_eq!(c.blocked_ips.len(), 2);
        assert_eq!(c.http_workers, 8);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = WebConfig::default()
            .apply_overrides(|k| (k == "HIWEB_SESSION_TTL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_params_bag() {
        let mut c = WebConfig::default();
        assert!(c.param("missing").is_none());
        c.set_param("limit", Value::from(10));
        assert_eq!(c.param("limit"), Some(&Value::from(10)));
    }
}
