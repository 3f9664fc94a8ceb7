//! # Security Module
//!
//! The auth gate deciding whether a request may reach its handler.
//!
//! ## Overview
//!
//! For a route registered with `auth(true)` the gate runs before any parameter
//! is bound:
//!
//! 1. If [`crate::config::WebConfig::auth_hook`] is set, the hook runs with the
//!    request context; any error it returns rejects the request.
//! 2. Otherwise [`BearerJwtProvider`] extracts the token from `Authorization`,
//!    verifies it against the configured secret and attaches the claims.
//!
//! A rejection is answered with 401 and the error text; the handler never runs.
//!
//! ## Reading Claims
//!
//! ```rust,no_run
//! use hiweb::RequestContext;
//!
//! fn who_am_i(ctx: &mut RequestContext) {
//!     let name = ctx.claim("name").and_then(|v| v.as_str()).unwrap_or("guest").to_owned();
//!     ctx.serve_body(200, name.as_bytes());
//! }
//! ```
//!
//! An absent claim is `None`, never an error.
//!
//! ## Custom Hook
//!
//! ```rust
//! use hiweb::config::WebConfig;
//! use hiweb::error::AuthError;
//!
//! let config = WebConfig::default().with_auth_hook(|ctx| {
//!     match ctx.header("x-api-key") {
//!         Some("let-me-in") => Ok(()),
//!         _ => Err(AuthError::Rejected("bad api key".into())),
//!     }
//! });
//! # let _ = config;
//! ```

use crate::config::WebConfig;
use crate::context::RequestContext;
use crate::error::AuthError;
use tracing::error;

/// Progress of the auth gate for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authorized,
    Rejected(AuthError),
}

/// Something that can authenticate a request in place.
///
/// On success the provider may attach claims with
/// [`RequestContext::set_claims`].
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, ctx: &mut RequestContext) -> Result<(), AuthError>;
}

/// Run the gate for a request whose route requires auth.
///
/// Records the final [`AuthState`] on the context and returns the rejection,
/// if any.
pub fn authenticate(config: &WebConfig, ctx: &mut RequestContext) -> Result<(), AuthError> {
    ctx.set_auth_state(AuthState::Authenticating);
    let outcome = match &config.auth_hook {
        Some(hook) => hook(ctx),
        None => BearerJwtProvider::new(config.secret_key.as_str()).authenticate(ctx),
    };
    match outcome {
        Ok(()) => {
            ctx.set_auth_state(AuthState::Authorized);
            Ok(())
        }
        Err(e) => {
            error!(
                method = %ctx.method(),
                path = %ctx.path(),
                ip = %ctx.remote_addr(),
                error = %e,
                "auth rejected"
            );
            ctx.set_auth_state(AuthState::Rejected(e.clone()));
            Err(e)
        }
    }
}

pub use bearer_jwt::BearerJwtProvider;

mod bearer_jwt;
pub mod token;
