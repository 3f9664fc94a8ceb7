//! HS256 bearer-token codec.
//!
//! The codec is agnostic to claim content: whatever map is signed comes back
//! from [`verify`]. Only `exp` is enforced, and only when present.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AuthError;

/// Claim set carried by a token or attached by a custom auth hook.
pub type Claims = Map<String, Value>;

/// Sign `claims` with HMAC-SHA256.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::MalformedToken(e.to_string()))
}

/// Verify signature and expiry, returning the claim set.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!(error = %e, "token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature => AuthError::InvalidToken,
            _ => AuthError::MalformedToken(e.to_string()),
        }
    })
}

/// Sign `claims` with `iat` set to now and `exp` set to now + `ttl`.
pub fn issue(mut claims: Claims, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    claims.insert("iat".into(), Value::from(now));
    claims.insert("exp".into(), Value::from(now + ttl.as_secs()));
    sign(&claims, secret)
}
