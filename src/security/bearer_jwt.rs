use crate::context::RequestContext;
use crate::error::AuthError;
use crate::security::token::{self, Claims};
use crate::security::AuthProvider;
use tracing::debug;

/// Bearer provider that verifies HS256 tokens from the `Authorization` header.
///
/// The header may carry `Bearer <token>` (scheme matched case-insensitively)
/// or the bare token. Verified claims are attached to the request context.
pub struct BearerJwtProvider {
    secret: String,
}

impl BearerJwtProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Pull the token out of an `Authorization` header value.
    #[must_use]
    pub fn extract_token(header: &str) -> Option<&str> {
        let header = header.trim_start();
        let token = match header.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => header[7..].trim(),
            _ => header.trim_end(),
        };
        (!token.is_empty()).then_some(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        token::verify(token, &self.secret)
    }
}

impl AuthProvider for BearerJwtProvider {
    fn authenticate(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        let token = match ctx.header("authorization").and_then(Self::extract_token) {
            Some(t) => t.to_string(),
            None => {
                debug!("bearer validation failed: missing Authorization header");
                return Err(AuthError::MissingToken);
            }
        };
        let claims = self.validate_token(&token)?;
        debug!("bearer validation succeeded");
        ctx.set_claims(claims);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_variants() {
        assert_eq!(BearerJwtProvider::extract_token("Bearer abc"), Some("abc"));
        assert_eq!(BearerJwtProvider::extract_token("bearer abc"), Some("abc"));
        assert_eq!(BearerJwtProvider::extract_token("BEARER  abc"), Some("abc"));
        assert_eq!(BearerJwtProvider::extract_token("abc"), Some("abc"));
        assert_eq!(BearerJwtProvider::extract_token("Bearer "), None);
        assert_eq!(BearerJwtProvider::extract_token(""), None);
    }
}
