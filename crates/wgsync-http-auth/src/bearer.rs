//! Bearer Token Authentication provider (RFC 6750)
//!
//! ```text
//! Authorization: Bearer <token>
//! ```

use crate::{AuthError, AuthResult, HttpAuthProvider};
use std::collections::HashSet;
use tracing::debug;

/// Validates bearer tokens against a set of accepted tokens
pub struct BearerTokenProvider {
    valid_tokens: HashSet<String>,
}

impl BearerTokenProvider {
    /// Create a new Bearer token provider
    ///
    /// Empty tokens are ignored so a blank token file can never authenticate
    /// a request.
    ///
    /// # Example
    /// ```
    /// use wgsync_http_auth::BearerTokenProvider;
    ///
    /// let provider = BearerTokenProvider::new(vec!["secret-token-123".to_string()]);
    /// ```
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            valid_tokens: tokens
                .into_iter()
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    /// Extract the token from an Authorization header value
    fn extract_token(auth_header: &str) -> Option<&str> {
        let scheme = auth_header.get(..7)?;
        if !scheme.eq_ignore_ascii_case("bearer ") {
            return None;
        }

        let token = auth_header[7..].trim();
        if token.is_empty() {
            return None;
        }

        Some(token)
    }
}

impl HttpAuthProvider for BearerTokenProvider {
    fn authenticate(&self, authorization: Option<&str>) -> AuthResult {
        let Some(header) = authorization else {
            debug!("Bearer auth: no Authorization header");
            return AuthResult::Unauthorized(AuthError::MissingHeader);
        };

        let Some(token) = Self::extract_token(header) else {
            debug!("Bearer auth: could not extract token");
            return AuthResult::Unauthorized(AuthError::InvalidFormat);
        };

        if self.valid_tokens.contains(token) {
            debug!("Bearer auth: valid token");
            AuthResult::Authenticated
        } else {
            debug!("Bearer auth: invalid token");
            AuthResult::Forbidden(AuthError::InvalidToken)
        }
    }

    fn challenge(&self) -> &'static str {
        "Bearer"
    }

    fn auth_type(&self) -> &'static str {
        "bearer"
    }
}
