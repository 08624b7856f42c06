//! HTTP authentication for the wgsync directory
//!
//! The directory protects its peer table with a shared bearer token. This crate
//! decides, from the value of the `Authorization` header, whether a request is
//! allowed through, lacks credentials (HTTP 401), or presents the wrong ones
//! (HTTP 403).
//!
//! # Usage
//!
//! ```
//! use wgsync_http_auth::{AuthResult, BearerTokenProvider, HttpAuthProvider};
//!
//! let provider = BearerTokenProvider::new(vec!["secret".to_string()]);
//!
//! assert!(matches!(provider.authenticate(Some("Bearer secret")), AuthResult::Authenticated));
//! assert!(matches!(provider.authenticate(None), AuthResult::Unauthorized(_)));
//! assert!(matches!(provider.authenticate(Some("Bearer nope")), AuthResult::Forbidden(_)));
//! ```

mod bearer;

pub use bearer::BearerTokenProvider;

use thiserror::Error;

/// Why a request was turned away
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header format, expected 'Bearer <token>'")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,
}

impl AuthError {
    /// Stable code reported in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "MISSING_AUTH",
            AuthError::InvalidFormat => "INVALID_AUTH_FORMAT",
            AuthError::InvalidToken => "INVALID_TOKEN",
        }
    }
}

/// Authentication result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// Credentials are valid
    Authenticated,
    /// No usable credentials were presented (401)
    Unauthorized(AuthError),
    /// Credentials were presented but are not accepted (403)
    Forbidden(AuthError),
}

/// Trait for request authentication providers
///
/// Providers are stateless; each call to `authenticate` is independent.
pub trait HttpAuthProvider: Send + Sync {
    /// Authenticate a request from its `Authorization` header value, if any
    fn authenticate(&self, authorization: Option<&str>) -> AuthResult;

    /// Value of the `WWW-Authenticate` header sent with 401 responses
    fn challenge(&self) -> &'static str;

    /// Return the authentication type name (for logging)
    fn auth_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            AuthError::MissingHeader.code(),
            AuthError::InvalidFormat.code(),
            AuthError::InvalidToken.code(),
        ];
        assert_eq!(
            codes.iter().collect::<std::collections::HashSet<_>>().len(),
            3
        );
    }
}
