//! Bearer authentication middleware
//!
//! Missing or malformed credentials get 401 with a `WWW-Authenticate`
//! challenge; a well-formed but unknown token gets 403.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::warn;
use wgsync_http_auth::{AuthError, AuthResult, HttpAuthProvider};
use wgsync_proto::ErrorResponse;

/// Authentication state shared across middleware instances
#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<dyn HttpAuthProvider>,
}

impl AuthState {
    pub fn new(provider: Arc<dyn HttpAuthProvider>) -> Self {
        Self { provider }
    }
}

fn error_body(err: &AuthError) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: err.to_string(),
        code: Some(err.code().to_string()),
    })
}

pub async fn require_bearer(
    State(state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    // A header that is not valid UTF-8 is malformed, not missing.
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or(""));

    match state.provider.authenticate(authorization) {
        AuthResult::Authenticated => next.run(request).await,
        AuthResult::Unauthorized(err) => {
            warn!(
                path = %request.uri().path(),
                auth = state.provider.auth_type(),
                "Rejected request: {}",
                err
            );
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, state.provider.challenge())],
                error_body(&err),
            )
                .into_response()
        }
        AuthResult::Forbidden(err) => {
            warn!(
                path = %request.uri().path(),
                auth = state.provider.auth_type(),
                "Rejected request: {}",
                err
            );
            (StatusCode::FORBIDDEN, error_body(&err)).into_response()
        }
    }
}
