use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error};
use wgsync_proto::{parse_dump, ApiPeer, ErrorResponse, HealthResponse, PeersResponse};

use crate::AppState;

/// List the observed peers of the published interface
#[utoipa::path(
    get,
    path = "/api/peers",
    responses(
        (status = 200, description = "Current peer table", body = PeersResponse),
        (status = 401, description = "Missing or malformed bearer token", body = ErrorResponse),
        (status = 403, description = "Unknown bearer token", body = ErrorResponse),
        (status = 500, description = "Peer table could not be read", body = ErrorResponse)
    ),
    tag = "peers"
)]
pub async fn list_peers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PeersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let dump = state
        .control
        .read_status(&state.interface)
        .await
        .map_err(|e| {
            error!(interface = %state.interface, "Failed to read peer table: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: None,
                }),
            )
        })?;

    let peers: Vec<ApiPeer> = parse_dump(&dump)
        .values()
        .filter(|peer| !state.excluded_peers.contains(&peer.public_key))
        .map(ApiPeer::from)
        .collect();

    debug!(interface = %state.interface, peers = peers.len(), "Serving peer table");

    Ok(Json(PeersResponse {
        interface: state.interface.clone(),
        fetched_at: chrono::Utc::now().timestamp(),
        peers,
    }))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        interface: state.interface.clone(),
    })
}
