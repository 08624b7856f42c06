//! wgsync directory server
//!
//! Publishes the local interface's peer table as JSON so that a reconciler on
//! the other side of the tunnel can steer its own configuration toward it.
//! Intended to be bound to the tunnel-internal address only; the tunnel
//! already provides confidentiality, so the server speaks plain HTTP and
//! protects the table with a bearer token.

pub mod handlers;
pub mod middleware;

use axum::{middleware as axum_middleware, routing::get, Json, Router};
use std::collections::HashSet;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use wgsync_control::TunnelControl;
use wgsync_http_auth::BearerTokenProvider;
use wgsync_proto::PEERS_PATH;

/// Application state shared across handlers
pub struct AppState {
    /// Interface whose peers are published
    pub interface: String,
    pub control: Arc<dyn TunnelControl>,
    /// Public keys never published
    pub excluded_peers: HashSet<String>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "wgsync directory API",
        description = "Observed WireGuard peer table, published over the tunnel"
    ),
    paths(handlers::list_peers, handlers::health_check),
    components(schemas(
        wgsync_proto::ApiPeer,
        wgsync_proto::PeersResponse,
        wgsync_proto::ErrorResponse,
        wgsync_proto::HealthResponse,
    )),
    tags(
        (name = "peers", description = "Peer table"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

pub struct ApiServerConfig {
    pub bind_addr: SocketAddr,
    pub interface: String,
    /// Accepted bearer tokens
    pub tokens: Vec<String>,
    pub excluded_peers: Vec<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            interface: "wg0".to_string(),
            tokens: Vec::new(),
            excluded_peers: Vec::new(),
        }
    }
}

pub struct ApiServer {
    bind_addr: SocketAddr,
    state: Arc<AppState>,
    auth: Arc<middleware::AuthState>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, control: Arc<dyn TunnelControl>) -> Self {
        let state = Arc::new(AppState {
            interface: config.interface,
            control,
            excluded_peers: config.excluded_peers.into_iter().collect(),
        });
        let auth = Arc::new(middleware::AuthState::new(Arc::new(
            BearerTokenProvider::new(config.tokens),
        )));

        Self {
            bind_addr: config.bind_addr,
            state,
            auth,
        }
    }

    pub fn build_router(&self) -> Router {
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route(
                "/api/openapi.json",
                get(|| async { Json(ApiDoc::openapi()) }),
            )
            .with_state(self.state.clone());

        let protected_router = Router::new()
            .route(PEERS_PATH, get(handlers::list_peers))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.auth.clone(),
                middleware::require_bearer,
            ));

        public_router
            .merge(protected_router)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until the process stops
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!(
            "Publishing peers of {} on http://{}{}",
            self.state.interface,
            listener.local_addr()?,
            PEERS_PATH
        );
        if !self.state.excluded_peers.is_empty() {
            info!("Excluding {} peer(s) from the listing", self.state.excluded_peers.len());
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["paths"].get(PEERS_PATH).is_some());
        assert!(json["paths"].get("/api/health").is_some());
    }
}
