//! Directory client

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wgsync_proto::{ErrorResponse, PeerSet, PeersResponse};

/// Maximum number of body bytes kept in a status error
const MAX_ERROR_BODY: usize = 512;

/// Fetch failures; all of them are retried with backoff
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid directory response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid directory URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    /// The directory rejected our credentials (401/403).
    ///
    /// Retrying with the same token will keep failing, but the loop still
    /// retries on the normal backoff path.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, FetchError::Status { status: 401 | 403, .. })
    }
}

/// Source of the authoritative peer set
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn fetch_peers(&self) -> Result<PeerSet, FetchError>;
}

/// HTTP client for the directory's `GET /api/peers`
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    url: Url,
    token: String,
}

impl HttpDirectoryClient {
    /// Create a client; `timeout` bounds every request end to end.
    ///
    /// The URL must be an absolute `http`/`https` URL with a host.
    pub fn new(url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let url = parse_url(url)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            token: token.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_peers(&self) -> Result<PeerSet, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: PeersResponse = serde_json::from_slice(&body)?;
        debug!(
            interface = %parsed.interface,
            fetched_at = parsed.fetched_at,
            peers = parsed.peers.len(),
            "Fetched directory peers"
        );
        Ok(parsed.into_peer_set())
    }
}

/// Prefer the directory's `{"error": ...}` text, fall back to the raw body
fn error_message(body: &[u8]) -> String {
    if let Ok(error) = serde_json::from_slice::<ErrorResponse>(body) {
        return error.error;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
