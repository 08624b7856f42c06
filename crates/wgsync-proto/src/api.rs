//! Directory API wire types
//!
//! The directory publishes its peer table at [`PEERS_PATH`]:
//!
//! ```json
//! {
//!   "interface": "wg0",
//!   "fetched_at": 1700000000,
//!   "peers": [
//!     {
//!       "public_key": "...",
//!       "endpoint": "203.0.113.5:51820",
//!       "allowed_ips": ["10.0.0.2/32"],
//!       "latest_handshake": 1699999990,
//!       "rx_bytes": 1024,
//!       "tx_bytes": 2048,
//!       "persistent_keepalive": null
//!     }
//!   ]
//! }
//! ```

use crate::peer::{PeerRecord, PeerSet};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Default path of the peer listing endpoint
pub const PEERS_PATH: &str = "/api/peers";

/// One published peer.
///
/// `public_key` is required; every other field falls back to "absent"/zero when
/// missing so a partial record never reaches the reconciler as a loose value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ApiPeer {
    /// Peer public key
    pub public_key: String,
    /// Last observed endpoint (host:port)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    /// Unix timestamp of the latest handshake (0 = never)
    #[serde(default)]
    pub latest_handshake: i64,
    #[serde(default)]
    pub rx_bytes: u64,
    #[serde(default)]
    pub tx_bytes: u64,
    /// Persistent keepalive seconds, null when disabled
    #[serde(default)]
    pub persistent_keepalive: Option<u32>,
}

impl From<&PeerRecord> for ApiPeer {
    fn from(peer: &PeerRecord) -> Self {
        Self {
            public_key: peer.public_key.clone(),
            endpoint: peer.endpoint.clone(),
            allowed_ips: peer.allowed_ips.clone(),
            latest_handshake: peer.latest_handshake,
            rx_bytes: peer.rx_bytes,
            tx_bytes: peer.tx_bytes,
            persistent_keepalive: peer.persistent_keepalive,
        }
    }
}

impl From<ApiPeer> for PeerRecord {
    fn from(peer: ApiPeer) -> Self {
        Self {
            public_key: peer.public_key,
            endpoint: peer.endpoint,
            allowed_ips: peer.allowed_ips,
            latest_handshake: peer.latest_handshake,
            rx_bytes: peer.rx_bytes,
            tx_bytes: peer.tx_bytes,
            persistent_keepalive: peer.persistent_keepalive,
        }
    }
}

/// Response body of `GET /api/peers`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PeersResponse {
    /// Interface the table was read from
    pub interface: String,
    /// Unix time at which the directory read its table
    pub fetched_at: i64,
    pub peers: Vec<ApiPeer>,
}

impl PeersResponse {
    /// Key the published peers by public key. Later duplicates replace earlier ones.
    pub fn into_peer_set(self) -> PeerSet {
        self.peers
            .into_iter()
            .map(|peer| (peer.public_key.clone(), PeerRecord::from(peer)))
            .collect()
    }
}

/// Error body returned by the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Machine readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub interface: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_optional_fields_default() {
        let peer: ApiPeer = serde_json::from_value(json!({ "public_key": "PEER_A" })).unwrap();

        assert_eq!(peer.endpoint, None);
        assert!(peer.allowed_ips.is_empty());
        assert_eq!(peer.latest_handshake, 0);
        assert_eq!(peer.persistent_keepalive, None);
    }

    #[test]
    fn test_missing_public_key_is_rejected() {
        let result = serde_json::from_value::<ApiPeer>(json!({ "endpoint": "1.2.3.4:5" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let result = serde_json::from_value::<ApiPeer>(
            json!({ "public_key": "PEER_A", "latest_handshake": "yesterday" }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_null_endpoint_and_keepalive() {
        let response: PeersResponse = serde_json::from_value(json!({
            "interface": "wg0",
            "fetched_at": 1700000000,
            "peers": [{
                "public_key": "PEER_A",
                "endpoint": null,
                "allowed_ips": ["10.0.0.2/32"],
                "latest_handshake": 1699999990,
                "rx_bytes": 1,
                "tx_bytes": 2,
                "persistent_keepalive": null
            }]
        }))
        .unwrap();

        let peers = response.into_peer_set();
        let peer = &peers["PEER_A"];
        assert_eq!(peer.endpoint, None);
        assert_eq!(peer.persistent_keepalive, None);
        assert_eq!(peer.latest_handshake, 1_699_999_990);
    }

    #[test]
    fn test_error_response_omits_missing_code() {
        let body = serde_json::to_value(ErrorResponse {
            error: "boom".to_string(),
            code: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "error": "boom" }));
    }
}
