//! Peer records and peer sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tunnel peer's observed attributes.
///
/// Records are rebuilt from a fresh read every cycle and never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// Peer identity, also the key of the owning [`PeerSet`]
    pub public_key: String,
    /// Transport address (host:port), if known
    pub endpoint: Option<String>,
    /// Allowed IP ranges, carried through for the directory API only
    pub allowed_ips: Vec<String>,
    /// Unix timestamp of the latest handshake, `0` meaning never
    pub latest_handshake: i64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Persistent keepalive interval in seconds; `None` and `Some(0)` both mean disabled
    pub persistent_keepalive: Option<u32>,
}

impl PeerRecord {
    /// Create a record with only an identity; every other field is absent/zero.
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            endpoint: None,
            allowed_ips: Vec::new(),
            latest_handshake: 0,
            rx_bytes: 0,
            tx_bytes: 0,
            persistent_keepalive: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_latest_handshake(mut self, timestamp: i64) -> Self {
        self.latest_handshake = timestamp;
        self
    }

    pub fn with_keepalive(mut self, seconds: u32) -> Self {
        self.persistent_keepalive = Some(seconds);
        self
    }

    pub fn with_allowed_ips(mut self, allowed_ips: Vec<String>) -> Self {
        self.allowed_ips = allowed_ips;
        self
    }

    /// Keepalive interval with "absent" folded into `0`.
    pub fn keepalive_or_zero(&self) -> u32 {
        self.persistent_keepalive.unwrap_or(0)
    }
}

/// Peers keyed by public key.
///
/// Ordered so that anything derived from a set (reconcile actions, API output)
/// comes out in a stable order.
pub type PeerSet = BTreeMap<String, PeerRecord>;
