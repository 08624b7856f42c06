//! In-memory tunnel backend

use crate::{ControlError, TunnelControl};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use wgsync_proto::{format_peer_line, PeerRecord, PeerSet};

/// Interface line written at the top of every rendered dump
const INTERFACE_LINE: &str = "(hidden)\tbWVtb3J5LXR1bm5lbC1wdWJsaWMta2V5\t51820\toff";

/// One `apply_peer` call accepted by a [`MemoryTunnel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedChange {
    pub interface: String,
    pub public_key: String,
    pub endpoint: Option<String>,
    pub keepalive: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    peers: PeerSet,
    read_failure: Option<String>,
    failing_keys: HashSet<String>,
    applied: Vec<AppliedChange>,
    reads: usize,
}

/// Peer table held in process memory.
///
/// Reads render the table in `wg show dump` format, writes update it the way
/// `wg set` would (unknown peers are created). Failures can be injected per
/// peer or for reads. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTunnel {
    state: Arc<Mutex<State>>,
}

impl MemoryTunnel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peers(peers: impl IntoIterator<Item = PeerRecord>) -> Self {
        let tunnel = Self::new();
        for peer in peers {
            tunnel.insert_peer(peer);
        }
        tunnel
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a peer
    pub fn insert_peer(&self, peer: PeerRecord) {
        self.lock().peers.insert(peer.public_key.clone(), peer);
    }

    /// Snapshot of the current table
    pub fn peers(&self) -> PeerSet {
        self.lock().peers.clone()
    }

    /// Make every read fail with `reason`, or clear the failure with `None`
    pub fn fail_reads(&self, reason: Option<&str>) {
        self.lock().read_failure = reason.map(str::to_string);
    }

    /// Make every update of `public_key` fail
    pub fn fail_apply_for(&self, public_key: &str) {
        self.lock().failing_keys.insert(public_key.to_string());
    }

    /// Every accepted update, in call order
    pub fn applied(&self) -> Vec<AppliedChange> {
        self.lock().applied.clone()
    }

    /// Number of `read_status` calls, successful or not
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }
}

#[async_trait]
impl TunnelControl for MemoryTunnel {
    async fn read_status(&self, _interface: &str) -> Result<String, ControlError> {
        let mut state = self.lock();
        state.reads += 1;

        if let Some(reason) = &state.read_failure {
            return Err(ControlError::CommandFailed {
                command: "memory show dump".to_string(),
                stderr: reason.clone(),
            });
        }

        let mut dump = String::from(INTERFACE_LINE);
        dump.push('\n');
        for peer in state.peers.values() {
            dump.push_str(&format_peer_line(peer));
            dump.push('\n');
        }
        Ok(dump)
    }

    async fn apply_peer(
        &self,
        interface: &str,
        public_key: &str,
        endpoint: Option<&str>,
        keepalive: Option<u32>,
    ) -> Result<(), ControlError> {
        let mut state = self.lock();

        if state.failing_keys.contains(public_key) {
            return Err(ControlError::CommandFailed {
                command: format!("memory set {} peer {}", interface, public_key),
                stderr: "injected failure".to_string(),
            });
        }

        let peer = state
            .peers
            .entry(public_key.to_string())
            .or_insert_with(|| PeerRecord::new(public_key));
        if let Some(endpoint) = endpoint {
            peer.endpoint = Some(endpoint.to_string());
        }
        if let Some(seconds) = keepalive {
            peer.persistent_keepalive = (seconds > 0).then_some(seconds);
        }

        state.applied.push(AppliedChange {
            interface: interface.to_string(),
            public_key: public_key.to_string(),
            endpoint: endpoint.map(str::to_string),
            keepalive,
        });
        Ok(())
    }
}
