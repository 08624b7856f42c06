//! Remote/local peer diffing
//!
//! For every peer the directory knows:
//!
//! - the endpoint is copied when the directory has one and it differs locally;
//!   an absent remote endpoint never clears a local one
//! - keepalive converges to the configured interval while the directory has
//!   seen a recent handshake, and to `0` (off) otherwise
//!
//! Peers that only exist locally are no longer directory-managed: their
//! keepalive is switched off and their endpoint is left alone.

use crate::config::SyncConfig;
use std::fmt;
use tracing::debug;
use wgsync_proto::{is_online, PeerRecord, PeerSet};

/// Why an action was emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Directory-managed peer drifted from the desired state
    Update,
    /// Local-only peer whose keepalive must be switched off
    ClearOrphan,
}

/// One corrective change for a single peer.
///
/// At least one of `new_endpoint` / `new_keepalive` is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileAction {
    pub public_key: String,
    pub new_endpoint: Option<String>,
    /// `Some(0)` switches keepalive off
    pub new_keepalive: Option<u32>,
    pub kind: ActionKind,
}

impl ReconcileAction {
    /// Build an action, or `None` if nothing would change
    pub fn new(
        public_key: impl Into<String>,
        new_endpoint: Option<String>,
        new_keepalive: Option<u32>,
        kind: ActionKind,
    ) -> Option<Self> {
        if new_endpoint.is_none() && new_keepalive.is_none() {
            return None;
        }
        Some(Self {
            public_key: public_key.into(),
            new_endpoint,
            new_keepalive,
            kind,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.new_endpoint.is_none() && self.new_keepalive.is_none()
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer {}", self.public_key)?;
        if let Some(endpoint) = &self.new_endpoint {
            write!(f, " endpoint={}", endpoint)?;
        }
        match self.new_keepalive {
            Some(0) => write!(f, " keepalive=off")?,
            Some(seconds) => write!(f, " keepalive={}", seconds)?,
            None => {}
        }
        Ok(())
    }
}

/// Compute the corrective actions that move `local` toward `remote`.
///
/// Pure and deterministic: actions come out sorted by public key, directory
/// peers first, then orphans. `now` must be sampled once per cycle.
pub fn reconcile(
    remote: &PeerSet,
    local: &PeerSet,
    config: &SyncConfig,
    now: i64,
) -> Vec<ReconcileAction> {
    let mut actions = Vec::new();

    for (public_key, remote_peer) in remote {
        let online = is_online(
            remote_peer.latest_handshake,
            now,
            config.staleness_threshold,
        );
        let desired_keepalive = if online { config.keepalive } else { 0 };

        let local_peer = local.get(public_key);
        let local_endpoint = local_peer.and_then(|peer| peer.endpoint.as_deref());
        let local_keepalive = local_peer.map(PeerRecord::keepalive_or_zero).unwrap_or(0);

        let new_endpoint = match remote_peer.endpoint.as_deref() {
            Some(endpoint) if Some(endpoint) != local_endpoint => Some(endpoint.to_string()),
            _ => None,
        };
        let new_keepalive = (local_keepalive != desired_keepalive).then_some(desired_keepalive);

        if let Some(action) =
            ReconcileAction::new(public_key, new_endpoint, new_keepalive, ActionKind::Update)
        {
            debug!(
                public_key = %public_key,
                online,
                "endpoint {:?} -> {:?}, keepalive {} -> {}",
                local_endpoint,
                remote_peer.endpoint,
                local_keepalive,
                desired_keepalive
            );
            actions.push(action);
        }
    }

    for (public_key, local_peer) in local {
        if remote.contains_key(public_key) || local_peer.keepalive_or_zero() == 0 {
            continue;
        }
        debug!(public_key = %public_key, "Peer unknown to directory, clearing keepalive");
        if let Some(action) =
            ReconcileAction::new(public_key, None, Some(0), ActionKind::ClearOrphan)
        {
            actions.push(action);
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn config() -> SyncConfig {
        SyncConfig {
            keepalive: 25,
            staleness_threshold: 120,
            ..Default::default()
        }
    }

    fn set(peers: impl IntoIterator<Item = PeerRecord>) -> PeerSet {
        peers
            .into_iter()
            .map(|peer| (peer.public_key.clone(), peer))
            .collect()
    }

    #[test]
    fn test_online_peer_gets_endpoint_and_keepalive() {
        let remote = set([PeerRecord::new("A")
            .with_endpoint("203.0.113.5:51820")
            .with_latest_handshake(NOW - 10)]);
        let local = set([PeerRecord::new("A")]);

        let actions = reconcile(&remote, &local, &config(), NOW);

        assert_eq!(
            actions,
            vec![ReconcileAction {
                public_key: "A".to_string(),
                new_endpoint: Some("203.0.113.5:51820".to_string()),
                new_keepalive: Some(25),
                kind: ActionKind::Update,
            }]
        );
    }

    #[test]
    fn test_in_sync_peer_yields_nothing() {
        let remote = set([PeerRecord::new("A")
            .with_endpoint("203.0.113.5:51820")
            .with_latest_handshake(NOW - 10)]);
        let local = set([PeerRecord::new("A")
            .with_endpoint("203.0.113.5:51820")
            .with_keepalive(25)]);

        assert!(reconcile(&remote, &local, &config(), NOW).is_empty());
    }

    #[test]
    fn test_stale_peer_loses_keepalive_only() {
        let remote = set([PeerRecord::new("A")
            .with_endpoint("203.0.113.5:51820")
            .with_latest_handshake(NOW - 121)]);
        let local = set([PeerRecord::new("A")
            .with_endpoint("203.0.113.5:51820")
            .with_keepalive(25)]);

        let actions = reconcile(&remote, &local, &config(), NOW);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].new_endpoint, None);
        assert_eq!(actions[0].new_keepalive, Some(0));
    }

    #[test]
    fn test_never_handshaked_and_absent_keepalive_is_in_sync() {
        let remote = set([PeerRecord::new("A")]);
        let local = set([PeerRecord::new("A").with_keepalive(0)]);

        assert!(reconcile(&remote, &local, &config(), NOW).is_empty());
    }

    #[test]
    fn test_absent_remote_endpoint_is_sticky() {
        let remote = set([PeerRecord::new("A").with_latest_handshake(NOW)]);
        let local = set([PeerRecord::new("A")
            .with_endpoint("192.0.2.1:51820")
            .with_keepalive(25)]);

        assert!(reconcile(&remote, &local, &config(), NOW).is_empty());
    }

    #[test]
    fn test_peer_missing_locally() {
        let remote = set([
            PeerRecord::new("A").with_endpoint("203.0.113.5:51820"),
            PeerRecord::new("B"),
        ]);

        let actions = reconcile(&remote, &PeerSet::new(), &config(), NOW);

        // A has an endpoint to push; B has nothing known and stays offline
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].public_key, "A");
        assert_eq!(actions[0].new_keepalive, None);
    }

    #[test]
    fn test_orphan_keepalive_cleared_endpoint_untouched() {
        let local = set([
            PeerRecord::new("ORPHAN")
                .with_endpoint("192.0.2.7:51820")
                .with_keepalive(25),
            PeerRecord::new("QUIET").with_endpoint("192.0.2.8:51820"),
        ]);

        let actions = reconcile(&PeerSet::new(), &local, &config(), NOW);

        assert_eq!(
            actions,
            vec![ReconcileAction {
                public_key: "ORPHAN".to_string(),
                new_endpoint: None,
                new_keepalive: Some(0),
                kind: ActionKind::ClearOrphan,
            }]
        );
    }

    #[test]
    fn test_zero_configured_keepalive_keeps_everything_off() {
        let remote = set([PeerRecord::new("A").with_latest_handshake(NOW)]);
        let local = set([PeerRecord::new("A")]);
        let config = SyncConfig {
            keepalive: 0,
            ..config()
        };

        assert!(reconcile(&remote, &local, &config, NOW).is_empty());
    }

    #[test]
    fn test_keepalive_interval_change_is_applied() {
        let remote = set([PeerRecord::new("A").with_latest_handshake(NOW)]);
        let local = set([PeerRecord::new("A").with_keepalive(15)]);

        let actions = reconcile(&remote, &local, &config(), NOW);
        assert_eq!(actions[0].new_keepalive, Some(25));
    }

    #[test]
    fn test_output_is_deterministic_and_sorted() {
        let remote = set([
            PeerRecord::new("C").with_endpoint("192.0.2.3:1"),
            PeerRecord::new("A").with_endpoint("192.0.2.1:1"),
            PeerRecord::new("B").with_endpoint("192.0.2.2:1"),
        ]);
        let local = set([PeerRecord::new("Z").with_keepalive(25)]);

        let first = reconcile(&remote, &local, &config(), NOW);
        let second = reconcile(&remote, &local, &config(), NOW);

        assert_eq!(first, second);
        let keys: Vec<&str> = first.iter().map(|a| a.public_key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "Z"]);
    }

    #[test]
    fn test_empty_action_is_never_built() {
        assert!(ReconcileAction::new("A", None, None, ActionKind::Update).is_none());
    }

    #[test]
    fn test_display() {
        let action =
            ReconcileAction::new("A", Some("192.0.2.1:1".to_string()), Some(0), ActionKind::Update)
                .unwrap();
        assert_eq!(action.to_string(), "peer A endpoint=192.0.2.1:1 keepalive=off");
    }
}
