//! Multi-cycle behaviour of the reconciler against an in-memory tunnel

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wgsync_client::{
    reconcile, DirectoryClient, FetchError, ManualClock, PollLoop, PollState, SleepReason,
    SyncConfig,
};
use wgsync_control::MemoryTunnel;
use wgsync_proto::{parse_dump, PeerRecord, PeerSet};

const NOW: i64 = 1_700_000_000;

/// Directory whose published table can be swapped between cycles
#[derive(Default)]
struct SharedDirectory {
    peers: Mutex<PeerSet>,
}

impl SharedDirectory {
    fn publish(&self, peers: impl IntoIterator<Item = PeerRecord>) {
        *self.peers.lock().unwrap() = peers
            .into_iter()
            .map(|peer| (peer.public_key.clone(), peer))
            .collect();
    }
}

#[async_trait]
impl DirectoryClient for SharedDirectory {
    async fn fetch_peers(&self) -> Result<PeerSet, FetchError> {
        Ok(self.peers.lock().unwrap().clone())
    }
}

struct Harness {
    directory: Arc<SharedDirectory>,
    tunnel: MemoryTunnel,
    clock: Arc<ManualClock>,
    poll_loop: PollLoop,
}

impl Harness {
    fn new(local: impl IntoIterator<Item = PeerRecord>) -> Self {
        let directory = Arc::new(SharedDirectory::default());
        let tunnel = MemoryTunnel::with_peers(local);
        let clock = Arc::new(ManualClock::new(NOW));
        let config = SyncConfig {
            jitter_max: Duration::ZERO,
            ..Default::default()
        };
        let poll_loop = PollLoop::new(config, directory.clone(), Arc::new(tunnel.clone()))
            .with_clock(clock.clone());

        Self {
            directory,
            tunnel,
            clock,
            poll_loop,
        }
    }

    /// Fetch, reconcile, sleep; returns the number of actions of the cycle
    async fn cycle(&mut self) -> usize {
        let state = self.poll_loop.step(PollState::Fetching).await;
        assert!(matches!(state, PollState::Reconciling(_)));

        let state = self.poll_loop.step(state).await;
        assert_eq!(
            state,
            PollState::Sleeping {
                delay: Duration::from_secs(10),
                reason: SleepReason::PollInterval
            }
        );

        let state = self.poll_loop.step(state).await;
        assert_eq!(state, PollState::Fetching);

        self.poll_loop.last_report().unwrap().actions.len()
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_cycle_converges_and_second_is_noop() {
    let mut harness = Harness::new([
        PeerRecord::new("ROAMING"),
        PeerRecord::new("SLEEPY")
            .with_endpoint("198.51.100.20:51820")
            .with_keepalive(25),
        PeerRecord::new("MANUAL")
            .with_endpoint("192.0.2.99:51820")
            .with_keepalive(25),
    ]);
    harness.directory.publish([
        PeerRecord::new("ROAMING")
            .with_endpoint("203.0.113.5:40001")
            .with_latest_handshake(NOW - 30),
        PeerRecord::new("SLEEPY")
            .with_endpoint("198.51.100.20:51820")
            .with_latest_handshake(NOW - 600),
    ]);

    assert_eq!(harness.cycle().await, 3);

    let local = harness.tunnel.peers();
    assert_eq!(local["ROAMING"].endpoint.as_deref(), Some("203.0.113.5:40001"));
    assert_eq!(local["ROAMING"].persistent_keepalive, Some(25));
    assert_eq!(local["SLEEPY"].persistent_keepalive, None);
    assert_eq!(local["MANUAL"].persistent_keepalive, None);
    assert_eq!(
        local["MANUAL"].endpoint.as_deref(),
        Some("192.0.2.99:51820"),
        "orphan endpoints are never touched"
    );

    assert_eq!(harness.cycle().await, 0);
    assert_eq!(harness.tunnel.applied().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_converges_after_each_remote_change() {
    let mut harness = Harness::new([PeerRecord::new("PEER")]);

    let snapshots = [
        PeerRecord::new("PEER")
            .with_endpoint("203.0.113.5:40001")
            .with_latest_handshake(NOW),
        // roamed to a new port
        PeerRecord::new("PEER")
            .with_endpoint("203.0.113.5:40002")
            .with_latest_handshake(NOW),
        // directory lost track of the endpoint, handshake still fresh
        PeerRecord::new("PEER").with_latest_handshake(NOW),
        // no handshake since
        PeerRecord::new("PEER").with_latest_handshake(NOW),
    ];

    let expected = [
        (Some("203.0.113.5:40001"), Some(25)),
        (Some("203.0.113.5:40002"), Some(25)),
        (Some("203.0.113.5:40002"), Some(25)),
        (Some("203.0.113.5:40002"), None),
    ];

    for (index, (snapshot, (endpoint, keepalive))) in
        snapshots.into_iter().zip(expected).enumerate()
    {
        if index == 3 {
            harness.clock.advance(121);
        }
        harness.directory.publish([snapshot]);

        harness.cycle().await;
        assert_eq!(harness.cycle().await, 0, "snapshot {} did not settle", index);

        let peer = &harness.tunnel.peers()["PEER"];
        assert_eq!(peer.endpoint.as_deref(), endpoint, "snapshot {}", index);
        assert_eq!(peer.persistent_keepalive, keepalive, "snapshot {}", index);
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_is_idempotent_after_apply() {
    let remote: PeerSet = [
        PeerRecord::new("A")
            .with_endpoint("203.0.113.1:1")
            .with_latest_handshake(NOW),
        PeerRecord::new("B").with_endpoint("203.0.113.2:2"),
        PeerRecord::new("C").with_latest_handshake(NOW - 5),
    ]
    .into_iter()
    .map(|peer| (peer.public_key.clone(), peer))
    .collect();

    let tunnel = MemoryTunnel::with_peers([
        PeerRecord::new("B").with_keepalive(25),
        PeerRecord::new("D").with_keepalive(10),
        PeerRecord::new("E"),
    ]);
    let config = SyncConfig::default();

    let local = parse_dump(&read_local(&tunnel).await);
    let actions = reconcile(&remote, &local, &config, NOW);
    assert!(!actions.is_empty());

    let applier = wgsync_client::Applier::new("wg0", Arc::new(tunnel.clone()), false);
    for action in &actions {
        applier.apply(action).await.unwrap();
    }

    let local = parse_dump(&read_local(&tunnel).await);
    assert!(reconcile(&remote, &local, &config, NOW).is_empty());
}

async fn read_local(tunnel: &MemoryTunnel) -> String {
    use wgsync_control::TunnelControl;
    tunnel.read_status("wg0").await.unwrap()
}
