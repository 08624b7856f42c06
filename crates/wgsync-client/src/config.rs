use crate::backoff::BackoffConfig;
use std::time::Duration;

/// Immutable settings of one reconciler run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local tunnel interface to steer (e.g. `wg0`)
    pub interface: String,

    /// Pause between successful cycles
    pub poll_interval: Duration,

    /// Keepalive interval set on peers that are online, in seconds
    pub keepalive: u32,

    /// Maximum handshake age, in seconds, for a peer to count as online
    pub staleness_threshold: u64,

    /// Compute and log actions without applying them
    pub dry_run: bool,

    /// Upper bound of the random delay added before each fetch
    pub jitter_max: Duration,

    /// Retry policy for failed fetches
    pub backoff: BackoffConfig,

    /// Timeout for a single directory request
    pub fetch_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interface: "wg0".to_string(),
            poll_interval: Duration::from_secs(10),
            keepalive: 25,
            staleness_threshold: 120,
            dry_run: false,
            jitter_max: Duration::from_millis(200),
            backoff: BackoffConfig::default(),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}
