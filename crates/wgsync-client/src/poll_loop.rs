//! Poll loop controller
//!
//! The loop is an explicit state machine so it can be driven one transition
//! at a time:
//!
//! ```text
//!            success                     always
//! Fetching ----------> Reconciling --------------> Sleeping(poll interval)
//!    ^  |                   |                           |
//!    |  | failure           | local read failure        |
//!    |  v                   v                           |
//!    | Sleeping(backoff)   Sleeping(poll interval)      |
//!    |       |                  |                       |
//!    +-------+------------------+-----------------------+
//! ```
//!
//! Only the backoff survives from one cycle to the next; both peer sets are
//! rebuilt from fresh reads every time.

use crate::apply::{ApplyError, ApplyOutcome, Applier};
use crate::backoff::Backoff;
use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::directory::DirectoryClient;
use crate::reconcile::{reconcile, ReconcileAction};
use crate::SyncError;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use wgsync_control::TunnelControl;
use wgsync_proto::{parse_dump, PeerSet};

/// Why the loop is sleeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    /// Normal pause after a cycle
    PollInterval,
    /// The directory could not be fetched
    FetchBackoff,
    /// The local peer table could not be read
    LocalReadFailed,
}

/// Durable states of the loop
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Fetching,
    /// Holds the freshly fetched directory peer set
    Reconciling(PeerSet),
    Sleeping {
        delay: Duration,
        reason: SleepReason,
    },
}

/// Summary of one reconcile cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// `now` used for every liveness decision in the cycle
    pub now: i64,
    pub actions: Vec<ReconcileAction>,
    pub applied: usize,
    pub dry_run: usize,
    pub failed: Vec<ApplyError>,
}

pub struct PollLoop {
    config: SyncConfig,
    directory: Arc<dyn DirectoryClient>,
    control: Arc<dyn TunnelControl>,
    applier: Applier,
    backoff: Backoff,
    clock: Arc<dyn Clock>,
    last_report: Option<CycleReport>,
}

impl PollLoop {
    pub fn new(
        config: SyncConfig,
        directory: Arc<dyn DirectoryClient>,
        control: Arc<dyn TunnelControl>,
    ) -> Self {
        let applier = Applier::new(config.interface.clone(), control.clone(), config.dry_run);
        let backoff = Backoff::new(config.backoff.clone());

        Self {
            config,
            directory,
            control,
            applier,
            backoff,
            clock: Arc::new(SystemClock),
            last_report: None,
        }
    }

    /// Replace the wall clock used for liveness decisions
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Report of the most recent reconcile cycle
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Run forever
    pub async fn run(&mut self) {
        info!(
            interface = %self.config.interface,
            dry_run = self.config.dry_run,
            "Starting sync loop (poll every {:?}, keepalive {}s, stale after {}s)",
            self.config.poll_interval,
            self.config.keepalive,
            self.config.staleness_threshold
        );

        let mut state = PollState::Fetching;
        loop {
            state = self.step(state).await;
        }
    }

    /// Perform exactly one transition
    pub async fn step(&mut self, state: PollState) -> PollState {
        match state {
            PollState::Fetching => self.fetch().await,
            PollState::Reconciling(remote) => self.reconcile_cycle(remote).await,
            PollState::Sleeping { delay, reason } => {
                debug!(?reason, "Sleeping {:?}", delay);
                sleep(delay).await;
                PollState::Fetching
            }
        }
    }

    async fn fetch(&mut self) -> PollState {
        let jitter = self.jitter();
        if !jitter.is_zero() {
            sleep(jitter).await;
        }

        match self.directory.fetch_peers().await {
            Ok(remote) => {
                self.backoff.reset();
                debug!(peers = remote.len(), "Directory fetch succeeded");
                PollState::Reconciling(remote)
            }
            Err(e) => {
                let auth_failure = e.is_auth_failure();
                let err = SyncError::from(e);
                let delay = self.backoff.next_delay();
                if auth_failure {
                    error!("{} (check the bearer token); retrying in {:?}", err, delay);
                } else {
                    warn!("{}; retrying in {:?}", err, delay);
                }
                PollState::Sleeping {
                    delay,
                    reason: SleepReason::FetchBackoff,
                }
            }
        }
    }

    async fn reconcile_cycle(&mut self, remote: PeerSet) -> PollState {
        let local = match self.read_local().await {
            Ok(local) => local,
            Err(err) => {
                warn!(interface = %self.config.interface, "{}", err);
                return PollState::Sleeping {
                    delay: self.config.poll_interval,
                    reason: SleepReason::LocalReadFailed,
                };
            }
        };

        let now = self.clock.now_unix();
        let actions = reconcile(&remote, &local, &self.config, now);
        let mut report = CycleReport {
            now,
            ..Default::default()
        };

        for action in &actions {
            match self.applier.apply(action).await {
                Ok(ApplyOutcome::Applied) => report.applied += 1,
                Ok(ApplyOutcome::DryRun) => report.dry_run += 1,
                Err(e) => {
                    error!("{}", SyncError::from(e.clone()));
                    report.failed.push(e);
                }
            }
        }

        if actions.is_empty() {
            debug!(
                remote = remote.len(),
                local = local.len(),
                "Local peers already match the directory"
            );
        } else {
            info!(
                actions = actions.len(),
                applied = report.applied,
                dry_run = report.dry_run,
                failed = report.failed.len(),
                "Reconcile cycle finished"
            );
        }

        report.actions = actions;
        self.last_report = Some(report);

        PollState::Sleeping {
            delay: self.config.poll_interval,
            reason: SleepReason::PollInterval,
        }
    }

    async fn read_local(&self) -> Result<PeerSet, SyncError> {
        let dump = self.control.read_status(&self.config.interface).await?;
        Ok(parse_dump(&dump))
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.config.jitter_max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}
