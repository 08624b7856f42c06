//! wgsync reconciler
//!
//! Polls a remote directory for its view of the tunnel's peer table and steers
//! the local tunnel configuration toward it:
//!
//! 1. **Fetch** the directory's peer set (with exponential backoff on failure)
//! 2. **Read** the local peer set through the tunnel control port
//! 3. **Reconcile** the two into the minimal list of corrective actions
//! 4. **Apply** each action on its own, so one failing peer never blocks the rest
//! 5. **Sleep** for the poll interval and start over
//!
//! Endpoints are copied from the directory whenever it knows one; persistent
//! keepalive is switched on only while the directory has seen a recent
//! handshake from the peer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wgsync_client::{HttpDirectoryClient, PollLoop, SyncConfig};
//! use wgsync_control::WgCommand;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::default();
//!     let directory = HttpDirectoryClient::new(
//!         "http://10.0.0.1:8080/api/peers",
//!         "token",
//!         config.fetch_timeout,
//!     )?;
//!
//!     let mut poll_loop = PollLoop::new(config, Arc::new(directory), Arc::new(WgCommand::new()));
//!     poll_loop.run().await;
//!     Ok(())
//! }
//! ```

mod apply;
mod backoff;
mod clock;
mod config;
mod directory;
mod poll_loop;
mod reconcile;

pub use apply::{ApplyError, ApplyOutcome, Applier};
pub use backoff::{Backoff, BackoffConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use directory::{DirectoryClient, FetchError, HttpDirectoryClient};
pub use poll_loop::{CycleReport, PollLoop, PollState, SleepReason};
pub use reconcile::{reconcile, ActionKind, ReconcileAction};

use thiserror::Error;
use wgsync_control::ControlError;

/// Errors raised while running a sync cycle.
///
/// None of these stop the loop; they decide how long it sleeps before the
/// next attempt.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fetch error: {0}")]
    RemoteFetch(#[from] FetchError),

    #[error("Local read error: {0}")]
    LocalRead(#[from] ControlError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}
