//! Tunnel control port
//!
//! The reconciler and the directory never talk to the tunnel directly. They go
//! through [`TunnelControl`], which has exactly two operations: read the peer
//! status dump of an interface, and update a single peer's endpoint and/or
//! persistent keepalive.
//!
//! Two implementations ship with the crate:
//!
//! - [`WgCommand`]: shells out to `wg show <iface> dump` and `wg set`
//! - [`MemoryTunnel`]: an in-process peer table, used by tests and dry runs of
//!   the whole pipeline

mod memory;
mod wg;

pub use memory::{AppliedChange, MemoryTunnel};
pub use wg::WgCommand;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a tunnel control implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Failed to run {command}: {reason}")]
    Spawn { command: String, reason: String },

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Invalid command output: {0}")]
    InvalidOutput(String),
}

/// Narrow capability over the local tunnel's peer table
#[async_trait]
pub trait TunnelControl: Send + Sync {
    /// Return the raw status dump of `interface`
    async fn read_status(&self, interface: &str) -> Result<String, ControlError>;

    /// Update one peer.
    ///
    /// `endpoint` is set when present. `keepalive` is set when present, with
    /// `Some(0)` disabling persistent keepalive.
    async fn apply_peer(
        &self,
        interface: &str,
        public_key: &str,
        endpoint: Option<&str>,
        keepalive: Option<u32>,
    ) -> Result<(), ControlError>;
}
