//! Command applier

use crate::reconcile::{ActionKind, ReconcileAction};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use wgsync_control::{ControlError, TunnelControl};

/// A single corrective action that could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Refusing to apply an empty change for peer {0}")]
    EmptyAction(String),

    #[error("Failed to update peer {public_key}: {source}")]
    Control {
        public_key: String,
        #[source]
        source: ControlError,
    },
}

/// What happened to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The change was written to the tunnel
    Applied,
    /// Dry run: the change was only logged
    DryRun,
}

/// Issues corrective actions against the tunnel control port.
///
/// In dry-run mode nothing is ever sent to the control port.
pub struct Applier {
    interface: String,
    control: Arc<dyn TunnelControl>,
    dry_run: bool,
}

impl Applier {
    pub fn new(interface: impl Into<String>, control: Arc<dyn TunnelControl>, dry_run: bool) -> Self {
        Self {
            interface: interface.into(),
            control,
            dry_run,
        }
    }

    pub async fn apply(&self, action: &ReconcileAction) -> Result<ApplyOutcome, ApplyError> {
        if action.is_empty() {
            return Err(ApplyError::EmptyAction(action.public_key.clone()));
        }

        let verb = match action.kind {
            ActionKind::Update => "Update",
            ActionKind::ClearOrphan => "Clear keepalive of unknown",
        };

        if self.dry_run {
            info!(interface = %self.interface, "[dry-run] {} {}", verb, action);
            return Ok(ApplyOutcome::DryRun);
        }

        info!(interface = %self.interface, "{} {}", verb, action);
        self.control
            .apply_peer(
                &self.interface,
                &action.public_key,
                action.new_endpoint.as_deref(),
                action.new_keepalive,
            )
            .await
            .map_err(|source| ApplyError::Control {
                public_key: action.public_key.clone(),
                source,
            })?;

        Ok(ApplyOutcome::Applied)
    }
}
