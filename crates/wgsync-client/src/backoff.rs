//! Exponential backoff for directory fetches

use std::time::Duration;
use tracing::debug;

/// Backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay after the first failure, and after every reset
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2,
        }
    }
}

/// Backoff state carried across cycles.
///
/// Each failure takes the current delay and grows the next one; a successful
/// fetch resets it to the floor.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current_backoff: Duration,
    attempt: usize,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_backoff: config.initial_backoff.min(config.max_backoff),
            config,
            attempt: 0,
        }
    }

    /// Delay to sleep after a failure; advances the backoff
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;
        let delay = self.current_backoff;

        self.current_backoff = self
            .current_backoff
            .saturating_mul(self.config.multiplier)
            .min(self.config.max_backoff);

        debug!(
            "Backing off {:?} after {} consecutive failure(s)",
            delay, self.attempt
        );
        delay
    }

    /// Reset backoff (call after a successful fetch)
    pub fn reset(&mut self) {
        if self.attempt > 0 {
            debug!("Resetting fetch backoff");
        }
        self.current_backoff = self.config.initial_backoff.min(self.config.max_backoff);
        self.attempt = 0;
    }

    /// Number of consecutive failures since the last reset
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Delay the next failure will sleep
    pub fn current_backoff(&self) -> Duration {
        self.current_backoff
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
