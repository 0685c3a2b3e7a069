// src/liveness.rs

//! Sequencer liveness guard for L2 deployments.

use log::{debug, warn};
use std::sync::Arc;

use crate::error::ValuationError;
use crate::providers::LivenessProvider;

/// Cooldown after the sequencer comes back up before feed prices are trusted again
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 3600;

pub struct LivenessGuard {
    provider: Arc<dyn LivenessProvider>,
    grace_period: u64,
}

impl LivenessGuard {
    pub fn new(provider: Arc<dyn LivenessProvider>) -> Self {
        Self {
            provider,
            grace_period: DEFAULT_GRACE_PERIOD_SECS,
        }
    }

    pub fn with_grace_period(mut self, grace_period_secs: u64) -> Self {
        self.grace_period = grace_period_secs;
        self
    }

    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    /// Fails unless the sequencer is up and has been up for strictly longer
    /// than the grace period at `now`.
    pub async fn check(&self, now: u64) -> Result<(), ValuationError> {
        let status = self.provider.latest_status().await?;
        if status.is_down {
            warn!("⛔ Sequencer reported down since {}", status.status_since);
            return Err(ValuationError::SequencerDown);
        }

        let elapsed = now.saturating_sub(status.status_since);
        if elapsed <= self.grace_period {
            warn!(
                "⏳ Sequencer up for {}s, grace period {}s not over",
                elapsed, self.grace_period
            );
            return Err(ValuationError::GracePeriodNotOver {
                elapsed,
                grace_period: self.grace_period,
            });
        }

        debug!("Sequencer up for {}s", elapsed);
        Ok(())
    }
}
