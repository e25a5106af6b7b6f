//! Background Mantle sweeper
//!
//! Periodically marks time-expired Mantles inactive for bookkeeping. The
//! live activity check never depends on this loop running.

use citadel_core::AuthorityEngine;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Periodic expired-Mantle sweep
pub struct Sweeper {
    engine: Arc<AuthorityEngine>,
    period: Duration,
}

impl Sweeper {
    pub fn new(engine: Arc<AuthorityEngine>, interval_secs: u64) -> Self {
        Self {
            engine,
            period: Duration::from_secs(interval_secs),
        }
    }

    /// Run the sweep loop until the task is dropped.
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        // the first tick fires immediately; skip it so startup isn't noisy
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match self.engine.sweep_expired().await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(count, "marked expired mantles inactive");
                }
                Err(e) => {
                    tracing::error!(error = %e, "mantle sweep failed");
                }
            }
        }
    }
}
