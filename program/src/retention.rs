// Raffle Sweeper - Retention sweep
use log::info;
use std::sync::Arc;

use crate::config::Config;
use crate::error::RaffleError;
use crate::store::{RaffleFilter, RaffleStore};
use crate::utils::retention_cutoff;

/// Purges raffles whose end time is older than the retention window, drawn or not.
/// Winner records are left in place.
pub struct RetentionSweep {
    store: Arc<dyn RaffleStore>,
    retention_millis: i64,
}

impl RetentionSweep {
    pub fn new(store: Arc<dyn RaffleStore>, config: &Config) -> Self {
        Self {
            store,
            retention_millis: config.retention_millis(),
        }
    }

    /// Returns the number of raffles deleted
    pub async fn run_tick(&self, now: i64) -> Result<usize, RaffleError> {
        let cutoff = retention_cutoff(now, self.retention_millis);
        let removed = self
            .store
            .delete_raffles(&RaffleFilter::ended_before(cutoff))
            .await?;
        if removed > 0 {
            info!("[RETENTION] removed {} raffles ended before {}", removed, cutoff);
        }
        Ok(removed)
    }
}
