// Raffle Sweeper - Sweep timer
use log::{error, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::config::Config;
use crate::retention::RetentionSweep;
use crate::sweep::{LifecycleSweep, SweepReport};
use crate::utils::now_millis;

/// Shortest period the timer runs at
pub const MIN_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Result of one timer tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Raffles purged, `None` if the retention sweep failed
    pub purged: Option<usize>,
    /// Lifecycle counters, `None` if the due query failed
    pub sweep: Option<SweepReport>,
}

/// Runs the retention and lifecycle sweeps on a fixed period
pub struct Scheduler {
    lifecycle: LifecycleSweep,
    retention: RetentionSweep,
    period: Duration,
}

impl Scheduler {
    /// A period below `MIN_TICK_PERIOD` is raised to it
    pub fn new(lifecycle: LifecycleSweep, retention: RetentionSweep, config: &Config) -> Self {
        if config.tick_period < MIN_TICK_PERIOD {
            warn!(
                "[SCHEDULER] tick period {:?} raised to {:?}",
                config.tick_period, MIN_TICK_PERIOD
            );
        }
        Self {
            lifecycle,
            retention,
            period: config.tick_period.max(MIN_TICK_PERIOD),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One tick at `now`: purge old raffles, then draw the due ones.
    /// Errors are logged and reflected in the summary.
    pub async fn tick(&self, now: i64) -> TickSummary {
        let purged = match self.retention.run_tick(now).await {
            Ok(removed) => Some(removed),
            Err(e) => {
                error!("[SCHEDULER] retention sweep failed: {}", e);
                None
            }
        };

        let sweep = match self.lifecycle.run_tick(now).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("[SCHEDULER] lifecycle sweep failed: {}", e);
                None
            }
        };

        TickSummary { purged, sweep }
    }

    /// Tick until `shutdown` resolves. The first tick fires immediately.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("[SCHEDULER] raffle sweep started period:{:?}", self.period);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick(now_millis()).await;
                }
            }
        }
        info!("[SCHEDULER] raffle sweep stopped");
    }
}
