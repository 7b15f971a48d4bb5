//! Periodic reporting of the flag-log counters.

use crate::rpc::{FlagLogCounters, FlagLogSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Reporting period
pub const METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Logs a counter snapshot every interval until shut down
pub struct MetricsReporter {
    counters: Arc<FlagLogCounters>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(counters: Arc<FlagLogCounters>) -> Self {
        Self::with_interval(counters, METRICS_INTERVAL)
    }

    pub fn with_interval(counters: Arc<FlagLogCounters>, interval: Duration) -> Self {
        Self { counters, interval }
    }

    /// Log the current totals once.
    pub fn report(&self) -> FlagLogSnapshot {
        let snapshot = self.counters.snapshot();
        info!(
            bytes_total = snapshot.bytes_total,
            applied_total = snapshot.applied_total,
            req_total = snapshot.requests_total,
            "metrics"
        );
        snapshot
    }

    /// Report on every tick. Returns the number of reports once `shutdown`
    /// flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reports = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report();
                    reports += 1;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!(reports, "metrics reporter stopped");
                        return reports;
                    }
                }
            }
        }
    }
}
