//! Target monitor — background task that checks one target per tick.
//!
//! Each monitor owns a shutdown signal and a shared reference to its
//! [`StatusTracker`]. Checks for the same target never overlap: the next
//! tick is only awaited once the current check has finished, and ticks
//! missed while a slow check was running are not replayed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::check::HealthCheck;
use crate::status::StatusTracker;

/// Longest effective tick period. Larger intervals are clamped so deadline
/// arithmetic on `Instant` cannot overflow; nothing ticks this late anyway.
const MAX_PERIOD: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Immutable probing configuration of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// Time between two ticks.
    pub interval: Duration,
    /// Opaque descriptor handed to the check on every tick.
    pub descriptor: String,
}

impl TargetConfig {
    /// Create a configuration from an interval and a descriptor.
    pub fn new(interval: Duration, descriptor: impl Into<String>) -> Self {
        Self {
            interval,
            descriptor: descriptor.into(),
        }
    }
}

/// The periodic check loop of a single target.
pub struct TargetMonitor {
    id: String,
    config: TargetConfig,
    tracker: Arc<StatusTracker>,
    checker: Arc<dyn HealthCheck>,
}

/// Handle to a running monitor.
pub struct MonitorHandle {
    /// Shutdown signal for this monitor.
    shutdown_tx: watch::Sender<bool>,
    /// Handle to the background check task.
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Ask the monitor to stop. A check already in flight is allowed to
    /// finish, but no further tick is taken.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to exit.
    pub async fn stop(self) {
        self.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "monitor task did not exit cleanly");
        }
    }
}

impl TargetMonitor {
    /// Create a monitor for target `id`; nothing runs until [`spawn`](Self::spawn).
    pub fn new(
        id: impl Into<String>,
        config: TargetConfig,
        tracker: Arc<StatusTracker>,
        checker: Arc<dyn HealthCheck>,
    ) -> Self {
        Self {
            id: id.into(),
            config,
            tracker,
            checker,
        }
    }

    /// Spawn the loop onto the current tokio runtime.
    ///
    /// Returns immediately; the first check runs one interval from now.
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval.min(MAX_PERIOD);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(id = %self.id, interval = ?period, descriptor = %self.config.descriptor, "monitor loop starting");

        loop {
            tokio::select! {
                biased;
                // An error means the sender is gone, which only happens when
                // the owning registry was dropped.
                _ = shutdown.changed() => {
                    debug!(id = %self.id, "monitor loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
    }

    async fn check_once(&self) {
        let start = Instant::now();
        let result = self.checker.check(&self.config.descriptor).await;

        match result {
            Ok(health) if health.ok => {
                let latency = start.elapsed();
                self.tracker.record_success(latency, health.now);
                debug!(id = %self.id, ?latency, "check succeeded");
            }
            Ok(_) => {
                self.record_failure("target reported unhealthy");
            }
            Err(e) => {
                self.record_failure(&e.to_string());
            }
        }
    }

    fn record_failure(&self, reason: &str) {
        let consecutive = self.tracker.record_failure();
        if consecutive == 1 {
            warn!(id = %self.id, %reason, "target started failing");
        } else {
            debug!(id = %self.id, %reason, consecutive, "check failed");
        }
    }
}
