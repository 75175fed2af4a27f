//! Per-target status tracking.
//!
//! A [`StatusTracker`] is written by exactly one monitor and read by any
//! number of callers. The lock covers only the field update or copy, never
//! a check in flight.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Immutable copy of a tracker's fields at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Creation time, or the time of the last explicit reset.
    pub started_at: DateTime<Utc>,
    /// Local time of the most recent completed check, success or failure.
    pub last_check_at: Option<DateTime<Utc>>,
    /// Remote-reported time from the most recent successful check.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Round-trip time of the most recent successful check.
    pub last_latency: Duration,
    pub total_checks: u64,
    pub total_failures: u64,
    pub consecutive_failures: u64,
}

impl StatusSnapshot {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_check_at: None,
            last_success_at: None,
            last_latency: Duration::ZERO,
            total_checks: 0,
            total_failures: 0,
            consecutive_failures: 0,
        }
    }

    /// At least one check completed and the latest one succeeded.
    pub fn is_healthy(&self) -> bool {
        self.total_checks > 0 && self.consecutive_failures == 0
    }

    /// Fraction of checks that failed since `started_at`.
    pub fn loss_ratio(&self) -> f64 {
        if self.total_checks == 0 {
            return 0.0;
        }
        self.total_failures as f64 / self.total_checks as f64
    }

    /// Remote clock minus local clock, as observed by the latest check.
    ///
    /// Only defined while the latest check succeeded; after a failure the
    /// local check time no longer matches the remote timestamp.
    pub fn clock_skew(&self) -> Option<chrono::Duration> {
        if !self.is_healthy() {
            return None;
        }
        let remote = self.last_success_at?;
        let local = self.last_check_at?;
        Some(remote - local)
    }
}

/// Thread-safe health history of one target.
#[derive(Debug)]
pub struct StatusTracker {
    inner: RwLock<StatusSnapshot>,
}

impl StatusTracker {
    /// Create a tracker whose `started_at` is now.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StatusSnapshot::new(Utc::now())),
        }
    }

    /// Record a successful check.
    ///
    /// `remote_now` is the target's self-reported time; it is stored as-is
    /// and never compared against the local clock.
    pub fn record_success(&self, latency: Duration, remote_now: DateTime<Utc>) {
        let now = Utc::now();
        let mut s = self.inner.write();
        s.last_check_at = Some(now);
        s.last_latency = latency;
        s.last_success_at = Some(remote_now);
        s.total_checks += 1;
        s.consecutive_failures = 0;
    }

    /// Record a failed check. Latency and last success are left untouched.
    ///
    /// Returns the consecutive failure count including this one, read under
    /// the same lock as the write.
    pub fn record_failure(&self) -> u64 {
        let now = Utc::now();
        let mut s = self.inner.write();
        s.last_check_at = Some(now);
        s.total_checks += 1;
        s.total_failures += 1;
        s.consecutive_failures += 1;
        s.consecutive_failures
    }

    /// Reinitialize every field as if the tracker had just been created.
    pub fn reset(&self) {
        let now = Utc::now();
        *self.inner.write() = StatusSnapshot::new(now);
    }

    /// Copy of every field, taken under the read lock.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().clone()
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
