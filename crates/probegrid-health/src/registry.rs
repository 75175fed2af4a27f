//! Target registry — the public entry point.
//!
//! Maps target ids to their running monitor and status tracker. Every
//! structural change and existence check happens under one short-held
//! lock; the lock is never held while a check is in flight, and removing
//! a target never waits for its monitor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::check::HealthCheck;
use crate::error::{RegistryError, RegistryResult};
use crate::monitor::{MonitorHandle, TargetConfig, TargetMonitor};
use crate::status::{StatusSnapshot, StatusTracker};

/// One active target.
struct Entry {
    monitor: MonitorHandle,
    tracker: Arc<StatusTracker>,
}

/// Registry of probed targets.
///
/// Cloning yields another handle to the same registry. Once the last
/// handle is dropped every monitor stops at its next tick boundary.
#[derive(Clone)]
pub struct Registry {
    /// Check capability shared by every monitor.
    checker: Arc<dyn HealthCheck>,
    /// Active targets: id → entry.
    targets: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Registry {
    /// Create an empty registry that checks every target with `checker`.
    pub fn new(checker: Arc<dyn HealthCheck>) -> Self {
        Self {
            checker,
            targets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start probing a new target.
    ///
    /// Returns as soon as the monitor is spawned; the first check runs one
    /// `interval` later. Must be called from within a tokio runtime.
    pub async fn add(
        &self,
        id: &str,
        interval: Duration,
        descriptor: impl Into<String>,
    ) -> RegistryResult<()> {
        if interval.is_zero() {
            return Err(RegistryError::InvalidInterval(id.to_string()));
        }

        let mut targets = self.targets.lock().await;
        if targets.contains_key(id) {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }

        let config = TargetConfig::new(interval, descriptor);
        let tracker = Arc::new(StatusTracker::new());
        let monitor = TargetMonitor::new(id, config, tracker.clone(), self.checker.clone()).spawn();
        targets.insert(id.to_string(), Entry { monitor, tracker });

        info!(%id, ?interval, "target added");
        Ok(())
    }

    /// Stop probing a target and forget it.
    ///
    /// A check already in flight may still finish and write to the old
    /// tracker, but that tracker is no longer reachable from here.
    pub async fn remove(&self, id: &str) -> RegistryResult<()> {
        let mut targets = self.targets.lock().await;
        let entry = targets
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        entry.monitor.cancel();

        info!(%id, "target removed");
        Ok(())
    }

    /// Clear a target's history without touching its cadence.
    pub async fn reset(&self, id: &str) -> RegistryResult<()> {
        let targets = self.targets.lock().await;
        let entry = targets
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        entry.tracker.reset();

        info!(%id, "target status reset");
        Ok(())
    }

    /// Snapshot of a target's current status.
    pub async fn status(&self, id: &str) -> RegistryResult<StatusSnapshot> {
        let targets = self.targets.lock().await;
        targets
            .get(id)
            .map(|entry| entry.tracker.snapshot())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Snapshots of every active target, sorted by id.
    pub async fn statuses(&self) -> Vec<(String, StatusSnapshot)> {
        let targets = self.targets.lock().await;
        let mut all: Vec<_> = targets
            .iter()
            .map(|(id, entry)| (id.clone(), entry.tracker.snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Ids of every active target, sorted.
    pub async fn targets(&self) -> Vec<String> {
        let targets = self.targets.lock().await;
        let mut ids: Vec<String> = targets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether `id` is currently active.
    pub async fn contains(&self, id: &str) -> bool {
        self.targets.lock().await.contains_key(id)
    }

    /// Number of active targets.
    pub async fn len(&self) -> usize {
        self.targets.lock().await.len()
    }

    /// Whether no target is active.
    pub async fn is_empty(&self) -> bool {
        self.targets.lock().await.is_empty()
    }

    /// Stop every monitor and wait for their loops to exit.
    ///
    /// The map is drained under the lock; the wait happens after it is
    /// released.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Entry)> = {
            let mut targets = self.targets.lock().await;
            targets.drain().collect()
        };

        for (_, entry) in &drained {
            entry.monitor.cancel();
        }
        for (id, entry) in drained {
            entry.monitor.stop().await;
            debug!(%id, "monitor stopped");
        }
        info!("all monitors stopped");
    }
}
