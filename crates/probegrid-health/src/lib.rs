//! probegrid-health — a concurrent health-probing registry.
//!
//! Tracks a dynamic set of named targets, runs an independent periodic
//! health check against each, and exposes per-target status (latency,
//! success and failure counters) without ever blocking a caller on a
//! check in flight.
//!
//! # Architecture
//!
//! ```text
//! Registry
//!   ├── id → Entry
//!   │   ├── MonitorHandle (shutdown signal + task handle)
//!   │   └── Arc<StatusTracker> ← read by status()
//!   └── Arc<dyn HealthCheck> shared by every monitor
//!
//! TargetMonitor (one tokio task per target)
//!   ├── tick → HealthCheck::check(descriptor)
//!   ├── Ok(ok) → StatusTracker::record_success(latency, remote now)
//!   └── Err / !ok → StatusTracker::record_failure()
//! ```
//!
//! The transport is injected through [`HealthCheck`]. Any async closure
//! `Fn(String) -> Future<Output = Result<Health, CheckError>>` qualifies.
//!
//! Repeated failures never stop a monitor. The only way a loop ends is
//! [`Registry::remove`], [`Registry::shutdown`], or dropping the registry.

pub mod check;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod status;

pub use check::{CheckError, CheckFuture, CheckResult, Health, HealthCheck};
pub use error::{RegistryError, RegistryResult};
pub use monitor::{MonitorHandle, TargetConfig, TargetMonitor};
pub use registry::Registry;
pub use status::{StatusSnapshot, StatusTracker};
