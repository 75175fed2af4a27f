//! The injected health check capability.
//!
//! A check takes the target's opaque descriptor (an endpoint address, for
//! example) and resolves to the remote target's verdict. How the request
//! is issued and how the payload is decoded is entirely up to the
//! implementation; the registry only looks at the outcome.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health payload reported by a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Whether the target considers itself healthy.
    #[serde(rename = "OK", alias = "ok")]
    pub ok: bool,
    /// The target's own clock at the time it answered.
    #[serde(rename = "Now", alias = "now")]
    pub now: DateTime<Utc>,
}

impl Health {
    /// Payload of a target reporting itself healthy at `now`.
    pub fn healthy(now: DateTime<Utc>) -> Self {
        Self { ok: true, now }
    }

    /// Payload of a target reporting itself unhealthy at `now`.
    pub fn unhealthy(now: DateTime<Utc>) -> Self {
        Self { ok: false, now }
    }
}

/// Reasons a single check did not produce a payload.
///
/// The monitor records every one of these as a plain failure. The
/// variants exist for logging and for check implementations that want to
/// surface more detail to their own callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("failed to decode health payload: {0}")]
    Decode(String),

    #[error("check timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
}

pub type CheckResult = Result<Health, CheckError>;

pub type CheckFuture = Pin<Box<dyn Future<Output = CheckResult> + Send>>;

/// A single-call health check: descriptor in, verdict out.
///
/// Implementations must be cheap to share across tasks; the registry
/// holds one instance behind an `Arc` and calls it from every monitor.
pub trait HealthCheck: Send + Sync + 'static {
    fn check(&self, descriptor: &str) -> CheckFuture;
}

impl<F, Fut> HealthCheck for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    fn check(&self, descriptor: &str) -> CheckFuture {
        Box::pin(self(descriptor.to_string()))
    }
}
