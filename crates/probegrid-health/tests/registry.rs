//! Registry behaviour under a scripted check capability.
//!
//! Runs on paused tokio time so tick counts are exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use probegrid_health::*;

/// Check capability whose outcome is scripted per descriptor.
#[derive(Clone, Default)]
struct Scripted {
    /// descriptor → outcome of every call, consumed front to back. The
    /// last outcome repeats forever.
    outcomes: Arc<Mutex<HashMap<String, Vec<CheckResult>>>>,
    calls: Arc<AtomicU64>,
    delay: Duration,
}

impl Scripted {
    fn script(&self, descriptor: &str, outcomes: Vec<CheckResult>) {
        self.outcomes.lock().insert(descriptor.to_string(), outcomes);
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HealthCheck for Scripted {
    fn check(&self, descriptor: &str) -> CheckFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut outcomes = self.outcomes.lock();
            match outcomes.get_mut(descriptor) {
                Some(list) if list.len() > 1 => list.remove(0),
                Some(list) if !list.is_empty() => list[0].clone(),
                _ => Err(CheckError::Transport(format!("no route to {descriptor}"))),
            }
        };
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            outcome
        })
    }
}

fn remote_time(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_add_fails_and_leaves_first_target_running() {
    let check = Scripted::default();
    check.script("a", vec![Ok(Health::healthy(remote_time(10)))]);
    let registry = Registry::new(Arc::new(check.clone()));

    registry.add("api", Duration::from_secs(1), "a").await.unwrap();
    assert_eq!(
        registry.add("api", Duration::from_secs(5), "b").await,
        Err(RegistryError::AlreadyExists("api".to_string()))
    );

    advance(2_500).await;
    let status = registry.status("api").await.unwrap();
    assert_eq!(status.total_checks, 2);
    assert_eq!(status.total_failures, 0);
    assert_eq!(status.last_success_at, Some(remote_time(10)));

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn remove_unknown_or_removed_id_fails() {
    let registry = Registry::new(Arc::new(Scripted::default()));
    assert_eq!(
        registry.remove("ghost").await,
        Err(RegistryError::NotFound("ghost".to_string()))
    );

    registry.add("api", Duration::from_secs(1), "a").await.unwrap();
    registry.remove("api").await.unwrap();
    assert_eq!(
        registry.remove("api").await,
        Err(RegistryError::NotFound("api".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn status_reports_completed_checks() {
    let check = Scripted::default();
    check.script("a", vec![Ok(Health::healthy(Utc::now()))]);
    let registry = Registry::new(Arc::new(check));

    registry.add("api", Duration::from_secs(1), "a").await.unwrap();
    let status = registry.status("api").await.unwrap();
    assert_eq!(status.total_checks, 0);

    advance(1_500).await;
    let status = registry.status("api").await.unwrap();
    assert!(status.total_checks >= 1);
    assert!(status.is_healthy());

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn always_failing_target_accumulates_failures() {
    let registry = Registry::new(Arc::new(Scripted::default()));
    registry.add("down", Duration::from_secs(1), "nowhere").await.unwrap();

    advance(5_500).await;
    let status = registry.status("down").await.unwrap();
    assert_eq!(status.total_checks, 5);
    assert_eq!(status.total_failures, 5);
    assert_eq!(status.consecutive_failures, 5);
    assert_eq!(status.last_success_at, None);
    assert_eq!(status.last_latency, Duration::ZERO);
    assert_eq!(status.loss_ratio(), 1.0);

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn last_success_is_sticky_across_failures() {
    let check = Scripted {
        delay: Duration::from_millis(20),
        ..Scripted::default()
    };
    check.script(
        "a",
        vec![
            Ok(Health::healthy(remote_time(1_000))),
            Err(CheckError::Status(503)),
        ],
    );
    let registry = Registry::new(Arc::new(check));
    registry.add("api", Duration::from_secs(1), "a").await.unwrap();

    advance(1_500).await;
    let after_success = registry.status("api").await.unwrap();
    assert_eq!(after_success.consecutive_failures, 0);
    assert_eq!(after_success.last_success_at, Some(remote_time(1_000)));
    assert_eq!(after_success.last_latency, Duration::from_millis(20));

    let mut previous = 0;
    for _ in 0..4 {
        advance(1_000).await;
        let s = registry.status("api").await.unwrap();
        assert!(s.consecutive_failures > previous);
        assert_eq!(s.last_success_at, after_success.last_success_at);
        assert_eq!(s.last_latency, after_success.last_latency);
        previous = s.consecutive_failures;
    }
    assert_eq!(previous, 4);

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn remote_unhealthy_verdict_is_a_failure() {
    let check = Scripted::default();
    check.script("a", vec![Ok(Health::unhealthy(remote_time(5)))]);
    let registry = Registry::new(Arc::new(check));
    registry.add("api", Duration::from_secs(1), "a").await.unwrap();

    advance(2_500).await;
    let status = registry.status("api").await.unwrap();
    assert_eq!(status.total_failures, 2);
    assert_eq!(status.last_success_at, None);

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reset_clears_history_but_keeps_cadence() {
    let check = Scripted::default();
    check.script(
        "a",
        vec![
            Ok(Health::healthy(remote_time(1))),
            Err(CheckError::Decode("eof".to_string())),
        ],
    );
    let registry = Registry::new(Arc::new(check.clone()));
    registry.add("api", Duration::from_secs(1), "a").await.unwrap();

    advance(3_500).await;
    let before = registry.status("api").await.unwrap();
    assert_eq!(before.total_checks, 3);
    assert_eq!(before.total_failures, 2);

    registry.reset("api").await.unwrap();
    let after = registry.status("api").await.unwrap();
    assert_eq!(after.total_checks, 0);
    assert_eq!(after.total_failures, 0);
    assert_eq!(after.consecutive_failures, 0);
    assert_eq!(after.last_success_at, None);
    assert_eq!(after.last_check_at, None);
    assert_eq!(after.last_latency, Duration::ZERO);
    assert!(after.started_at >= before.started_at);

    // Ticks continue at 4s and 5s.
    advance(2_000).await;
    assert_eq!(registry.status("api").await.unwrap().total_checks, 2);
    assert_eq!(check.calls(), 5);

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn remove_during_in_flight_check() {
    let check = Scripted {
        delay: Duration::from_secs(3),
        ..Scripted::default()
    };
    check.script("a", vec![Ok(Health::healthy(remote_time(1)))]);
    let registry = Registry::new(Arc::new(check.clone()));
    registry.add("api", Duration::from_secs(1), "a").await.unwrap();

    // Check dispatched at 1s, still running at 2s.
    advance(2_000).await;
    assert_eq!(check.calls(), 1);
    registry.remove("api").await.unwrap();

    assert_eq!(
        registry.status("api").await,
        Err(RegistryError::NotFound("api".to_string()))
    );

    advance(10_000).await;
    assert_eq!(check.calls(), 1);
    assert_eq!(
        registry.status("api").await,
        Err(RegistryError::NotFound("api".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn removed_id_can_be_added_again() {
    let check = Scripted::default();
    check.script("a", vec![Err(CheckError::Status(500))]);
    check.script("b", vec![Ok(Health::healthy(remote_time(7)))]);
    let registry = Registry::new(Arc::new(check));

    registry.add("api", Duration::from_secs(1), "a").await.unwrap();
    advance(2_500).await;
    registry.remove("api").await.unwrap();

    registry.add("api", Duration::from_secs(1), "b").await.unwrap();
    advance(1_500).await;
    let status = registry.status("api").await.unwrap();
    assert_eq!(status.total_checks, 1);
    assert_eq!(status.total_failures, 0);
    assert_eq!(status.last_success_at, Some(remote_time(7)));

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn targets_tick_independently() {
    let check = Scripted::default();
    check.script("fast", vec![Ok(Health::healthy(remote_time(1)))]);
    check.script("slow", vec![Ok(Health::healthy(remote_time(1)))]);
    let registry = Registry::new(Arc::new(check));

    registry.add("fast", Duration::from_millis(100), "fast").await.unwrap();
    registry.add("slow", Duration::from_millis(400), "slow").await.unwrap();

    advance(2_050).await;
    let fast = registry.status("fast").await.unwrap().total_checks;
    let slow = registry.status("slow").await.unwrap().total_checks;
    assert_eq!(fast, 20);
    assert_eq!(slow, 5);

    registry.remove("fast").await.unwrap();
    advance(2_000).await;
    assert_eq!(registry.status("slow").await.unwrap().total_checks, 10);

    registry.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_registry_stops_monitors() {
    let check = Scripted::default();
    let registry = Registry::new(Arc::new(check.clone()));
    registry.add("a", Duration::from_secs(1), "a").await.unwrap();
    registry.add("b", Duration::from_secs(1), "b").await.unwrap();

    advance(1_500).await;
    assert_eq!(check.calls(), 2);

    drop(registry);
    advance(5_000).await;
    assert_eq!(check.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn huge_interval_target_stays_registered_and_removable() {
    let check = Scripted::default();
    check.script("a", vec![Ok(Health::healthy(remote_time(3)))]);
    let registry = Registry::new(Arc::new(check.clone()));

    registry.add("big", Duration::from_secs(u64::MAX), "a").await.unwrap();
    registry.add("api", Duration::from_secs(1), "a").await.unwrap();

    advance(2_500).await;
    let big = registry.status("big").await.unwrap();
    assert_eq!(big.total_checks, 0);
    assert_eq!(registry.status("api").await.unwrap().total_checks, 2);
    assert_eq!(check.calls(), 2);

    registry.remove("big").await.unwrap();
    assert_eq!(
        registry.status("big").await,
        Err(RegistryError::NotFound("big".to_string()))
    );
    registry.shutdown().await;
}
