//! Integration tests for the turn timer and periodic jobs.
//!
//! Uses paused Tokio time so sleeps resolve as soon as the runtime is idle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use trailforge_timer::{PeriodicConfig, PeriodicTask, TurnTimer};

// =========================================================================
// Helpers
// =========================================================================

/// Arms `timer` so that expiry sends the epoch on the returned channel.
fn arm_reporting(
    timer: &mut TurnTimer,
    after: Duration,
    tx: &mpsc::UnboundedSender<u64>,
) -> u64 {
    let tx = tx.clone();
    timer.arm(after, move |epoch| async move {
        let _ = tx.send(epoch);
    })
}

// =========================================================================
// TurnTimer
// =========================================================================

#[test]
fn test_new_timer_is_idle() {
    let t = TurnTimer::new();
    assert!(!t.is_armed());
    assert_eq!(t.epoch(), 0);
    assert_eq!(t.remaining(), None);
}

#[tokio::test(start_paused = true)]
async fn test_armed_timer_fires_after_duration() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    let start = tokio::time::Instant::now();

    let epoch = arm_reporting(&mut t, Duration::from_secs(20), &tx);

    assert_eq!(rx.recv().await, Some(epoch));
    assert!(start.elapsed() >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    arm_reporting(&mut t, Duration::from_secs(20), &tx);

    t.cancel();
    assert!(!t.is_armed());

    let result = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(result.is_err(), "cancelled timer should not fire");
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_previous_deadline() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    let first = arm_reporting(&mut t, Duration::from_secs(10), &tx);
    let second = arm_reporting(&mut t, Duration::from_secs(20), &tx);

    assert!(second > first);
    assert_eq!(rx.recv().await, Some(second));
    let result = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(result.is_err(), "only the latest arm should fire");
}

#[tokio::test(start_paused = true)]
async fn test_release_claims_current_epoch_once() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    let stale = arm_reporting(&mut t, Duration::from_secs(10), &tx);
    let epoch = arm_reporting(&mut t, Duration::from_secs(10), &tx);

    assert!(!t.release(stale));
    assert!(t.release(epoch));
    assert!(!t.is_armed());
    assert!(!t.release(epoch), "second release must fail");
}

#[tokio::test(start_paused = true)]
async fn test_release_after_cancel_fails() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    let epoch = arm_reporting(&mut t, Duration::from_secs(10), &tx);

    t.cancel();

    assert!(!t.release(epoch));
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut t = TurnTimer::new();
    arm_reporting(&mut t, Duration::from_secs(20), &tx);

    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(t.remaining(), Some(Duration::from_secs(15)));
}

// =========================================================================
// PeriodicTask
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_periodic_job_runs_each_period() {
    let count = Arc::new(AtomicU64::new(0));
    let seen = count.clone();
    let task = PeriodicTask::spawn(PeriodicConfig::every("sweep", Duration::from_secs(10)), move || {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::Relaxed);
        }
    });

    tokio::time::sleep(Duration::from_secs(35)).await;
    tokio::task::yield_now().await;

    assert_eq!(count.load(Ordering::Relaxed), 3);
    assert_eq!(task.runs(), 3);
    assert_eq!(task.name(), "sweep");
}

#[tokio::test(start_paused = true)]
async fn test_stopped_job_does_not_run_again() {
    let count = Arc::new(AtomicU64::new(0));
    let seen = count.clone();
    let task = PeriodicTask::spawn(PeriodicConfig::every("decay", Duration::from_secs(10)), move || {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::Relaxed);
        }
    });

    tokio::time::sleep(Duration::from_secs(15)).await;
    task.stop();
    tokio::time::sleep(Duration::from_secs(50)).await;

    assert_eq!(count.load(Ordering::Relaxed), 1);
}
