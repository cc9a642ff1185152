//! Timers for Trailforge rooms.
//!
//! Two kinds of clock drive a server:
//!
//! - [`TurnTimer`]: a cancellable one-shot per scheduled room. Arming it
//!   spawns a task that sleeps for the turn length and then runs a
//!   callback. Each arm bumps an *epoch*; the callback receives the epoch
//!   it was armed with so it can tell whether it is still the live timer
//!   once it has taken the room lock.
//! - [`PeriodicTask`]: a background job on a fixed interval (empty-room
//!   sweeps, loot decay). Missed ticks are skipped, never replayed.
//!
//! # Integration
//!
//! The turn timer lives inside the room state, under the room lock:
//!
//! ```ignore
//! let epoch = inner.timer.arm(turn_time, move |epoch| async move {
//!     room.expire_turn(expected_player, epoch).await;
//! });
//! ```
//!
//! and the callback re-checks under the lock:
//!
//! ```ignore
//! if !inner.timer.release(epoch) {
//!     return; // cancelled or re-armed while we were waiting for the lock
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant, MissedTickBehavior};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Turn timer
// ---------------------------------------------------------------------------

/// A one-shot, re-armable turn deadline.
///
/// At most one timeout task is live at a time. Re-arming or cancelling
/// aborts the previous task and bumps the epoch, so a callback that was
/// already past its sleep and waiting on a lock can detect that it lost.
#[derive(Debug, Default)]
pub struct TurnTimer {
    handle: Option<JoinHandle<()>>,
    epoch: u64,
    deadline: Option<TokioInstant>,
}

impl TurnTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any previous deadline.
    ///
    /// `on_expire` is called with the new epoch and its future is run
    /// after `after` has elapsed. Returns the new epoch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F, Fut>(&mut self, after: Duration, on_expire: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.abort_task();
        self.epoch += 1;
        let epoch = self.epoch;
        self.deadline = Some(TokioInstant::now() + after);

        self.handle = Some(tokio::spawn(async move {
            time::sleep(after).await;
            trace!(epoch, "turn timer expired");
            on_expire(epoch).await;
        }));
        debug!(epoch, after_ms = after.as_millis() as u64, "turn timer armed");
        epoch
    }

    /// Cancels any pending deadline. Idempotent.
    pub fn cancel(&mut self) {
        if self.handle.is_some() || self.deadline.is_some() {
            trace!(epoch = self.epoch, "turn timer cancelled");
        }
        self.abort_task();
        self.epoch += 1;
        self.deadline = None;
    }

    /// Claims the expiry for `epoch` from inside the timeout callback.
    ///
    /// Returns `true` if `epoch` is still current. The stored handle is
    /// detached rather than aborted, since it belongs to the caller's own
    /// task. Returns `false` if the timer was cancelled or re-armed since.
    pub fn release(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.deadline.is_none() {
            return false;
        }
        self.handle = None;
        self.deadline = None;
        true
    }

    /// The epoch of the most recent arm or cancel.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the armed deadline falls due, if any.
    pub fn deadline(&self) -> Option<TokioInstant> {
        self.deadline
    }

    /// Time left until the armed deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(TokioInstant::now()))
    }

    fn abort_task(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

// ---------------------------------------------------------------------------
// Periodic jobs
// ---------------------------------------------------------------------------

/// Configuration for a [`PeriodicTask`].
#[derive(Debug, Clone)]
pub struct PeriodicConfig {
    /// Name used in log lines.
    pub name: &'static str,
    /// Interval between runs. The first run happens one period after spawn.
    pub period: Duration,
    /// Random delay (0..max) added before the first run so jobs spawned at
    /// the same instant spread out.
    pub initial_jitter: Duration,
}

impl PeriodicConfig {
    pub fn every(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            initial_jitter: Duration::ZERO,
        }
    }
}

/// A background job that runs on a fixed interval until stopped or
/// dropped.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
    runs: Arc<AtomicU64>,
}

impl PeriodicTask {
    /// Spawns `job` to run every `config.period`.
    ///
    /// Runs never overlap: the next tick is not awaited until the job's
    /// future completes, and ticks missed meanwhile are skipped.
    pub fn spawn<F, Fut>(config: PeriodicConfig, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..max.max(1)))
        };
        let period = config.period.max(Duration::from_millis(1));
        let runs = Arc::new(AtomicU64::new(0));
        let counter = runs.clone();
        let name = config.name;

        let handle = tokio::spawn(async move {
            let start = TokioInstant::now() + period + jitter;
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                job().await;
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(job = name, run = n, "periodic job ran");
            }
        });
        debug!(job = name, period_ms = period.as_millis() as u64, "periodic job started");

        Self { name, handle, runs }
    }

    /// How many times the job has completed.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stops the job. A run in progress is aborted at its next await.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
