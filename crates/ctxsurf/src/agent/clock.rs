//! Injectable time source for the session core.
//!
//! Everything time-dependent in [`SessionManager`](super::session::SessionManager)
//! (checkpoint timestamps, throttled checks, the periodic monitor) goes
//! through a [`Clock`], so tests can drive time with [`ManualClock`]
//! instead of waiting on real timers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Wall-clock reading plus a way to wait.
pub trait Clock: Send + Sync {
    /// Current time as Unix epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Real time via `chrono` and `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test clock. Time only moves when told to; `sleep` advances it
/// instantly instead of waiting.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Minimum-spacing gate for periodic work.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: i64,
    last_ms: Option<i64>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as i64,
            last_ms: None,
        }
    }

    /// Continue from a previously recorded run (e.g. read from a stamp file).
    pub fn resume(mut self, last_ms: Option<i64>) -> Self {
        self.last_ms = last_ms;
        self
    }

    pub fn last_ms(&self) -> Option<i64> {
        self.last_ms
    }

    /// If at least one interval has passed since the last accepted call,
    /// record `now_ms` and return `true`. The first call always passes.
    pub fn try_acquire(&mut self, now_ms: i64) -> bool {
        if let Some(last) = self.last_ms
            && now_ms - last < self.interval_ms
        {
            return false;
        }
        self.last_ms = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_sleep_advances() {
        let clock = ManualClock::new(1_000);
        clock.sleep(Duration::from_secs(2)).await;
        assert_eq!(clock.now_ms(), 3_000);

        let shared = clock.clone();
        shared.advance(Duration::from_millis(5));
        assert_eq!(clock.now_ms(), 3_005);
    }

    #[test]
    fn manual_clock_set_is_shared() {
        let clock = ManualClock::new(0);
        let shared = clock.clone();
        shared.set(42_000);
        assert_eq!(clock.now_ms(), 42_000);
        clock.advance(Duration::from_secs(1));
        assert_eq!(shared.now_ms(), 43_000);
    }

    #[test]
    fn system_clock_is_recent() {
        // 2020-01-01 in epoch millis.
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn throttle_spacing() {
        let mut t = Throttle::new(Duration::from_secs(10));
        assert!(t.try_acquire(0));
        assert!(!t.try_acquire(9_999));
        assert!(t.try_acquire(10_000));
        assert_eq!(t.last_ms(), Some(10_000));
    }

    #[test]
    fn throttle_resume_honors_previous_run() {
        let mut t = Throttle::new(Duration::from_secs(60)).resume(Some(100_000));
        assert!(!t.try_acquire(130_000));
        assert!(t.try_acquire(160_000));
    }
}
