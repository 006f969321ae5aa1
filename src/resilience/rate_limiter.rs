use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub quota: u32,
    pub window: Duration,
    /// Calls recorded inside the current window.
    pub recorded: usize,
    /// Permits handed out but not yet recorded or dropped.
    pub in_flight: usize,
    /// Estimated wait time until a slot frees up (ms), if currently at quota.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum calls per rolling window. 0 disables limiting.
    pub quota: u32,
    pub window: Duration,
}

impl RateLimiterConfig {
    pub fn per_minute(quota: u32) -> Self {
        Self {
            quota,
            window: Duration::from_secs(60),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.quota == 0
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

/// Timestamps of recent successful calls, oldest first.
#[derive(Debug, Default)]
struct CallLedger {
    calls: VecDeque<Instant>,
    in_flight: usize,
}

impl CallLedger {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.calls.front() {
            if now.duration_since(oldest) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn occupied(&self) -> usize {
        self.calls.len() + self.in_flight
    }

    /// Instant at which the oldest recorded call leaves the window.
    fn next_expiry(&self, window: Duration) -> Option<Instant> {
        self.calls.front().map(|oldest| *oldest + window)
    }
}

/// Rolling-window call quota ("at most K calls per window").
///
/// - Constructed once per run and shared through an `Arc`
/// - The ledger lock is only held to prune, reserve and append, never across the call itself
/// - Waiters wake on window expiry or on any ledger mutation, whichever comes first
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    ledger: Mutex<CallLedger>,
    released: Notify,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            cfg,
            ledger: Mutex::new(CallLedger::default()),
            released: Notify::new(),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, CallLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot if one is free right now.
    fn try_reserve(&self, ledger: &mut CallLedger) -> bool {
        ledger.prune(Instant::now(), self.cfg.window);
        if self.cfg.is_unlimited() || ledger.occupied() < self.cfg.quota as usize {
            ledger.in_flight += 1;
            true
        } else {
            false
        }
    }

    /// Wait for a free slot in the window (may sleep up to one window).
    pub async fn acquire(&self) -> CallPermit<'_> {
        loop {
            // Register interest before inspecting the ledger so a release between
            // the check and the wait is not lost.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wake_at = {
                let mut ledger = self.lock();
                if self.try_reserve(&mut ledger) {
                    return CallPermit::new(self);
                }
                ledger.next_expiry(self.cfg.window)
            };

            match wake_at {
                Some(at) => {
                    let wait = at.saturating_duration_since(Instant::now());
                    warn!(
                        quota = self.cfg.quota,
                        wait_ms = wait.as_millis() as u64,
                        "call quota reached, waiting for the window to roll"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = &mut notified => {}
                    }
                }
                // Every slot is held by an unrecorded permit; only a release can help.
                None => notified.await,
            }
        }
    }

    /// Try to reserve a slot without waiting.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut ledger = self.lock();
        if self.try_reserve(&mut ledger) {
            Some(CallPermit::new(self))
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let mut ledger = self.lock();
        let now = Instant::now();
        ledger.prune(now, self.cfg.window);

        let at_quota =
            !self.cfg.is_unlimited() && ledger.occupied() >= self.cfg.quota as usize;
        let estimated_wait_ms = if at_quota {
            ledger
                .next_expiry(self.cfg.window)
                .map(|at| at.saturating_duration_since(now).as_millis() as u64)
        } else {
            None
        };

        RateLimiterSnapshot {
            quota: self.cfg.quota,
            window: self.cfg.window,
            recorded: ledger.calls.len(),
            in_flight: ledger.in_flight,
            estimated_wait_ms,
        }
    }

    fn release(&self, recorded: bool) {
        {
            let mut ledger = self.lock();
            ledger.in_flight = ledger.in_flight.saturating_sub(1);
            if recorded {
                ledger.calls.push_back(Instant::now());
            }
        }
        self.released.notify_waiters();
    }
}

/// A reserved slot in the current window.
///
/// Call [`CallPermit::record`] after the external call succeeded so the call is
/// counted against the quota. Dropping the permit unrecorded gives the slot back.
#[must_use = "a permit holds a quota slot until it is recorded or dropped"]
pub struct CallPermit<'a> {
    limiter: &'a RateLimiter,
    recorded: bool,
}

impl<'a> CallPermit<'a> {
    fn new(limiter: &'a RateLimiter) -> Self {
        Self {
            limiter,
            recorded: false,
        }
    }

    pub fn record(mut self) {
        self.recorded = true;
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release(self.recorded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(quota: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::per_minute(quota))
    }

    #[test]
    fn test_rate_limiter_config_per_minute() {
        let config = RateLimiterConfig::per_minute(10);
        assert_eq!(config.quota, 10);
        assert_eq!(config.window, Duration::from_secs(60));
        assert!(!config.is_unlimited());
        assert!(RateLimiterConfig::per_minute(0).is_unlimited());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_stops_at_quota() {
        let limiter = limiter(3);
        for _ in 0..3 {
            limiter.try_acquire().expect("slot available").record();
        }
        assert!(limiter.try_acquire().is_none());

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.recorded, 3);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.estimated_wait_ms, Some(60_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outstanding_permits_count_against_quota() {
        let limiter = limiter(2);
        let a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.snapshot().in_flight, 2);
        // No recorded calls yet, so there is no expiry to predict.
        assert_eq!(limiter.snapshot().estimated_wait_ms, None);

        drop(a);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorded_slot_frees_after_window() {
        let limiter = limiter(1);
        limiter.try_acquire().unwrap().record();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(limiter.try_acquire().is_none());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_oldest_entry_to_expire() {
        let limiter = limiter(2);
        limiter.acquire().await.record();
        limiter.acquire().await.record();

        let start = Instant::now();
        limiter.acquire().await.record();
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_permit_wakes_waiter() {
        let limiter = Arc::new(limiter(1));
        let held = limiter.try_acquire().unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                limiter.acquire().await.record();
                start.elapsed()
            })
        };
        tokio::task::yield_now().await;
        drop(held);

        let waited = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken by the release")
            .unwrap();
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_quota_under_contention() {
        let quota = 10;
        let limiter = Arc::new(limiter(quota));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..25 {
            let limiter = limiter.clone();
            let stamps = stamps.clone();
            handles.push(tokio::spawn(async move {
                let permit = limiter.acquire().await;
                tokio::time::sleep(Duration::from_millis(250)).await;
                permit.record();
                stamps.lock().unwrap().push(Instant::now());
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut stamps = stamps.lock().unwrap().clone();
        stamps.sort();
        assert_eq!(stamps.len(), 25);
        for (i, start) in stamps.iter().enumerate() {
            let in_window = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < Duration::from_secs(60))
                .count();
            assert!(in_window <= quota as usize, "window starting at #{i} holds {in_window}");
        }
    }

    #[tokio::test]
    async fn test_zero_quota_is_unlimited() {
        let limiter = limiter(0);
        for _ in 0..100 {
            limiter.acquire().await.record();
        }
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.recorded, 100);
        assert_eq!(snapshot.estimated_wait_ms, None);
    }
}
