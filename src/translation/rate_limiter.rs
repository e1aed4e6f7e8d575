/*!
 * Burst-safe rate limiting for transform calls.
 *
 * Two rules are enforced together on every `acquire()`:
 * - a sliding window: at most `max_calls` calls in any `window`
 * - a minimum spacing between consecutive calls
 *
 * The spacing rule smooths calls across the window so the service never sees
 * a cluster of requests, even when the rolling average is within budget. The
 * window is the hard ceiling behind it.
 *
 * One limiter is shared by every job talking to the same service account.
 * Waiters queue on a fair async mutex and are admitted in arrival order.
 */

use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

use crate::app_config::RateLimitConfig;

/// Counters reported by [`RateLimiter::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Calls admitted since creation
    pub admitted: u64,
    /// Calls admitted after having to wait
    pub delayed: u64,
    /// Total time callers spent blocked in `acquire()`
    pub total_wait: Duration,
    /// Calls currently inside the sliding window
    pub in_window: usize,
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Admission times inside the current window, oldest first
    calls: VecDeque<Instant>,
    last_call: Option<Instant>,
    admitted: u64,
    delayed: u64,
    total_wait: Duration,
}

impl LimiterState {
    fn evict_expired(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.calls.front() {
            if now.duration_since(front) >= window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Shared gate in front of every external call
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_calls: usize,
    min_spacing: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Create a limiter; `max_calls` is clamped to at least one
    pub fn new(window: Duration, max_calls: usize, min_spacing: Duration) -> Self {
        Self {
            window,
            max_calls: max_calls.max(1),
            min_spacing,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_calls_per_window, config.min_spacing())
    }

    /// Block until one external call may be issued, then record it.
    ///
    /// Returns how long the caller waited. The lock is held while sleeping so
    /// admissions are strictly serialized.
    pub async fn acquire(&self) -> Duration {
        let mut state = self.state.lock().await;
        let started = Instant::now();

        loop {
            let now = Instant::now();
            state.evict_expired(now, self.window);

            let mut ready_at = now;
            if state.calls.len() >= self.max_calls {
                if let Some(&front) = state.calls.front() {
                    ready_at = ready_at.max(front + self.window);
                }
            }
            if let Some(last) = state.last_call {
                ready_at = ready_at.max(last + self.min_spacing);
            }

            if ready_at <= now {
                break;
            }
            debug!(
                "Rate limiter holding call for {:?} ({} in window)",
                ready_at - now,
                state.calls.len()
            );
            sleep_until(ready_at).await;
        }

        let now = Instant::now();
        let waited = now.duration_since(started);
        if state.calls.len() >= self.max_calls {
            state.calls.pop_front();
        }
        state.calls.push_back(now);
        state.last_call = Some(now);
        state.admitted += 1;
        if !waited.is_zero() {
            state.delayed += 1;
            state.total_wait += waited;
        }
        waited
    }

    /// Snapshot of the limiter counters
    pub async fn stats(&self) -> RateLimiterStats {
        let mut state = self.state.lock().await;
        state.evict_expired(Instant::now(), self.window);
        RateLimiterStats {
            admitted: state.admitted,
            delayed: state.delayed,
            total_wait: state.total_wait,
            in_window: state.calls.len(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }
}
