//! Core rate limiter implementation.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use crate::config::RateLimitingConfig;

/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: usize = 20;
/// Default window length in minutes.
pub const DEFAULT_WINDOW_MINUTES: f64 = 1.0;

/// Sliding-window limiter keyed by user identity.
///
/// Each user keeps the timestamps of their admitted requests. A call prunes
/// timestamps that have left the trailing window, then admits only if fewer
/// than `max_requests` remain. Denied calls record nothing.
///
/// The map is sharded, and the prune-check-append sequence runs while holding
/// the user's entry, so concurrent calls for one user cannot over-admit while
/// calls for different users rarely contend.
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    /// Admitted request timestamps, oldest first, per user
    requests: DashMap<String, Vec<f64>>,
    max_requests: usize,
    window_minutes: f64,
    clock: C,
}

impl SlidingWindowLimiter<SystemClock> {
    /// Create a limiter on the system clock.
    pub fn new(max_requests: usize, window_minutes: f64) -> Self {
        Self::with_clock(max_requests, window_minutes, SystemClock)
    }

    /// Create a limiter from the `rate_limiting` configuration section.
    pub fn from_config(config: &RateLimitingConfig) -> Self {
        Self::new(config.max_requests, config.window_minutes)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter on a caller-supplied clock.
    pub fn with_clock(max_requests: usize, window_minutes: f64, clock: C) -> Self {
        debug!(max_requests, window_minutes, "Creating sliding window rate limiter");
        Self {
            requests: DashMap::new(),
            max_requests,
            window_minutes,
            clock,
        }
    }

    fn window_secs(&self) -> f64 {
        self.window_minutes * 60.0
    }

    /// Decide whether `user_id` may perform one more action now.
    pub fn is_allowed(&self, user_id: &str) -> bool {
        let mut timestamps = self.requests.entry(user_id.to_owned()).or_default();

        let now = self.clock.now();
        let window_start = now - self.window_secs();
        timestamps.retain(|&t| t > window_start);

        if timestamps.len() >= self.max_requests {
            debug!(
                user = %user_id,
                in_window = timestamps.len(),
                limit = self.max_requests,
                "Rate limit exceeded"
            );
            return false;
        }

        timestamps.push(now);
        trace!(user = %user_id, in_window = timestamps.len(), "Request admitted");
        true
    }

    /// Drop users with no timestamps left in the window. Returns how many
    /// entries were removed.
    pub fn evict_idle(&self) -> usize {
        let window_start = self.clock.now() - self.window_secs();
        let mut evicted = 0;

        self.requests.retain(|_, timestamps| {
            timestamps.retain(|&t| t > window_start);
            let keep = !timestamps.is_empty();
            if !keep {
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            debug!(evicted, remaining = self.requests.len(), "Evicted idle rate limit entries");
        }
        evicted
    }

    /// Number of requests currently recorded for `user_id`, without pruning.
    pub fn recorded(&self, user_id: &str) -> usize {
        self.requests.get(user_id).map_or(0, |t| t.len())
    }

    /// Number of tracked users.
    pub fn user_count(&self) -> usize {
        self.requests.len()
    }

    /// Forget every user.
    ///
    /// This is primarily useful for testing.
    pub fn reset(&self) {
        self.requests.clear();
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window_minutes(&self) -> f64 {
        self.window_minutes
    }
}

impl Default for SlidingWindowLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MINUTES)
    }
}

/// Run [`SlidingWindowLimiter::evict_idle`] every `interval` until the task is aborted.
pub fn spawn_sweeper<C>(
    limiter: Arc<SlidingWindowLimiter<C>>,
    interval: Duration,
) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.evict_idle();
        }
    })
}
