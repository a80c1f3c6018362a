//! Time sources for the rate limiter.
//!
//! Timestamps are floating-point seconds since the Unix epoch.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for window arithmetic.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall clock backed by `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time value, so a test can keep one handle while
/// the limiter owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Create a clock frozen at `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: f64) {
        *self.current.lock() += secs;
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: f64) {
        *self.current.lock() = secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800.0);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1000.0);
        let shared = clock.clone();
        assert_eq!(clock.now(), 1000.0);

        shared.advance(2.5);
        assert_eq!(clock.now(), 1002.5);

        clock.set(50.0);
        assert_eq!(shared.now(), 50.0);
    }
}
