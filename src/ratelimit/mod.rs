//! Per-user sliding-window rate limiting.

mod clock;
mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{
    spawn_sweeper, SlidingWindowLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MINUTES,
};
