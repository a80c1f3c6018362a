//! Shared state handed to every request handler.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::conversation::Assistant;
use crate::ratelimit::SlidingWindowLimiter;
use crate::whatsapp::MessageSender;

/// Process-lifetime state shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub assistant: Arc<Assistant>,
    pub sender: Arc<dyn MessageSender>,
    pub stats: Arc<MessageStats>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        limiter: Arc<SlidingWindowLimiter>,
        assistant: Arc<Assistant>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            limiter,
            assistant,
            sender,
            stats: Arc::new(MessageStats::new()),
        }
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.security.webhook_secret.as_deref()
    }

    /// Current counters plus the live user and conversation counts.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_messages_received: self.stats.received.load(Ordering::Relaxed),
            total_messages_sent: self.stats.sent.load(Ordering::Relaxed),
            total_rate_limited: self.stats.rate_limited.load(Ordering::Relaxed),
            total_users: self.limiter.user_count(),
            active_conversations: self.assistant.active_conversations(),
            last_reset: *self.stats.last_reset.lock(),
        }
    }
}

/// Message counters since startup or the last reset.
#[derive(Debug)]
pub struct MessageStats {
    received: AtomicU64,
    sent: AtomicU64,
    rate_limited: AtomicU64,
    last_reset: Mutex<DateTime<Utc>>,
}

impl MessageStats {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            last_reset: Mutex::new(Utc::now()),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.received.store(0, Ordering::Relaxed);
        self.sent.store(0, Ordering::Relaxed);
        self.rate_limited.store(0, Ordering::Relaxed);
        *self.last_reset.lock() = Utc::now();
    }
}

impl Default for MessageStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`MessageStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_messages_received: u64,
    pub total_messages_sent: u64,
    pub total_rate_limited: u64,
    pub total_users: usize,
    pub active_conversations: usize,
    pub last_reset: DateTime<Utc>,
}
