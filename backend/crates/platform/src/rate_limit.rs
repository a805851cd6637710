//! Rate Limiting Infrastructure
//!
//! Fixed-window request counters behind the [`RateLimitStore`] trait, with
//! an in-memory implementation for single-process deployments.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the current window resets
    pub retry_after: Duration,
}

impl RateLimitResult {
    /// `Retry-After` value in whole seconds, never zero
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

/// Rate limit backend failures
#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend unavailable: {0}")]
    Backend(String),
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one request under `key` and report whether it is allowed
    ///
    /// Increment and comparison are a single atomic step per key.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError>;
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    started: Instant,
}

/// In-memory fixed-window store
///
/// Each key lives in a sharded `DashMap`; the entry lock makes
/// read-increment-compare atomic, so concurrent bursts never undercount.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    windows: DashMap<String, RateWindow>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`RateLimitStore::check_and_increment`] against an explicit clock
    pub fn check_and_increment_at(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: Instant,
    ) -> RateLimitResult {
        let mut entry = self.windows.entry(key.to_string()).or_insert(RateWindow {
            count: 0,
            started: now,
        });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.started) >= config.window {
            window.count = 0;
            window.started = now;
        }

        window.count = window.count.saturating_add(1);
        let allowed = window.count <= config.max_requests;
        let remaining = config.max_requests.saturating_sub(window.count);
        let retry_after = config
            .window
            .saturating_sub(now.saturating_duration_since(window.started));

        RateLimitResult {
            allowed,
            remaining,
            retry_after,
        }
    }

    /// Drop windows older than `window`; returns how many were removed
    pub fn purge_expired(&self, window: Duration) -> usize {
        self.purge_expired_at(window, Instant::now())
    }

    fn purge_expired_at(&self, window: Duration, now: Instant) -> usize {
        let mut purged = 0;
        self.windows.retain(|_, w| {
            let live = now.saturating_duration_since(w.started) < window;
            purged += usize::from(!live);
            live
        });
        purged
    }

    /// Number of live windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_and_increment_at(key, config, Instant::now()))
    }
}
