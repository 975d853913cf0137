//! Per-client sliding-window rate limiting
//!
//! State is process-local. Several relay processes do not share a view of a
//! client's history.

use crate::config::RateLimitConfig;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Time source for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    offset_millis: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_millis: AtomicU64::new(0),
        }
    }

    pub fn advance(
        &self,
        by: Duration,
    ) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
    }
}

pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    clock: Arc<dyn Clock>,
    requests: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        config: &RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            window: config.window,
            max_requests: config.max_requests,
            clock,
            requests: DashMap::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns `true` when `client_id` has used up its window; otherwise
    /// records this request and returns `false`.
    ///
    /// The prune-then-record sequence runs under the client's map entry lock.
    pub fn is_rate_limited(
        &self,
        client_id: &str,
    ) -> bool {
        let now = self.clock.now();
        let mut history = self.requests.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = history.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= self.max_requests {
            return true;
        }

        history.push_back(now);
        false
    }

    /// Forgets clients with no request inside the current window.
    pub fn sweep(&self) {
        let now = self.clock.now();
        self.requests.retain(|_, history| {
            history
                .back()
                .is_some_and(|&latest| now.saturating_duration_since(latest) < self.window)
        });
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}
