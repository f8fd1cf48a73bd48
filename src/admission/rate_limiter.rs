// Per-client sliding-window rate limiting for send-push requests

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of admitted requests per client within one window
pub const DEFAULT_RATE_LIMIT: usize = 30;

/// Default trailing window length
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// In-memory per-client limiter with sliding-window buckets.
///
/// Each bucket holds the instants of admitted requests still inside the
/// trailing window. Pruning, counting and recording happen while holding the
/// bucket's entry lock, so two concurrent requests from the same client can
/// never both take the last free slot.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    limit: usize,
    window: Duration,
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per `window` per client
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                limit,
                window,
                buckets: DashMap::new(),
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Returns `true` if the request is admitted, `false` if rate-limited.
    ///
    /// Admitted requests are recorded at `now`; denied ones are not.
    pub fn check(&self, client_id: &str, now: Instant) -> bool {
        let window = self.inner.window;
        let mut bucket = self
            .inner
            .buckets
            .entry(client_id.to_string())
            .or_default();

        // Timestamps are appended in order, so stale ones sit at the front
        while let Some(&oldest) = bucket.front() {
            if now.saturating_duration_since(oldest) >= window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.inner.limit {
            return false;
        }

        bucket.push_back(now);
        true
    }

    /// Number of requests currently recorded for a client
    pub fn recorded(&self, client_id: &str) -> usize {
        self.inner
            .buckets
            .get(client_id)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Number of clients with a bucket
    pub fn tracked_clients(&self) -> usize {
        self.inner.buckets.len()
    }

    /// Drop buckets whose every timestamp has left the window.
    ///
    /// Only removes state that the next `check` would have pruned anyway.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let window = self.inner.window;
        let before = self.inner.buckets.len();
        self.inner.buckets.retain(|_, bucket| {
            bucket
                .back()
                .map(|newest| now.saturating_duration_since(*newest) < window)
                .unwrap_or(false)
        });
        before.saturating_sub(self.inner.buckets.len())
    }

    /// Spawn a background task that purges idle buckets once per window
    pub fn start_cleanup_task(limiter: RateLimiter) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window());
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = limiter.purge_idle(Instant::now());
                if removed > 0 {
                    log::debug!("Purged {} idle rate-limit buckets", removed);
                }
            }
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit())
            .field("window", &self.window())
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT, DEFAULT_RATE_WINDOW)
    }
}
