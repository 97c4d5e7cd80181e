// Rate limiter for API calls.
//
// Both moderation APIs throttle around 1 QPS, so each client owns one of
// these and acquires it before every outbound request. The limiter enforces
// a minimum interval between consecutive calls, measured from the start of
// the previous call: if the interval hasn't elapsed, the caller sleeps for
// the remainder.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Enforces a minimum interval between consecutive requests.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    /// Minimum time between requests
    interval: Duration,
    /// When the last request was allowed through
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a rate limiter with a minimum interval of `interval_secs`
    /// between consecutive requests.
    pub fn new(interval_secs: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval: Duration::from_secs_f64(interval_secs),
                last_request: None,
            })),
        }
    }

    /// The configured minimum interval. Backoff schedules start from this.
    pub async fn interval(&self) -> Duration {
        self.inner.lock().await.interval
    }

    /// Wait until a request is allowed, then return.
    ///
    /// If we're within the rate limit, this returns immediately.
    /// If we need to wait, it sleeps for the appropriate duration.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        if let Some(last) = inner.last_request {
            let elapsed = now.duration_since(last);
            if elapsed < inner.interval {
                let sleep_time = inner.interval - elapsed;
                // Drop the lock before sleeping so other tasks aren't blocked
                drop(inner);
                tokio::time::sleep(sleep_time).await;
                // Re-acquire after sleeping
                inner = self.inner.lock().await;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}
