//! Sliding-window rate limiting keyed by method name.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::RateLimitError;

/// Current window occupancy for one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateStats {
    pub count: usize,
    pub limit: usize,
}

#[derive(Debug)]
struct Bucket {
    hits: VecDeque<Instant>,
    last_active: Instant,
}

impl Bucket {
    const fn new(now: Instant) -> Self {
        Self {
            hits: VecDeque::new(),
            last_active: now,
        }
    }

    /// Drop timestamps that have left the window.
    fn prune(&mut self, now: Instant, window: Duration) {
        while self
            .hits
            .front()
            .is_some_and(|&hit| now.duration_since(hit) >= window)
        {
            self.hits.pop_front();
        }
    }
}

/// Per-method sliding-window limiter.
///
/// Rejected calls are not recorded, so a method never holds more than
/// `max_requests` timestamps. The table is bounded by `history_cap`; past it,
/// the methods idle the longest are evicted first.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    history_cap: usize,
    timeout: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            history_cap: config.history_cap,
            timeout: config.timeout(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Shorthand for a limiter with the default history cap and timeout.
    #[must_use]
    pub fn with_limit(max_requests: usize, window: Duration) -> Self {
        let config = RateLimitConfig {
            max_requests,
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            ..RateLimitConfig::default()
        };
        Self::new(&config)
    }

    /// Count a call to `method`.
    ///
    /// # Errors
    /// Returns `Exceeded` if the call would put the method over its limit.
    pub fn check(&self, method: &str) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut buckets = self.buckets();

        let bucket = buckets
            .entry(method.to_string())
            .or_insert_with(|| Bucket::new(now));
        bucket.prune(now, self.window);
        bucket.last_active = now;

        if bucket.hits.len() >= self.max_requests {
            debug!(method, count = bucket.hits.len(), limit = self.max_requests, "rate limited");
            return Err(RateLimitError::Exceeded(method.to_string()));
        }
        bucket.hits.push_back(now);

        if stored(&buckets) > self.history_cap {
            self.compact(&mut buckets, now);
        }
        Ok(())
    }

    /// Forget history for one method, or for all of them.
    pub fn reset(&self, method: Option<&str>) {
        let mut buckets = self.buckets();
        match method {
            Some(method) => {
                buckets.remove(method);
            }
            None => buckets.clear(),
        }
    }

    /// Calls to `method` still inside the window.
    #[must_use]
    pub fn stats(&self, method: &str) -> RateStats {
        let now = Instant::now();
        let count = self.buckets().get_mut(method).map_or(0, |bucket| {
            bucket.prune(now, self.window);
            bucket.hits.len()
        });

        RateStats {
            count,
            limit: self.max_requests,
        }
    }

    /// Drop empty buckets, then evict idle methods while over the history cap.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets();
        self.compact(&mut buckets, now);
    }

    /// Run `future`, failing if it takes longer than the configured timeout.
    ///
    /// # Errors
    /// Returns `Timeout` naming `key` when the budget runs out; the future is
    /// dropped at that point.
    pub async fn execute_with_timeout<F: Future>(
        &self,
        key: &str,
        future: F,
    ) -> Result<F::Output, RateLimitError> {
        tokio::time::timeout(self.timeout, future).await.map_err(|_| {
            warn!(key, after_ms = self.timeout.as_millis(), "timed out");
            RateLimitError::Timeout {
                key: key.to_string(),
                after: self.timeout,
            }
        })
    }

    fn compact(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) {
        for bucket in buckets.values_mut() {
            bucket.prune(now, self.window);
        }
        buckets.retain(|_, bucket| !bucket.hits.is_empty());

        let mut total = stored(buckets);
        if total <= self.history_cap {
            return;
        }

        let mut by_age: Vec<(String, Instant)> = buckets
            .iter()
            .map(|(method, bucket)| (method.clone(), bucket.last_active))
            .collect();
        by_age.sort_by_key(|(_, last_active)| *last_active);

        for (method, _) in by_age {
            if total <= self.history_cap {
                break;
            }
            if let Some(bucket) = buckets.remove(&method) {
                total -= bucket.hits.len();
                debug!(method = %method, dropped = bucket.hits.len(), "evicted rate history");
            }
        }
    }

    fn buckets(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stored(buckets: &HashMap<String, Bucket>) -> usize {
    buckets.values().map(|bucket| bucket.hits.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::with_limit(max, Duration::from_millis(window_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_call_is_rejected() {
        let limiter = limiter(2, 1000);

        assert!(limiter.check("x").is_ok());
        assert!(limiter.check("x").is_ok());
        let err = limiter.check("x").unwrap_err();
        assert_eq!(err.to_string(), "Rate limit exceeded for x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = limiter(2, 1000);
        limiter.check("x").unwrap();
        limiter.check("x").unwrap();
        assert!(limiter.check("x").is_err());

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(limiter.check("x").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_are_not_recorded() {
        let limiter = limiter(1, 1000);
        limiter.check("x").unwrap();
        for _ in 0..5 {
            assert!(limiter.check("x").is_err());
        }
        assert_eq!(limiter.stats("x"), RateStats { count: 1, limit: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_methods_are_independent() {
        let limiter = limiter(1, 1000);
        limiter.check("a").unwrap();
        assert!(limiter.check("b").is_ok());
        assert!(limiter.check("a").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let limiter = limiter(1, 60_000);
        limiter.check("a").unwrap();
        limiter.check("b").unwrap();

        limiter.reset(Some("a"));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("b").is_err());

        limiter.reset(None);
        assert!(limiter.check("b").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_prunes_expired() {
        let limiter = limiter(10, 1000);
        limiter.check("x").unwrap();
        limiter.check("x").unwrap();
        assert_eq!(limiter.stats("x").count, 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(limiter.stats("x").count, 0);
        assert_eq!(limiter.stats("never").count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_cap_evicts_least_recent() {
        let config = RateLimitConfig {
            max_requests: 10,
            history_cap: 4,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(&config);

        limiter.check("old").unwrap();
        limiter.check("old").unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        limiter.check("mid").unwrap();
        limiter.check("mid").unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        limiter.check("new").unwrap();

        assert_eq!(limiter.stats("old").count, 0);
        assert_eq!(limiter.stats("mid").count, 2);
        assert_eq!(limiter.stats("new").count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_empty_buckets() {
        let limiter = limiter(5, 1000);
        limiter.check("x").unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;

        limiter.cleanup();
        assert!(limiter.buckets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_with_timeout() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            timeout_ms: 100,
            ..RateLimitConfig::default()
        });

        assert_eq!(limiter.execute_with_timeout("fast", async { 7 }).await, Ok(7));

        let err = limiter
            .execute_with_timeout("slow", tokio::time::sleep(Duration::from_secs(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, RateLimitError::Timeout { ref key, .. } if key == "slow"));
    }
}
