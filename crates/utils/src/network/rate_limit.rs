//! Sliding-window rate limiting keyed by device or network address
//!
//! Each key keeps only the timestamps of its admitted requests inside the
//! trailing window. A request is admitted iff fewer than `max_requests`
//! timestamps remain after pruning. Stale timestamps are pruned on the hot
//! path, and a background compaction drops keys that have gone idle.

use crate::background::PeriodicTask;
use keeper_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of admitted requests per window
    pub max_requests: usize,
    /// Trailing window duration
    pub window: Duration,
    /// How often idle keys are compacted away (zero disables)
    pub compaction_interval: Duration,
    /// Keys that bypass the limiter entirely
    pub exempt_keys: HashSet<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::general()
    }
}

impl RateLimitConfig {
    /// General traffic: 500 requests per 15 minutes, health checks exempt
    #[must_use]
    pub fn general() -> Self {
        Self {
            max_requests: 500,
            window: Duration::from_secs(15 * 60),
            compaction_interval: Duration::from_secs(5 * 60),
            exempt_keys: HashSet::from([keeper_core::HEALTH_CHECK_PATH.to_string()]),
        }
    }

    /// Auth attempts: 1 request per 2 seconds per device
    #[must_use]
    pub fn auth() -> Self {
        Self {
            max_requests: 1,
            window: Duration::from_secs(2),
            compaction_interval: Duration::from_secs(60),
            exempt_keys: HashSet::new(),
        }
    }

    /// Add an exempt key
    #[must_use]
    pub fn with_exemption(mut self, key: impl Into<String>) -> Self {
        self.exempt_keys.insert(key.into());
        self
    }

    fn is_exempt(&self, key: &str) -> bool {
        self.exempt_keys.contains(key)
    }
}

/// Outcome of a rate-limit check, carrying everything needed for
/// `X-RateLimit-*` and `Retry-After` headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: usize,
    pub remaining: usize,
    /// Wait until a slot frees up; set only on rejection
    pub retry_after: Option<Duration>,
    /// Time until the oldest counted request leaves the window
    pub reset_after: Duration,
}

impl RateDecision {
    fn exempt(limit: usize) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: limit,
            retry_after: None,
            reset_after: Duration::ZERO,
        }
    }
}

/// Rate limiter implementation
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<LimiterInner>,
    compaction: Arc<PeriodicTask>,
}

#[derive(Debug)]
struct LimiterInner {
    config: RateLimitConfig,
    windows: RwLock<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter and start its background compaction
    pub fn new(config: RateLimitConfig) -> Self {
        let interval = config.compaction_interval;
        let inner = Arc::new(LimiterInner {
            config,
            windows: RwLock::new(HashMap::new()),
        });
        let compaction =
            PeriodicTask::spawn("rate_limit_compaction", interval, Arc::downgrade(&inner), |inner| {
                let removed = inner.compact();
                if removed > 0 {
                    tracing::debug!(removed, "compacted idle rate-limit keys");
                }
            });

        Self {
            inner,
            compaction: Arc::new(compaction),
        }
    }

    /// Configuration this limiter was built with
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.inner.config
    }

    /// Record a request for `key` and report whether it is admitted
    #[must_use]
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).allowed
    }

    /// Record a request for `key`, returning `Error::Throttled` on rejection
    pub fn acquire(&self, key: &str) -> Result<RateDecision> {
        let decision = self.check(key);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(Error::throttled(
                key,
                decision.retry_after.unwrap_or(self.inner.config.window),
            ))
        }
    }

    /// Record a request for `key` and return the full decision
    pub fn check(&self, key: &str) -> RateDecision {
        let config = &self.inner.config;
        if config.is_exempt(key) {
            return RateDecision::exempt(config.max_requests);
        }

        let now = Instant::now();

        // Rejections only need a read lock
        {
            let windows = self.inner.windows.read();
            if let Some(events) = windows.get(key) {
                let expired = expired_prefix(events, now, config.window);
                if events.len() - expired >= config.max_requests {
                    return self.rejection(key, events, expired, now);
                }
            }
        }

        let mut windows = self.inner.windows.write();
        let events = windows.entry(key.to_string()).or_default();
        prune(events, now, config.window);

        if events.len() >= config.max_requests {
            return self.rejection(key, events, 0, now);
        }

        events.push_back(now);
        let oldest = events.front().copied().unwrap_or(now);
        RateDecision {
            allowed: true,
            limit: config.max_requests,
            remaining: config.max_requests - events.len(),
            retry_after: None,
            reset_after: config.window.saturating_sub(now.duration_since(oldest)),
        }
    }

    /// Current decision for `key` without recording a request
    #[must_use]
    pub fn status(&self, key: &str) -> RateDecision {
        let config = &self.inner.config;
        if config.is_exempt(key) {
            return RateDecision::exempt(config.max_requests);
        }

        let now = Instant::now();
        let windows = self.inner.windows.read();
        let Some(events) = windows.get(key) else {
            return RateDecision::exempt(config.max_requests);
        };

        let expired = expired_prefix(events, now, config.window);
        let live = events.len() - expired;
        if live >= config.max_requests {
            return self.rejection(key, events, expired, now);
        }

        let reset_after = events
            .get(expired)
            .map(|oldest| config.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or_default();
        RateDecision {
            allowed: true,
            limit: config.max_requests,
            remaining: config.max_requests - live,
            retry_after: None,
            reset_after,
        }
    }

    /// Forget all recorded requests for `key`
    pub fn reset(&self, key: &str) {
        self.inner.windows.write().remove(key);
    }

    /// Prune every key and drop the ones left empty; returns how many were dropped
    pub fn compact(&self) -> usize {
        self.inner.compact()
    }

    /// Number of keys currently tracked
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.inner.windows.read().len()
    }

    /// Stop background compaction
    pub fn shutdown(&self) {
        self.compaction.cancel();
    }

    fn rejection(
        &self,
        key: &str,
        events: &VecDeque<Instant>,
        expired: usize,
        now: Instant,
    ) -> RateDecision {
        let config = &self.inner.config;
        let live = events.len() - expired;

        // A slot frees up once enough of the oldest live requests age out
        let retry_after = if config.max_requests == 0 {
            config.window
        } else {
            events
                .get(expired + live - config.max_requests)
                .map(|t| config.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(config.window)
        };
        let reset_after = events
            .get(expired)
            .map(|t| config.window.saturating_sub(now.duration_since(*t)))
            .unwrap_or_default();

        tracing::debug!(key = %key, ?retry_after, "rate limit exceeded");

        RateDecision {
            allowed: false,
            limit: config.max_requests,
            remaining: 0,
            retry_after: Some(retry_after),
            reset_after,
        }
    }
}

impl LimiterInner {
    fn compact(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|_, events| {
            prune(events, now, self.config.window);
            !events.is_empty()
        });
        before - windows.len()
    }
}

/// Number of leading timestamps that are outside the window
fn expired_prefix(events: &VecDeque<Instant>, now: Instant, window: Duration) -> usize {
    events
        .iter()
        .position(|t| now.duration_since(*t) < window)
        .unwrap_or(events.len())
}

fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = events.front() {
        if now.duration_since(*front) < window {
            break;
        }
        events.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: usize, window: Duration) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window,
            compaction_interval: Duration::ZERO,
            exempt_keys: HashSet::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_allows_up_to_ceiling() {
        let limiter = RateLimiter::new(config(5, Duration::from_secs(60)));

        for _ in 0..5 {
            assert!(limiter.allow("127.0.0.1"));
        }
        assert!(!limiter.allow("127.0.0.1"));

        // Other keys are independent
        assert!(limiter.allow("192.168.1.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(config(2, Duration::from_secs(10)));

        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));

        // First request leaves the window at t=10
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_reports_retry_after() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(2)));

        assert!(limiter.check("device").allowed);
        tokio::time::advance(Duration::from_millis(500)).await;

        let decision = limiter.check("device");
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.retry_after, Some(Duration::from_millis(1500)));

        let err = limiter.acquire("device").unwrap_err();
        assert!(matches!(err, Error::Throttled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(2)));

        assert!(limiter.allow("device"));
        for _ in 0..10 {
            tokio::time::advance(Duration::from_millis(100)).await;
            assert!(!limiter.allow("device"));
        }
        // Only the admitted request counts against the window
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.allow("device"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exempt_keys_bypass() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(60)).with_exemption("/health"));

        for _ in 0..10 {
            assert!(limiter.allow("/health"));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_does_not_record() {
        let limiter = RateLimiter::new(config(3, Duration::from_secs(60)));
        assert!(limiter.allow("k"));

        let status = limiter.status("k");
        assert!(status.allowed);
        assert_eq!(status.remaining, 2);
        assert_eq!(limiter.status("k").remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compaction_forgets_idle_keys() {
        let limiter = RateLimiter::new(config(3, Duration::from_secs(10)));
        limiter.allow("a");
        limiter.allow("b");
        tokio::time::advance(Duration::from_secs(5)).await;
        limiter.allow("b");

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(limiter.compact(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_compaction() {
        let limiter = RateLimiter::new(RateLimitConfig {
            compaction_interval: Duration::from_secs(30),
            ..config(3, Duration::from_secs(10))
        });
        limiter.allow("a");

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presets() {
        let general = RateLimiter::new(RateLimitConfig::general());
        assert!(general.allow(keeper_core::HEALTH_CHECK_PATH));
        assert_eq!(general.config().max_requests, 500);

        let auth = RateLimiter::new(RateLimitConfig::auth());
        assert!(auth.allow("device-1"));
        assert!(!auth.allow("device-1"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(auth.allow("device-1"));
    }
}
