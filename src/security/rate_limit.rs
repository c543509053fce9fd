//! Per-identity rate limiting ahead of dispatch.
//!
//! # Design Decisions
//! - `RateLimitPolicy` is the seam; the gateway only needs allow / reject
//! - Default policy: fixed windows per tier, every tier must pass
//! - Exceeding a tier with `block_secs > 0` blocks the identity for that long
//! - Settings are swapped atomically on config reload; counters restart
//! - Identities whose windows and blocks have all lapsed are swept every
//!   `SWEEP_INTERVAL` checks

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::{RateLimitConfig, RateLimitTier};
use crate::http::request::client_identity;
use crate::observability::metrics;

/// Checks between sweeps of lapsed identities.
pub const SWEEP_INTERVAL: u64 = 1024;

/// Result of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    /// Limiting is off for this request.
    Unlimited,
    /// Within limits. `limit` lists every tier's points, `remaining` is for the first tier.
    Allowed { limit: String, remaining: u32 },
    /// Over a tier's limit.
    Rejected { tier: String, retry_after: Duration },
}

/// Pass/reject decision for a client identity.
pub trait RateLimitPolicy: Send + Sync {
    fn check(&self, identity: &str, now: Instant) -> RateDecision;
}

#[derive(Debug, Clone)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
    blocked_until: Option<Instant>,
}

impl WindowCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            blocked_until: None,
        }
    }

    /// Consume one point; on rejection return how long the caller must wait.
    fn consume(&mut self, tier: &RateLimitTier, now: Instant) -> Result<u32, Duration> {
        if let Some(until) = self.blocked_until {
            if now < until {
                return Err(until - now);
            }
            *self = WindowCounter::new(now);
        }

        let window = Duration::from_secs(tier.window_secs);
        if now.saturating_duration_since(self.window_start) >= window {
            self.window_start = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        if self.count <= tier.points {
            return Ok(tier.points - self.count);
        }

        if tier.block_secs > 0 {
            let block = Duration::from_secs(tier.block_secs);
            self.blocked_until = Some(now + block);
            Err(block)
        } else {
            Err((self.window_start + window).saturating_duration_since(now))
        }
    }

    /// Whether this counter would start from scratch on the next request.
    fn is_lapsed(&self, tier: &RateLimitTier, now: Instant) -> bool {
        let unblocked = self.blocked_until.map_or(true, |until| now >= until);
        let window = Duration::from_secs(tier.window_secs);
        unblocked && now.saturating_duration_since(self.window_start) >= window
    }
}

/// Fixed-window, multi-tier limiter keyed by client identity.
pub struct WindowedRateLimiter {
    settings: ArcSwap<RateLimitConfig>,
    counters: DashMap<String, Vec<WindowCounter>>,
    checks: AtomicU64,
}

impl WindowedRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            settings: ArcSwap::from_pointee(config),
            counters: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    /// Swap in new settings; existing windows are discarded.
    pub fn reconfigure(&self, config: RateLimitConfig) {
        tracing::info!(
            enabled = config.enabled,
            tiers = config.tiers.len(),
            "Rate limit settings reloaded"
        );
        self.settings.store(Arc::new(config));
        self.counters.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.load().enabled
    }

    pub fn tracked_identities(&self) -> usize {
        self.counters.len()
    }

    /// Forget identities whose every tier has lapsed as of `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        let settings = self.settings.load();
        let before = self.counters.len();
        self.counters.retain(|_, counters| {
            counters.len() != settings.tiers.len()
                || !settings
                    .tiers
                    .iter()
                    .zip(counters.iter())
                    .all(|(tier, counter)| counter.is_lapsed(tier, now))
        });
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.counters.len(), "Swept idle rate limit counters");
        }
        removed
    }
}

impl RateLimitPolicy for WindowedRateLimiter {
    fn check(&self, identity: &str, now: Instant) -> RateDecision {
        let settings = self.settings.load();
        if !settings.enabled || settings.tiers.is_empty() {
            return RateDecision::Unlimited;
        }

        // Sweep before taking an entry; `retain` locks every shard.
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep(now);
        }

        let mut counters = self
            .counters
            .entry(identity.to_string())
            .or_insert_with(|| vec![WindowCounter::new(now); settings.tiers.len()]);
        if counters.len() != settings.tiers.len() {
            *counters = vec![WindowCounter::new(now); settings.tiers.len()];
        }

        let mut first_remaining = None;
        for (tier, counter) in settings.tiers.iter().zip(counters.iter_mut()) {
            match counter.consume(tier, now) {
                Ok(remaining) => {
                    first_remaining.get_or_insert(remaining);
                }
                Err(retry_after) => {
                    return RateDecision::Rejected {
                        tier: tier.name.clone(),
                        retry_after,
                    };
                }
            }
        }

        RateDecision::Allowed {
            limit: settings
                .tiers
                .iter()
                .map(|t| t.points.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            remaining: first_remaining.unwrap_or(0),
        }
    }
}

/// Whole seconds to wait, rounded up.
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Middleware function for rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(policy): State<Arc<dyn RateLimitPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(addr.ip());

    match policy.check(&identity, Instant::now()) {
        RateDecision::Unlimited => next.run(request).await,
        RateDecision::Allowed { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&limit) {
                headers.insert("x-ratelimit-limit", value);
            }
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        RateDecision::Rejected { tier, retry_after } => {
            tracing::warn!(client = %identity, tier = %tier, "Rate limit exceeded");
            metrics::record_rate_limited(&tier);
            let mut response = (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from(retry_after_secs(retry_after)));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tiers: Vec<RateLimitTier>) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            tiers,
        }
    }

    fn tier(name: &str, points: u32, window_secs: u64, block_secs: u64) -> RateLimitTier {
        RateLimitTier {
            name: name.into(),
            points,
            window_secs,
            block_secs,
        }
    }

    #[test]
    fn test_disabled_is_unlimited() {
        let limiter = WindowedRateLimiter::new(RateLimitConfig::default());
        assert_eq!(limiter.check("a", Instant::now()), RateDecision::Unlimited);
        assert_eq!(limiter.tracked_identities(), 0);
    }

    #[test]
    fn test_window_resets() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 2, 10, 0)]));
        let start = Instant::now();

        assert!(matches!(limiter.check("a", start), RateDecision::Allowed { remaining: 1, .. }));
        assert!(matches!(limiter.check("a", start), RateDecision::Allowed { remaining: 0, .. }));
        let rejected = limiter.check("a", start + Duration::from_secs(4));
        assert_eq!(
            rejected,
            RateDecision::Rejected {
                tier: "t".into(),
                retry_after: Duration::from_secs(6)
            }
        );

        let next_window = start + Duration::from_secs(10);
        assert!(matches!(limiter.check("a", next_window), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_block_duration() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 1, 1, 30)]));
        let start = Instant::now();

        assert!(matches!(limiter.check("a", start), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a", start), RateDecision::Rejected { .. }));

        // Window has rolled over but the block still holds.
        let during = start + Duration::from_secs(5);
        assert_eq!(
            limiter.check("a", during),
            RateDecision::Rejected {
                tier: "t".into(),
                retry_after: Duration::from_secs(25)
            }
        );

        let after = start + Duration::from_secs(31);
        assert!(matches!(limiter.check("a", after), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 1, 60, 0)]));
        let now = Instant::now();
        assert!(matches!(limiter.check("a", now), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a", now), RateDecision::Rejected { .. }));
        assert!(matches!(limiter.check("b", now), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_every_tier_must_pass() {
        let limiter = WindowedRateLimiter::new(config(vec![
            tier("short", 10, 60, 0),
            tier("long", 2, 600, 0),
        ]));
        let now = Instant::now();

        match limiter.check("a", now) {
            RateDecision::Allowed { limit, remaining } => {
                assert_eq!(limit, "10, 2");
                assert_eq!(remaining, 9);
            }
            other => panic!("unexpected {:?}", other),
        }
        limiter.check("a", now);
        match limiter.check("a", now) {
            RateDecision::Rejected { tier, .. } => assert_eq!(tier, "long"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reconfigure_resets_counters() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 1, 60, 0)]));
        let now = Instant::now();
        limiter.check("a", now);
        assert!(matches!(limiter.check("a", now), RateDecision::Rejected { .. }));

        limiter.reconfigure(config(vec![tier("t", 5, 60, 0)]));
        assert!(matches!(limiter.check("a", now), RateDecision::Allowed { remaining: 4, .. }));

        limiter.reconfigure(RateLimitConfig::default());
        assert!(!limiter.is_enabled());
        assert_eq!(limiter.check("a", now), RateDecision::Unlimited);
    }

    #[test]
    fn test_sweep_forgets_lapsed_identities() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 1, 10, 30)]));
        let start = Instant::now();

        limiter.check("quiet", start);
        limiter.check("blocked", start);
        limiter.check("blocked", start);
        assert_eq!(limiter.tracked_identities(), 2);

        // Window over, block still running.
        assert_eq!(limiter.sweep(start + Duration::from_secs(10)), 1);
        assert_eq!(limiter.tracked_identities(), 1);
        assert!(matches!(
            limiter.check("blocked", start + Duration::from_secs(11)),
            RateDecision::Rejected { .. }
        ));

        assert_eq!(limiter.sweep(start + Duration::from_secs(60)), 1);
        assert_eq!(limiter.tracked_identities(), 0);
    }

    #[test]
    fn test_many_identities_are_swept_during_checks() {
        let limiter = WindowedRateLimiter::new(config(vec![tier("t", 5, 1, 0)]));
        let start = Instant::now();
        for i in 0..SWEEP_INTERVAL - 1 {
            limiter.check(&format!("10.0.{}.{}", i / 256, i % 256), start);
        }
        assert_eq!(limiter.tracked_identities(), (SWEEP_INTERVAL - 1) as usize);

        // The next check sweeps the lapsed scanners and keeps only itself.
        limiter.check("10.9.9.9", start + Duration::from_secs(5));
        assert_eq!(limiter.tracked_identities(), 1);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(3)), 3);
        assert_eq!(retry_after_secs(Duration::from_millis(3001)), 4);
    }
}
