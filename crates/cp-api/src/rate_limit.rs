//! Login rate limiting.
//!
//! Protects the login form against brute force attempts using the governor
//! crate, with both a per-IP and a global budget.
//!
//! Security: per-IP limiters live in an LRU cache so an attacker cycling
//! through spoofed addresses cannot grow server memory without bound.

use std::{
    env,
    net::IpAddr,
    num::{NonZeroU32, NonZeroUsize},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::http::HeaderMap;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use lru::LruCache;
use metrics::{counter, describe_counter, describe_gauge, gauge};

use cp_observability::metrics::LOGIN_RATE_LIMITED_TOTAL;

/// Default per-IP login attempt limit (attempts per minute).
pub const DEFAULT_LOGIN_RATE_PER_IP: u32 = 5;

/// Default global login attempt limit (attempts per minute).
pub const DEFAULT_LOGIN_RATE_GLOBAL: u32 = 100;

/// Default rate limit window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default maximum entries in the per-IP LRU cache.
pub const DEFAULT_RATE_LIMIT_MAX_ENTRIES: usize = 10_000;

/// Environment variable for configuring max cache entries.
pub const RATE_LIMIT_MAX_ENTRIES_ENV: &str = "CP_RATE_LIMIT_MAX_ENTRIES";

/// Per-IP rate limiter type.
type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

fn get_max_entries() -> usize {
    env::var(RATE_LIMIT_MAX_ENTRIES_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_ENTRIES)
}

/// Registers rate limiter metric descriptions.
/// Call once during server initialization.
pub fn register_rate_limit_metrics() {
    describe_gauge!(
        "campus_pulse_rate_limiter_ip_cache_size",
        "Current number of IP addresses tracked by the login rate limiter"
    );
    describe_counter!(
        "campus_pulse_rate_limiter_evictions_total",
        "Total LRU cache evictions in the login rate limiter"
    );
    describe_gauge!(
        "campus_pulse_rate_limiter_max_entries",
        "Maximum entries configured for the login rate limiter cache"
    );
}

/// Extracts the client IP from proxy headers.
///
/// Checks `X-Forwarded-For` (first entry) and then `X-Real-IP`. Returns
/// `None` when neither carries a parseable address; callers fall back to the
/// socket address.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

/// Login rate limiter with per-IP and global budgets.
///
/// Both limits must pass for a login attempt to be allowed. Per-IP state is
/// held in an LRU cache (default capacity 10,000, configurable via
/// `CP_RATE_LIMIT_MAX_ENTRIES`); the oldest entry is evicted at capacity.
#[derive(Clone)]
pub struct LoginRateLimiter {
    /// Per-IP rate limiters, keyed by client address.
    per_ip: Arc<Mutex<LruCache<IpAddr, Arc<IpRateLimiter>>>>,
    /// Global limiter across all login attempts.
    global: Arc<IpRateLimiter>,
    /// Per-IP attempts allowed per window.
    per_ip_limit: u32,
    /// Rate limit window duration.
    window: Duration,
    /// Maximum entries in the LRU cache.
    max_entries: usize,
    /// Total eviction count for metrics.
    eviction_count: Arc<Mutex<u64>>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_LOGIN_RATE_PER_IP,
            DEFAULT_LOGIN_RATE_GLOBAL,
            Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        )
    }

    /// Creates a limiter with custom per-IP and global limits.
    pub fn with_config(per_ip_limit: u32, global_limit: u32, window: Duration) -> Self {
        let max_entries = get_max_entries();
        Self::with_config_and_max_entries(per_ip_limit, global_limit, window, max_entries)
    }

    /// Creates a limiter with custom limits and LRU cache capacity.
    pub fn with_config_and_max_entries(
        per_ip_limit: u32,
        global_limit: u32,
        window: Duration,
        max_entries: usize,
    ) -> Self {
        let global_quota = Quota::with_period(window)
            .expect("Rate limit window must be > 0")
            .allow_burst(NonZeroU32::new(global_limit).expect("Global limit must be > 0"));

        let cache_size = NonZeroUsize::new(max_entries).expect("Max entries must be > 0");

        gauge!("campus_pulse_rate_limiter_max_entries").set(max_entries as f64);

        Self {
            per_ip: Arc::new(Mutex::new(LruCache::new(cache_size))),
            global: Arc::new(RateLimiter::direct(global_quota)),
            per_ip_limit,
            window,
            max_entries,
            eviction_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Checks whether a login attempt from the given IP is allowed.
    pub fn check(&self, ip: IpAddr) -> Result<(), RateLimitError> {
        if self.global.check().is_err() {
            tracing::warn!(ip = %ip, "Global login rate limit exceeded");
            counter!(LOGIN_RATE_LIMITED_TOTAL, "scope" => "global").increment(1);
            return Err(RateLimitError::GlobalLimitExceeded);
        }

        let limiter = self.get_or_create_ip_limiter(ip);

        if limiter.check().is_err() {
            tracing::warn!(
                ip = %ip,
                limit = self.per_ip_limit,
                window_secs = self.window.as_secs(),
                "Per-IP login rate limit exceeded"
            );
            counter!(LOGIN_RATE_LIMITED_TOTAL, "scope" => "ip").increment(1);
            return Err(RateLimitError::PerIpLimitExceeded);
        }

        Ok(())
    }

    /// Gets or creates a limiter for the IP, promoting it in LRU order.
    fn get_or_create_ip_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        let mut cache = self.per_ip.lock().unwrap();

        if let Some(limiter) = cache.get(&ip) {
            return limiter.clone();
        }

        let was_at_capacity = cache.len() >= self.max_entries;

        let quota = Quota::with_period(self.window)
            .expect("Rate limit window must be > 0")
            .allow_burst(NonZeroU32::new(self.per_ip_limit).expect("Per-IP limit must be > 0"));

        let limiter = Arc::new(RateLimiter::direct(quota));
        cache.push(ip, limiter.clone());

        let cache_size = cache.len();
        gauge!("campus_pulse_rate_limiter_ip_cache_size").set(cache_size as f64);

        if was_at_capacity {
            let mut eviction_count = self.eviction_count.lock().unwrap();
            *eviction_count += 1;
            counter!("campus_pulse_rate_limiter_evictions_total", "cache" => "login_ip")
                .increment(1);

            tracing::debug!(
                ip = %ip,
                cache_size = cache_size,
                max_entries = self.max_entries,
                "LRU eviction in login rate limiter"
            );
        }

        limiter
    }

    /// Clears rate limit state for an IP (testing or manual unblocking).
    pub fn clear_ip(&self, ip: IpAddr) {
        let mut cache = self.per_ip.lock().unwrap();
        cache.pop(&ip);
        gauge!("campus_pulse_rate_limiter_ip_cache_size").set(cache.len() as f64);
    }

    /// Number of IPs currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.per_ip.lock().unwrap().len()
    }

    /// Configured LRU cache capacity.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Total evictions so far.
    pub fn eviction_count(&self) -> u64 {
        *self.eviction_count.lock().unwrap()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from login rate limit checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Per-IP rate limit exceeded.
    PerIpLimitExceeded,
    /// Global rate limit exceeded.
    GlobalLimitExceeded,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitError::PerIpLimitExceeded => {
                write!(
                    f,
                    "Too many login attempts from this IP. Please try again later."
                )
            }
            RateLimitError::GlobalLimitExceeded => {
                write!(
                    f,
                    "Server is experiencing high load. Please try again later."
                )
            }
        }
    }
}

impl std::error::Error for RateLimitError {}
