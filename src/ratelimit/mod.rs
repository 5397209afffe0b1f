//! # Request Rate Limiting Module
//!
//! A fixed-window limiter over a shared counter store. Each request
//! increments a per-client counter; the request that creates the counter also
//! sets its expiry, which defines the window. The increment and the expiry are
//! two separate store calls, so a crash between them can leave a counter that
//! never expires.
//!
//! ## Key Components
//!
//! - `RateLimiter`: applies the quota to a client identifier
//! - `CounterStore`: increment-and-expire capability of the backing store
//! - `RedisCounterStore`: shared store for multi-process deployments
//! - `MemoryCounterStore`: in-process store for single-node use and tests

mod error;
pub mod memory;
pub mod redis_store;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, instrument};

pub use error::RateLimitError;
pub use memory::MemoryCounterStore;
pub use redis_store::RedisCounterStore;

/// Store holding one expiring integer counter per key
pub trait CounterStore: Send + Sync {
    /// Increment the counter at `key`, creating it at zero first if absent
    fn incr(&self, key: &str) -> impl Future<Output = Result<i64, RateLimitError>> + Send;

    /// Expire the counter at `key` after `ttl`
    fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), RateLimitError>> + Send;
}

/// Quota applied per client
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,

    /// Length of the window, started by the first request
    pub window: Duration,

    /// Prefix of counter keys
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
            key_prefix: "ratelimit:".to_string(),
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,

    /// Requests left in the current window
    pub remaining: u32,

    /// Requests allowed per window
    pub limit: u32,
}

/// Fixed-window limiter
#[derive(Debug, Clone)]
pub struct RateLimiter<S> {
    store: S,
    config: RateLimitConfig,
}

impl<S: CounterStore> RateLimiter<S> {
    /// Create a limiter with the default quota of 5 requests per minute
    pub fn new(store: S) -> Self {
        Self::with_config(store, RateLimitConfig::default())
    }

    /// Create a limiter with a custom quota
    pub fn with_config(store: S, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `client_id` and decide whether it may proceed
    #[instrument(skip(self))]
    pub async fn check(&self, client_id: &str) -> Result<RateLimitDecision, RateLimitError> {
        let key = format!("{}{}", self.config.key_prefix, client_id);

        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.config.window).await?;
        }

        let limit = i64::from(self.config.max_requests);
        let decision = RateLimitDecision {
            allowed: count <= limit,
            remaining: u32::try_from((limit - count).max(0)).unwrap_or(0),
            limit: self.config.max_requests,
        };
        debug!(count, allowed = decision.allowed, "Rate limit checked");
        Ok(decision)
    }
}

/// Counter store selected at startup
#[derive(Debug, Clone)]
pub enum CounterBackend {
    /// Shared Redis store
    Redis(RedisCounterStore),
    /// Process-local store
    Memory(MemoryCounterStore),
}

impl CounterStore for CounterBackend {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        match self {
            CounterBackend::Redis(store) => store.incr(key).await,
            CounterBackend::Memory(store) => store.incr(key).await,
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        match self {
            CounterBackend::Redis(store) => store.expire(key, ttl).await,
            CounterBackend::Memory(store) => store.expire(key, ttl).await,
        }
    }
}
