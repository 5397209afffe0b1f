//! In-process counter store with per-key expiry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::ratelimit::{CounterStore, RateLimitError};

#[derive(Debug)]
struct Counter {
    count: i64,
    expires_at: Option<Instant>,
}

/// Increments between two sweeps of expired counters
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Default)]
struct Counters {
    by_key: HashMap<String, Counter>,
    increments: u64,
}

impl Counters {
    fn remove_expired(&mut self, now: Instant) {
        self.by_key
            .retain(|_, counter| counter.expires_at.is_none_or(|at| at > now));
    }
}

/// Counter store kept in process memory
///
/// An expired counter restarts at zero when its key is next incremented, and
/// every `SWEEP_INTERVAL` increments all expired counters are removed.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    counters: Arc<Mutex<Counters>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        let now = Instant::now();
        let mut counters = self.counters.lock().await;

        counters.increments += 1;
        if counters.increments % SWEEP_INTERVAL == 0 {
            counters.remove_expired(now);
        }

        let counter = counters.by_key.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: None,
        });
        if counter.expires_at.is_some_and(|at| at <= now) {
            counter.count = 0;
            counter.expires_at = None;
        }
        counter.count += 1;

        Ok(counter.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        let mut counters = self.counters.lock().await;
        if let Some(counter) = counters.by_key.get_mut(key) {
            counter.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counter_resets_after_expiry() {
        let store = MemoryCounterStore::new();

        assert_eq!(store.incr("k").await.unwrap(), 1);
        store.expire("k", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.incr("k").await.unwrap(), 2);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.incr("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_counter_without_expiry_persists() {
        let store = MemoryCounterStore::new();
        for expected in 1..=3 {
            assert_eq!(store.incr("k").await.unwrap(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_counters_are_removed() {
        let store = MemoryCounterStore::new();
        for client in 0..1000 {
            let key = format!("client-{}", client);
            store.incr(&key).await.unwrap();
            store.expire(&key, Duration::from_secs(60)).await.unwrap();
        }
        assert_eq!(store.counters.lock().await.by_key.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        for _ in 0..SWEEP_INTERVAL {
            store.incr("steady").await.unwrap();
        }

        let counters = store.counters.lock().await;
        assert_eq!(counters.by_key.len(), 1);
        assert!(counters.by_key.contains_key("steady"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_live_counters() {
        let store = MemoryCounterStore::new();
        store.incr("live").await.unwrap();
        store.expire("live", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..SWEEP_INTERVAL {
            store.incr("other").await.unwrap();
        }

        assert_eq!(store.incr("live").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expire_on_missing_key_is_a_no_op() {
        let store = MemoryCounterStore::new();
        store.expire("missing", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.incr("missing").await.unwrap(), 1);
    }
}
