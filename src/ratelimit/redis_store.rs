//! Redis-backed counter store

use std::fmt;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::info;

use crate::ratelimit::{CounterStore, RateLimitError};

/// Counter store shared through Redis `INCR` and `EXPIRE`
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect to the Redis server at `url`
    pub async fn connect(url: &str) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to rate limit store");
        Ok(Self { conn })
    }
}

impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, RateLimitError> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        let _: bool = conn.expire(key, seconds).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = RedisCounterStore::connect("not a redis url").await;
        assert!(matches!(result, Err(RateLimitError::Redis(_))));
    }
}
