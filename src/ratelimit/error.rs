//! Error types for the rate limiting module

use thiserror::Error;

/// Error type for counter store operations
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
