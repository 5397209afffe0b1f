//! # Cache Error Types Module
//!
//! This module defines error types specific to the result cache. Store
//! failures are not distinguished from upstream failures by callers; they are
//! typed here so operators can tell them apart in logs.

use thiserror::Error;

/// Error type for cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored content could not be decoded
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),
}
