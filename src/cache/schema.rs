//! # Cache Schema Module
//!
//! One table, `crawled_results`, holds the serialized page list for each
//! requested URL together with its expiry as a unix timestamp. A unique index
//! on `url` keeps a single row per URL; writes replace it in place.

use libsql::{Connection, params};

use crate::cache::CacheError;

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS crawled_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        params![],
    )
    .await
    .map_err(|e| CacheError::Schema(format!("Failed to create crawled_results table: {}", e)))?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_crawled_results_url ON crawled_results(url)",
        params![],
    )
    .await
    .map_err(|e| CacheError::Schema(format!("Failed to create index on url: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_crawled_results_expires_at ON crawled_results(expires_at)",
        params![],
    )
    .await
    .map_err(|e| CacheError::Schema(format!("Failed to create index on expires_at: {}", e)))?;

    Ok(())
}
