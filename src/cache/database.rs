//! LibSQL-backed cache store

use std::time::Duration;

use chrono::{DateTime, Utc};
use libsql::{Connection, Row, params};
use tracing::{debug, instrument};

use crate::cache::schema;
use crate::cache::{CacheEntry, CacheError, CacheStore};
use crate::crawler::ScrapedPage;

/// Cache store over a libsql connection
///
/// Works against a local file, an in-memory database, or a remote database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a cache over an open connection, creating the schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, CacheError> {
        schema::initialize_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Open (or create) a local database file
    pub async fn new_from_path(path: &str) -> Result<Self, CacheError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| CacheError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Open a private in-memory database
    pub async fn new_in_memory() -> Result<Self, CacheError> {
        Self::new_from_path(":memory:").await
    }

    /// Connect to a remote database
    pub async fn new_remote(url: &str, auth_token: &str) -> Result<Self, CacheError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| CacheError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Convert a database row to a CacheEntry
    fn row_to_entry(&self, row: &Row) -> Result<CacheEntry, CacheError> {
        let url: String = row
            .get(0)
            .map_err(|e| CacheError::Data(format!("Failed to get url: {}", e)))?;
        let content: String = row
            .get(1)
            .map_err(|e| CacheError::Data(format!("Failed to get content: {}", e)))?;
        let expires_at: i64 = row
            .get(2)
            .map_err(|e| CacheError::Data(format!("Failed to get expires_at: {}", e)))?;

        let pages: Vec<ScrapedPage> = serde_json::from_str(&content)
            .map_err(|e| CacheError::Data(format!("Failed to decode content for {}: {}", url, e)))?;
        let expires_at = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| CacheError::Data(format!("Invalid expires_at: {}", expires_at)))?;

        Ok(CacheEntry {
            url,
            pages,
            expires_at,
        })
    }
}

impl CacheStore for Database {
    #[instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = Utc::now().timestamp();
        let mut rows = self
            .conn
            .query(
                "SELECT url, content, expires_at
             FROM crawled_results
             WHERE url = ? AND expires_at > ?
             LIMIT 1",
                params![url, now],
            )
            .await
            .map_err(|e| CacheError::Query(format!("Failed to look up cache entry: {}", e)))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(self.row_to_entry(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CacheError::Data(format!("Failed to read cache entry: {}", e))),
        }
    }

    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    async fn put(&self, url: &str, pages: &[ScrapedPage], ttl: Duration) -> Result<(), CacheError> {
        let content = serde_json::to_string(pages)
            .map_err(|e| CacheError::Data(format!("Failed to encode content: {}", e)))?;
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_secs);

        self.conn
            .execute(
                "INSERT INTO crawled_results (url, content, created_at, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(url) DO UPDATE SET
             content = excluded.content,
             created_at = excluded.created_at,
             expires_at = excluded.expires_at",
                params![url, content, now, expires_at],
            )
            .await
            .map_err(|e| CacheError::Query(format!("Failed to store cache entry: {}", e)))?;

        debug!("Cached {} until {}", url, expires_at);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = Utc::now().timestamp();
        let removed = self
            .conn
            .execute(
                "DELETE FROM crawled_results WHERE expires_at <= ?",
                params![now],
            )
            .await
            .map_err(|e| CacheError::Query(format!("Failed to purge cache: {}", e)))?;

        Ok(removed)
    }
}
