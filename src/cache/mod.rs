//! Result cache module
//!
//! This module stores the scraped page list of a crawl under the URL that was
//! requested, with an expiry. Lookups match the URL string exactly and ignore
//! expired rows; nothing is evicted unless an operator prunes.

mod database;
mod error;
mod schema;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

pub use database::Database;
pub use error::CacheError;

use crate::crawler::ScrapedPage;

/// How long a crawl result stays valid
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A stored crawl result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Requested URL, verbatim
    pub url: String,

    /// Pages scraped for the request, in scrape order
    pub pages: Vec<ScrapedPage>,

    /// Moment after which the entry is ignored
    pub expires_at: DateTime<Utc>,
}

/// Keyed store of crawl results
pub trait CacheStore: Send + Sync {
    /// Look up the non-expired entry for `url`
    fn get(&self, url: &str) -> impl Future<Output = Result<Option<CacheEntry>, CacheError>> + Send;

    /// Store `pages` under `url`, valid for `ttl` from now
    fn put(
        &self,
        url: &str,
        pages: &[ScrapedPage],
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Delete entries that have expired, returning how many were removed
    fn purge_expired(&self) -> impl Future<Output = Result<u64, CacheError>> + Send;
}
