//! Error types for the crawlcache crate

use thiserror::Error;

use crate::cache::CacheError;
use crate::crawler::CrawlError;
use crate::ratelimit::RateLimitError;

/// Result type for crawlcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for crawlcache operations
#[derive(Debug, Error)]
pub enum Error {
    /// The request body failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The crawl capability failed; the whole request is abandoned
    #[error("Crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    /// A page scrape exhausted its attempts
    #[error("Scrape of {url} failed: {source}")]
    Scrape {
        /// Page that could not be scraped
        url: String,
        /// Error from the final attempt
        #[source]
        source: CrawlError,
    },

    /// Cache store error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Counter store error behind the rate limiter
    #[error("Rate limiter error: {0}")]
    RateLimiter(#[from] RateLimitError),
}
