//! # crawlcache - Crawl, Scrape and Cache Websites as Markdown
//!
//! This crate crawls a website from a seed URL, scrapes every discovered page
//! into markdown, and caches the combined result for a week so repeated
//! requests for the same URL are served without touching the network again.
//! The workflow is exposed over HTTP behind a per-client rate limit.
//!
//! ## Features
//!
//! - Pluggable crawl and scrape capabilities:
//!   - Hosted Firecrawl API with job polling and pagination
//!   - Local crawling with spider and HTML to markdown conversion
//! - Per-page scrape retries with a fixed pause between attempts
//! - Concurrent scraping with optional concurrency cap and outbound quota
//! - Expiring result cache on LibSQL (local file or remote Turso)
//! - Fixed-window rate limiting on Redis or in memory
//! - axum HTTP server with `POST /crawl` and `GET /health`
//!
//! ## Example
//!
//! ```rust,no_run
//! use crawlcache::cache::Database;
//! use crawlcache::crawler::{CrawlerConfig, FirecrawlClient};
//! use crawlcache::orchestrator::{CrawlRequest, CrawlService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CrawlerConfig::default();
//!     let client = FirecrawlClient::new("fc-your-api-key")?;
//!     let cache = Database::new_from_path("crawlcache.db").await?;
//!
//!     let service = CrawlService::new(client.clone(), client, cache, config);
//!     let outcome = service
//!         .crawl(&CrawlRequest::new("https://example.com", Some(5))?)
//!         .await?;
//!
//!     for page in outcome.pages {
//!         println!("{}: {} bytes", page.url, page.markdown.map_or(0, |m| m.len()));
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod cache;
pub mod crawler;
pub mod orchestrator;
pub mod ratelimit;
pub mod server;

pub use error::{Error, Result};

/// Re-export of commonly used types
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::orchestrator::{CrawlOutcome, CrawlRequest, CrawlService};
}
