//! # Crawl and Scrape Capabilities
//!
//! This module defines the two external capabilities the crawl workflow is
//! built from, plus the implementations that back them.
//!
//! ## Key Components
//!
//! - `CrawlClient`: discovers pages reachable from a seed URL, up to a page cap
//! - `ScrapeClient`: renders a single page's main content as markdown
//! - `DiscoveredPage` / `ScrapedPage`: the data flowing between the two
//! - `FirecrawlClient`: hosted implementation of both capabilities
//! - `SpiderClient`: in-process implementation of both capabilities
//! - `RateLimitedScraper`: outbound throttle in front of any `ScrapeClient`
//! - `Backend`: runtime choice between the hosted and local implementations
//!
//! Both traits return `Send` futures so the workflow can be driven from an
//! HTTP handler and fanned out across pages.

mod config;
mod error;
pub mod firecrawl;
pub mod links;
pub mod rate_limited;
pub mod spider_integration;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;

pub use config::{CrawlerConfig, CrawlerConfigBuilder, ScrapeOptions};
pub use error::CrawlError;
pub use firecrawl::FirecrawlClient;
pub use rate_limited::RateLimitedScraper;
pub use spider_integration::SpiderClient;

use serde::{Deserialize, Serialize};

/// A page found by the crawl capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredPage {
    /// Canonical URL of the page, when the crawler reported one
    pub source_url: Option<String>,

    /// Title of the page
    pub title: Option<String>,

    /// Absolute links found on the page, in document order
    pub links_on_page: Vec<String>,
}

/// Main content of one scraped page
///
/// This is the unit stored in the cache and returned to callers, serialized
/// as `{"url": ..., "markdown": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// URL that was scraped
    pub url: String,

    /// Rendered main content; absent when the scraper returned none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

/// Raw output of a single scrape call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOutput {
    /// Rendered main content
    pub markdown: Option<String>,
}

/// Capability that discovers the pages of a site
pub trait CrawlClient: Send + Sync {
    /// Crawl `url`, returning at most `limit` discovered pages
    fn crawl(
        &self,
        url: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<DiscoveredPage>, CrawlError>> + Send;
}

/// Capability that extracts the main content of a single page
pub trait ScrapeClient: Send + Sync {
    /// Scrape `url` using the given render options
    fn scrape(
        &self,
        url: &str,
        options: &ScrapeOptions,
    ) -> impl Future<Output = Result<ScrapeOutput, CrawlError>> + Send;
}

/// Crawl/scrape implementation selected at startup
#[derive(Debug, Clone)]
pub enum Backend {
    /// Hosted Firecrawl API
    Firecrawl(FirecrawlClient),
    /// Local spider-based crawler
    Spider(SpiderClient),
}

impl CrawlClient for Backend {
    async fn crawl(&self, url: &str, limit: u32) -> Result<Vec<DiscoveredPage>, CrawlError> {
        match self {
            Backend::Firecrawl(client) => client.crawl(url, limit).await,
            Backend::Spider(client) => client.crawl(url, limit).await,
        }
    }
}

impl ScrapeClient for Backend {
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapeOutput, CrawlError> {
        match self {
            Backend::Firecrawl(client) => client.scrape(url, options).await,
            Backend::Spider(client) => client.scrape(url, options).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraped_page_serialization() {
        let page = ScrapedPage {
            url: "https://example.com/a".to_string(),
            markdown: Some("# A".to_string()),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://example.com/a", "markdown": "# A"})
        );
    }

    #[test]
    fn test_scraped_page_without_markdown() {
        let page = ScrapedPage {
            url: "https://example.com/empty".to_string(),
            markdown: None,
        };
        let json = serde_json::to_string(&page).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com/empty"}"#);

        let back: ScrapedPage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, page);
    }
}
