//! # Crawler Configuration Module
//!
//! This module provides configuration for the crawl workflow: how pages are
//! rendered when scraped, how failed scrapes are retried, and how the hosted
//! crawl job is polled. It uses a builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `ScrapeOptions`: Render options passed to the scrape capability
//! - `CrawlerConfig`: The main configuration struct with workflow parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration

use std::num::NonZeroU32;
use std::time::Duration;

/// Render options for a single scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Output formats requested from the scraper
    pub formats: Vec<String>,

    /// Strip navigation, headers, footers and similar boilerplate
    pub only_main_content: bool,

    /// Milliseconds the renderer waits before capturing the page
    pub wait_for_ms: u64,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec!["markdown".to_string()],
            only_main_content: true,
            wait_for_ms: 5000,
        }
    }
}

/// Configuration for the crawl workflow
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Options passed on every scrape
    pub scrape: ScrapeOptions,

    /// Total attempts per page, including the first
    pub max_attempts: u32,

    /// Pause between two attempts on the same page
    pub retry_delay: Duration,

    /// Maximum scrapes in flight for one request; `None` launches them all at once
    pub scrape_concurrency: Option<usize>,

    /// Drop repeated URLs before scraping
    pub dedupe_urls: bool,

    /// Outbound scrape quota; `None` disables throttling
    pub scrapes_per_minute: Option<NonZeroU32>,

    /// How often a running crawl job is polled
    pub poll_interval: Duration,

    /// How long a crawl job may run before it is abandoned
    pub crawl_timeout: Duration,

    /// User agent for the local crawler
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            scrape: ScrapeOptions::default(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            scrape_concurrency: None,
            dedupe_urls: false,
            scrapes_per_minute: None,
            poll_interval: Duration::from_secs(2),
            crawl_timeout: Duration::from_secs(600),
            user_agent: format!("crawlcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the scrape render options
    pub fn scrape(mut self, scrape: ScrapeOptions) -> Self {
        self.config.scrape = scrape;
        self
    }

    /// Set the total number of attempts per page
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between attempts
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self
    }

    /// Cap the number of concurrent scrapes per request
    pub fn scrape_concurrency(mut self, scrape_concurrency: Option<usize>) -> Self {
        self.config.scrape_concurrency = scrape_concurrency.filter(|n| *n > 0);
        self
    }

    /// Set whether repeated URLs are scraped once
    pub fn dedupe_urls(mut self, dedupe_urls: bool) -> Self {
        self.config.dedupe_urls = dedupe_urls;
        self
    }

    /// Set the outbound scrape quota
    pub fn scrapes_per_minute(mut self, scrapes_per_minute: Option<NonZeroU32>) -> Self {
        self.config.scrapes_per_minute = scrapes_per_minute;
        self
    }

    /// Set the crawl job polling interval
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Set the crawl job timeout
    pub fn crawl_timeout(mut self, crawl_timeout: Duration) -> Self {
        self.config.crawl_timeout = crawl_timeout;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_workflow_policy() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.scrape.formats, vec!["markdown".to_string()]);
        assert!(config.scrape.only_main_content);
        assert_eq!(config.scrape.wait_for_ms, 5000);
        assert!(config.scrape_concurrency.is_none());
        assert!(!config.dedupe_urls);
    }

    #[test]
    fn test_builder_clamps_degenerate_values() {
        let config = CrawlerConfig::builder()
            .max_attempts(0)
            .scrape_concurrency(Some(0))
            .build();
        assert_eq!(config.max_attempts, 1);
        assert!(config.scrape_concurrency.is_none());
    }
}
