//! # Crawl Orchestration Module
//!
//! This module drives one crawl request end to end: serve it from the cache
//! when a live entry exists, otherwise crawl the seed URL, derive the pages to
//! scrape, scrape them concurrently with bounded retry, and cache the result.
//!
//! ## Key Components
//!
//! - `CrawlService`: the workflow, built from injected crawl, scrape and cache
//!   capabilities
//! - `CrawlRequest`: a validated seed URL and page limit
//! - `RetryPolicy` / `Attempt` / `Step`: per-page retry decisions
//! - `derive_urls`: turns discovered pages into the list of URLs to scrape
//!
//! ## Failure policy
//!
//! Results are all-or-nothing. A crawl failure aborts before any scrape, and a
//! page that exhausts its attempts fails the whole request once every other
//! scrape has settled. Nothing is cached unless every page succeeded.
//! Concurrent requests for the same URL are not coalesced.

pub mod request;
pub mod retry;

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument};

pub use request::CrawlRequest;
pub use retry::{Attempt, RetryPolicy, Step, scrape_with_retry};

use crate::cache::{CacheStore, DEFAULT_TTL};
use crate::crawler::{CrawlClient, CrawlerConfig, DiscoveredPage, ScrapeClient, ScrapedPage};
use crate::error::Result;

/// Result of a crawl request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    /// Scraped pages, in derived-URL order
    pub pages: Vec<ScrapedPage>,

    /// Whether the pages came from the cache
    pub cache_hit: bool,
}

/// The crawl-and-cache workflow
#[derive(Debug, Clone)]
pub struct CrawlService<C, S, K> {
    crawler: C,
    scraper: S,
    cache: K,
    config: CrawlerConfig,
    cache_ttl: Duration,
}

impl<C, S, K> CrawlService<C, S, K>
where
    C: CrawlClient,
    S: ScrapeClient,
    K: CacheStore,
{
    /// Create a service caching results for the default seven days
    pub fn new(crawler: C, scraper: S, cache: K, config: CrawlerConfig) -> Self {
        Self {
            crawler,
            scraper,
            cache,
            config,
            cache_ttl: DEFAULT_TTL,
        }
    }

    /// Set how long results are cached
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn cache(&self) -> &K {
        &self.cache
    }

    /// Run the workflow for a validated request
    #[instrument(skip(self, request), fields(url = %request.url, limit = request.limit))]
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlOutcome> {
        if let Some(entry) = self.cache.get(&request.url).await? {
            info!(pages = entry.pages.len(), "Serving cached result");
            return Ok(CrawlOutcome {
                pages: entry.pages,
                cache_hit: true,
            });
        }

        let discovered = self.crawler.crawl(&request.url, request.limit).await?;
        let urls = derive_urls(&discovered, self.config.dedupe_urls);
        info!(
            "Crawl discovered {} pages, scraping {} URLs",
            discovered.len(),
            urls.len()
        );

        let pages = self.scrape_all(urls).await?;

        self.cache
            .put(&request.url, &pages, self.cache_ttl)
            .await?;
        info!(pages = pages.len(), "Cached crawl result");

        Ok(CrawlOutcome {
            pages,
            cache_hit: false,
        })
    }

    /// Scrape every URL concurrently, waiting for all of them to settle
    async fn scrape_all(&self, urls: Vec<String>) -> Result<Vec<ScrapedPage>> {
        let scraper = &self.scraper;
        let options = &self.config.scrape;
        let policy = RetryPolicy::from_config(&self.config);
        let concurrency = self
            .config
            .scrape_concurrency
            .unwrap_or(urls.len())
            .max(1);

        let results: Vec<Result<ScrapedPage>> = stream::iter(urls)
            .map(move |url| async move { scrape_with_retry(scraper, &url, options, policy).await })
            .buffered(concurrency)
            .collect()
            .await;

        results.into_iter().collect()
    }
}

/// Build the list of URLs to scrape from the crawl's discovered pages
///
/// Each page contributes its own URL followed by every link found on it. A
/// page without a URL contributes only its links. Repeats are kept unless
/// `dedupe` is set, in which case the first occurrence wins.
pub fn derive_urls(pages: &[DiscoveredPage], dedupe: bool) -> Vec<String> {
    let urls = pages.iter().flat_map(|page| {
        page.source_url
            .iter()
            .chain(page.links_on_page.iter())
            .cloned()
    });

    if dedupe {
        let mut seen = HashSet::new();
        urls.filter(|url| seen.insert(url.clone())).collect()
    } else {
        urls.collect()
    }
}
