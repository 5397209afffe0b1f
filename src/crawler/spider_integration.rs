//! Integration with spider library for local crawling and scraping
//!
//! This backend needs no API key: pages are fetched in-process, links are read
//! from the raw HTML, and main content is converted to markdown with
//! spider_utils. It ignores render waits since pages are not executed.

use spider::page::Page;
use spider::website::Website;
use spider_utils::spider_transformations::transformation::content::{
    ReturnFormat, TransformConfig, transform_content,
};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{debug, info, info_span, instrument, warn};

use crate::crawler::links::{extract_links, extract_title};
use crate::crawler::{
    CrawlClient, CrawlError, CrawlerConfig, DiscoveredPage, ScrapeClient, ScrapeOptions,
    ScrapeOutput,
};

/// In-process crawl and scrape capability
#[derive(Debug, Clone)]
pub struct SpiderClient {
    user_agent: String,
    respect_robots_txt: bool,
    delay_ms: u64,
}

impl Default for SpiderClient {
    fn default() -> Self {
        Self::new(&CrawlerConfig::default())
    }
}

impl SpiderClient {
    /// Create a client using the user agent of `config`
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            respect_robots_txt: true,
            delay_ms: 250,
        }
    }

    /// Set whether robots.txt is honoured
    pub fn with_respect_robots_txt(mut self, respect_robots_txt: bool) -> Self {
        self.respect_robots_txt = respect_robots_txt;
        self
    }

    fn website(&self, url: &str, limit: u32) -> Website {
        let mut website = Website::new(url);
        website
            .configuration
            .with_respect_robots_txt(self.respect_robots_txt)
            .with_user_agent(Some(&self.user_agent))
            .with_delay(self.delay_ms)
            .with_limit(limit);
        website
    }
}

impl CrawlClient for SpiderClient {
    #[instrument(skip(self))]
    async fn crawl(&self, url: &str, limit: u32) -> Result<Vec<DiscoveredPage>, CrawlError> {
        info!("Starting local crawl for {}", url);
        let mut website = self.website(url, limit);

        let mut rx = website
            .subscribe(channel_capacity(limit));
        let handle = tokio::spawn(async move {
            let mut pages = Vec::new();
            let skipped = drain(&mut rx, |page| pages.push(discover(&page))).await;
            (pages, skipped)
        });

        website.crawl().await;
        website.unsubscribe();
        let (pages, skipped) = handle
            .await
            .map_err(|e| CrawlError::Other(format!("Task join error: {}", e)))?;
        if skipped > 0 {
            warn!("Discovered {} pages, {} more were dropped", pages.len(), skipped);
        } else {
            info!("Discovered {} pages", pages.len());
        }
        Ok(pages)
    }
}

/// Broadcast capacity for a crawl of at most `limit` pages
fn channel_capacity(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX).clamp(16, 1024)
}

/// Receive until the sender closes, returning how many items were missed
///
/// A lagging receiver skips ahead instead of stopping.
async fn drain<T: Clone>(rx: &mut Receiver<T>, mut on_item: impl FnMut(T)) -> u64 {
    let mut skipped = 0;
    loop {
        match rx.recv().await {
            Ok(item) => on_item(item),
            Err(RecvError::Lagged(missed)) => {
                warn!("Page receiver lagged, {} pages skipped", missed);
                skipped += missed;
            }
            Err(RecvError::Closed) => return skipped,
        }
    }
}

fn discover(page: &Page) -> DiscoveredPage {
    let _page_span = info_span!("discover_page", url = %page.get_url()).entered();
    let page_url = page.get_url().to_string();
    let html = page.get_html();

    let links_on_page = extract_links(&page_url, &html).unwrap_or_else(|e| {
        warn!("Failed to extract links from {}: {}", page_url, e);
        Vec::new()
    });
    let title = extract_title(&html).unwrap_or_default();

    DiscoveredPage {
        source_url: Some(page_url),
        title,
        links_on_page,
    }
}

impl ScrapeClient for SpiderClient {
    #[instrument(skip(self, options))]
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapeOutput, CrawlError> {
        debug!(
            wait_for_ms = options.wait_for_ms,
            "Local scraper does not render pages; fetching raw HTML"
        );
        let mut website = self.website(url, 1);
        let transform_config = TransformConfig {
            return_format: ReturnFormat::Markdown,
            readability: options.only_main_content,
            main_content: options.only_main_content,
            ..Default::default()
        };

        let mut rx = website
            .subscribe(1);
        let handle = tokio::spawn(async move {
            match rx.recv().await {
                Ok(page) if !page.status_code.is_success() => Err(CrawlError::Api {
                    status_code: page.status_code.as_u16(),
                    message: format!("Fetching {} failed", page.get_url()),
                }),
                Ok(page) => Ok(transform_content(
                    &page,
                    &transform_config,
                    &None,
                    &None,
                    &None,
                )),
                Err(e) => Err(CrawlError::Upstream(format!("No page was fetched: {}", e))),
            }
        });

        website.crawl().await;
        website.unsubscribe();
        let markdown = handle
            .await
            .map_err(|e| CrawlError::Other(format!("Task join error: {}", e)))??;

        Ok(ScrapeOutput {
            markdown: (!markdown.trim().is_empty()).then_some(markdown),
        })
    }
}
