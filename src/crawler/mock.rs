//! # Mock Crawl and Scrape Capabilities for Testing
//!
//! Provides `MockCrawler` and `MockScraper`, which implement the capability
//! traits without touching the network. Both record every call so tests can
//! assert on how often, and with what arguments, the workflow reached them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::crawler::{
    CrawlClient, CrawlError, DiscoveredPage, ScrapeClient, ScrapeOptions, ScrapeOutput,
};

/// A mock crawler returning a fixed page list, or a fixed error
#[derive(Debug, Clone, Default)]
pub struct MockCrawler {
    pages: Arc<Mutex<Vec<DiscoveredPage>>>,
    error: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crawler that discovers the given pages
    pub fn with_pages(pages: Vec<DiscoveredPage>) -> Self {
        let crawler = Self::new();
        *crawler.pages.lock().unwrap() = pages;
        crawler
    }

    /// Make every crawl fail with an upstream error
    pub fn fail_with(&self, message: &str) {
        *self.error.lock().unwrap() = Some(message.to_string());
    }

    /// `(url, limit)` of every crawl so far
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CrawlClient for MockCrawler {
    async fn crawl(&self, url: &str, limit: u32) -> Result<Vec<DiscoveredPage>, CrawlError> {
        self.calls.lock().unwrap().push((url.to_string(), limit));
        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(CrawlError::Upstream(message));
        }
        Ok(self.pages.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Success(Option<String>),
    Retryable,
    Terminal,
}

impl Outcome {
    fn into_result(self, url: &str) -> Result<ScrapeOutput, CrawlError> {
        match self {
            Outcome::Success(markdown) => Ok(ScrapeOutput { markdown }),
            Outcome::Retryable => Err(CrawlError::Upstream(format!("{} failed to render", url))),
            Outcome::Terminal => Err(CrawlError::Api {
                status_code: 401,
                message: "Unauthorized".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct ScraperState {
    scripted: HashMap<String, VecDeque<Outcome>>,
    fallback: HashMap<String, Outcome>,
    calls: HashMap<String, usize>,
}

/// A mock scraper with per-URL scripted outcomes
///
/// URLs without a script succeed with `# <url>` as their markdown.
#[derive(Debug, Clone, Default)]
pub struct MockScraper {
    state: Arc<Mutex<ScraperState>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always succeed for `url` with the given markdown
    pub fn succeed(&self, url: &str, markdown: &str) {
        self.set_fallback(url, Outcome::Success(Some(markdown.to_string())));
    }

    /// Always succeed for `url` without markdown
    pub fn succeed_empty(&self, url: &str) {
        self.set_fallback(url, Outcome::Success(None));
    }

    /// Fail `times` times with a retryable error, then succeed with `markdown`
    pub fn fail_then_succeed(&self, url: &str, times: usize, markdown: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .scripted
            .entry(url.to_string())
            .or_default()
            .extend(std::iter::repeat_n(Outcome::Retryable, times));
        state.fallback.insert(
            url.to_string(),
            Outcome::Success(Some(markdown.to_string())),
        );
    }

    /// Always fail for `url` with a retryable error
    pub fn always_fail(&self, url: &str) {
        self.set_fallback(url, Outcome::Retryable);
    }

    /// Always fail for `url` with a terminal error
    pub fn fail_terminal(&self, url: &str) {
        self.set_fallback(url, Outcome::Terminal);
    }

    /// Number of scrape calls made for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Number of scrape calls made for any URL
    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    fn set_fallback(&self, url: &str, outcome: Outcome) {
        self.state
            .lock()
            .unwrap()
            .fallback
            .insert(url.to_string(), outcome);
    }
}

impl ScrapeClient for MockScraper {
    async fn scrape(&self, url: &str, _options: &ScrapeOptions) -> Result<ScrapeOutput, CrawlError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(url.to_string()).or_default() += 1;
            let scripted = state.scripted.get_mut(url).and_then(VecDeque::pop_front);
            scripted
                .or_else(|| state.fallback.get(url).cloned())
                .unwrap_or_else(|| Outcome::Success(Some(format!("# {}", url))))
        };
        outcome.into_result(url)
    }
}
