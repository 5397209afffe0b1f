use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{Instrument, debug_span, info_span};

use crate::crawler::{CrawlError, ScrapeClient, ScrapeOptions, ScrapeOutput};

/// Scrape capability that waits for an outbound quota before every call
///
/// Without a quota it forwards calls unchanged.
#[derive(Clone)]
pub struct RateLimitedScraper<S> {
    inner: S,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl<S> RateLimitedScraper<S> {
    pub fn new(inner: S, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            inner,
            limiter: Some(Arc::new(limiter)),
        }
    }

    pub fn per_minute(inner: S, scrapes_per_minute: Option<NonZeroU32>) -> Self {
        match scrapes_per_minute {
            Some(quota) => Self::new(inner, RateLimiter::direct(Quota::per_minute(quota))),
            None => Self::unthrottled(inner),
        }
    }

    pub fn unthrottled(inner: S) -> Self {
        Self {
            inner,
            limiter: None,
        }
    }
}

impl<S: ScrapeClient> ScrapeClient for RateLimitedScraper<S> {
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapeOutput, CrawlError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().instrument(debug_span!("limiter")).await;
        }
        self.inner
            .scrape(url, options)
            .instrument(info_span!("scrape", url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::mock::MockScraper;

    #[tokio::test]
    async fn test_forwards_scrapes() {
        let scraper = MockScraper::new();
        scraper.succeed("https://example.com/a", "# A");

        let limited = RateLimitedScraper::per_minute(
            scraper.clone(),
            NonZeroU32::new(600),
        );
        let output = limited
            .scrape("https://example.com/a", &ScrapeOptions::default())
            .await
            .unwrap();

        assert_eq!(output.markdown.as_deref(), Some("# A"));
        assert_eq!(scraper.calls("https://example.com/a"), 1);
    }

    #[tokio::test]
    async fn test_quota_spaces_out_scrapes() {
        let scraper = MockScraper::new();
        scraper.succeed("https://example.com/a", "# A");
        scraper.succeed("https://example.com/b", "# B");

        let limited = RateLimitedScraper::new(
            scraper.clone(),
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(1).unwrap())),
        );
        let options = ScrapeOptions::default();

        let start = std::time::Instant::now();
        limited.scrape("https://example.com/a", &options).await.unwrap();
        let first = start.elapsed();
        limited.scrape("https://example.com/b", &options).await.unwrap();
        let both = start.elapsed();

        assert!(first < std::time::Duration::from_millis(500), "first took {:?}", first);
        assert!(both >= std::time::Duration::from_millis(900), "both took {:?}", both);
        assert_eq!(scraper.calls("https://example.com/b"), 1);
    }

    #[tokio::test]
    async fn test_unthrottled_has_no_limiter() {
        let limited = RateLimitedScraper::per_minute(MockScraper::new(), None);
        assert!(limited.limiter.is_none());
    }
}
