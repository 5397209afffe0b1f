//! Bounded retry for page scrapes
//!
//! Each scrape attempt is classified into an `Attempt`, and `RetryPolicy`
//! maps the attempt number and classification to the next `Step`. The policy
//! is a plain function of its inputs; only `scrape_with_retry` sleeps.

use std::time::Duration;

use tracing::{Instrument, info_span, warn};

use crate::crawler::{CrawlError, CrawlerConfig, ScrapeClient, ScrapeOptions, ScrapedPage};
use crate::error::{Error, Result};

/// Classified result of one attempt
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The call produced a value
    Success(T),
    /// The call failed, but trying again may help
    Retryable(E),
    /// The call failed in a way another attempt will not fix
    Terminal(E),
}

impl<T> Attempt<T, CrawlError> {
    /// Classify a capability result using `CrawlError::is_retryable`
    pub fn classify(result: std::result::Result<T, CrawlError>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(err) if err.is_retryable() => Attempt::Retryable(err),
            Err(err) => Attempt::Terminal(err),
        }
    }
}

/// What to do after an attempt
#[derive(Debug)]
pub enum Step<T, E> {
    /// Return the value
    Done(T),
    /// Wait, then try again; carries the error that caused the retry
    RetryAfter(Duration, E),
    /// Stop and report the error
    GiveUp(E),
}

/// Fixed-delay retry policy with a cap on total attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay,
        }
    }

    /// Decide the next step after attempt number `attempt` (1-based)
    pub fn next_step<T, E>(&self, attempt: u32, outcome: Attempt<T, E>) -> Step<T, E> {
        match outcome {
            Attempt::Success(value) => Step::Done(value),
            Attempt::Retryable(err) if attempt < self.max_attempts => {
                Step::RetryAfter(self.delay, err)
            }
            Attempt::Retryable(err) | Attempt::Terminal(err) => Step::GiveUp(err),
        }
    }
}

/// Scrape one page, retrying per `policy`
pub async fn scrape_with_retry<S: ScrapeClient>(
    scraper: &S,
    url: &str,
    options: &ScrapeOptions,
    policy: RetryPolicy,
) -> Result<ScrapedPage> {
    let mut attempt = 1;
    loop {
        let result = scraper
            .scrape(url, options)
            .instrument(info_span!("scrape_attempt", url, attempt))
            .await;

        match policy.next_step(attempt, Attempt::classify(result)) {
            Step::Done(output) => {
                return Ok(ScrapedPage {
                    url: url.to_string(),
                    markdown: output.markdown,
                });
            }
            Step::RetryAfter(delay, err) => {
                warn!(
                    "Error scraping {}, attempts left: {}: {}",
                    url,
                    policy.max_attempts - attempt,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Step::GiveUp(err) => {
                warn!("Giving up on {} after {} attempt(s): {}", url, attempt, err);
                return Err(Error::Scrape {
                    url: url.to_string(),
                    source: err,
                });
            }
        }
    }
}
