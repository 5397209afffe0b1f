//! Error types for the crawler module

use thiserror::Error;

/// Error type for crawl and scrape operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Response body
        message: String,
    },

    /// The service answered, but reported a failure in the body
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Response body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Crawl job ended in a non-successful state
    #[error("Crawl job {id} ended with status {status}")]
    JobFailed {
        /// Job identifier
        id: String,
        /// Final job status
        status: String,
    },

    /// Crawl job did not finish in time
    #[error("Crawl job {0} timed out")]
    Timeout(String),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    /// Whether another attempt at the same call could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlError::Http(_)
            | CrawlError::Upstream(_)
            | CrawlError::UnexpectedResponse(_)
            | CrawlError::Timeout(_)
            | CrawlError::Other(_) => true,
            CrawlError::Api { status_code, .. } => {
                matches!(status_code, 408 | 429) || *status_code >= 500
            }
            CrawlError::JobFailed { .. } | CrawlError::HtmlParse(_) | CrawlError::UrlParse(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status_code: u16) -> CrawlError {
        CrawlError::Api {
            status_code,
            message: String::new(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(api(408).is_retryable());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(402).is_retryable());
        assert!(!api(404).is_retryable());
    }

    #[test]
    fn test_upstream_failures_are_retryable() {
        assert!(CrawlError::Upstream("page timed out".to_string()).is_retryable());
        assert!(!CrawlError::UrlParse(url::ParseError::EmptyHost).is_retryable());
    }
}
