//! Firecrawl client implementation
//!
//! This module provides the HTTP client for the hosted crawl and scrape API.
//! A crawl is an asynchronous job: it is started, polled until it completes,
//! and its results are read page by page when the service paginates them.

use std::fmt;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::crawler::{
    CrawlClient, CrawlError, CrawlerConfig, DiscoveredPage, ScrapeClient, ScrapeOptions,
    ScrapeOutput,
};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Public API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

const API_VERSION: &str = "v1";

/// HTTP client for the Firecrawl API
#[derive(Clone)]
pub struct FirecrawlClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    base_url: String,

    /// API key sent as a bearer token
    api_key: String,

    /// Delay between two polls of a running crawl job
    poll_interval: Duration,

    /// Maximum time a crawl job may run
    crawl_timeout: Duration,
}

impl fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("crawl_timeout", &self.crawl_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptionsBody<'a> {
    formats: &'a [String],
    only_main_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlJobRequest<'a> {
    url: &'a str,
    limit: u32,
    scrape_options: ScrapeOptionsBody<'a>,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    #[serde(flatten)]
    options: ScrapeOptionsBody<'a>,
}

#[derive(Debug, Deserialize)]
struct CrawlJobStarted {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawlJobStatus {
    status: String,
    #[serde(default)]
    data: Vec<PageData>,
    next: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(default)]
    links: Vec<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    title: Option<serde_json::Value>,
    #[serde(default)]
    links_on_page: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
}

impl From<PageData> for DiscoveredPage {
    fn from(page: PageData) -> Self {
        let (source_url, title, links_on_page) = match page.metadata {
            Some(metadata) => (
                metadata.source_url,
                metadata
                    .title
                    .and_then(|title| title.as_str().map(str::to_string)),
                metadata.links_on_page,
            ),
            None => (None, None, Vec::new()),
        };

        // Older responses carry links in the metadata, newer ones at the top level
        let links_on_page = if links_on_page.is_empty() {
            page.links
        } else {
            links_on_page
        };

        DiscoveredPage {
            source_url,
            title,
            links_on_page,
        }
    }
}

impl<'a> From<&'a ScrapeOptions> for ScrapeOptionsBody<'a> {
    fn from(options: &'a ScrapeOptions) -> Self {
        Self {
            formats: &options.formats,
            only_main_content: options.only_main_content,
            wait_for: (options.wait_for_ms > 0).then_some(options.wait_for_ms),
        }
    }
}

impl FirecrawlClient {
    /// Create a new client for the public API
    pub fn new(api_key: impl Into<String>) -> Result<Self, CrawlError> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        let defaults = CrawlerConfig::default();

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            poll_interval: defaults.poll_interval,
            crawl_timeout: defaults.crawl_timeout,
        })
    }

    /// Create a client using the polling settings of `config`
    pub fn from_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: &CrawlerConfig,
    ) -> Result<Self, CrawlError> {
        Ok(Self::new(api_key)?
            .with_base_url(base_url)
            .with_polling(config.poll_interval, config.crawl_timeout))
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set how crawl jobs are polled
    pub fn with_polling(mut self, poll_interval: Duration, crawl_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.crawl_timeout = crawl_timeout;
        self
    }

    /// Build a URL for an API path
    fn build_url(&self, path: &str) -> Result<Url, CrawlError> {
        let url = format!("{}/{}/{}", self.base_url, API_VERSION, path);
        Ok(Url::parse(&url)?)
    }

    /// Send a GET request to an absolute URL
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, CrawlError> {
        debug!("Sending GET request to {}", url);
        let request = self.client.get(url).bearer_auth(&self.api_key);
        self.execute_request(request).await
    }

    /// Send a POST request with a JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CrawlError> {
        let url = self.build_url(path)?;
        debug!("Sending POST request to {}", path);
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body);
        self.execute_request(request).await
    }

    /// Execute an HTTP request and handle the response
    async fn execute_request<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, CrawlError> {
        let response = request.send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                error!("Failed to parse response: {}", e);
                CrawlError::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })
        } else {
            error!("API error: {} - {}", status, response_text);
            Err(CrawlError::Api {
                status_code: status.as_u16(),
                message: response_text,
            })
        }
    }

    /// Poll a crawl job until it completes, collecting every result page
    async fn wait_for_job(&self, id: &str) -> Result<Vec<DiscoveredPage>, CrawlError> {
        let deadline = Instant::now() + self.crawl_timeout;
        let mut status_url = self.build_url(&format!("crawl/{}", id))?;
        let mut pages = Vec::new();

        loop {
            let job: CrawlJobStatus = self.get(status_url.clone()).await?;
            if let Some(message) = job.error {
                return Err(CrawlError::Upstream(message));
            }

            match job.status.as_str() {
                "completed" => {
                    pages.extend(job.data.into_iter().map(DiscoveredPage::from));
                    match job.next {
                        Some(next) => status_url = Url::parse(&next)?,
                        None => return Ok(pages),
                    }
                }
                "failed" | "cancelled" => {
                    return Err(CrawlError::JobFailed {
                        id: id.to_string(),
                        status: job.status,
                    });
                }
                status => {
                    debug!(job = %id, status, "Crawl job still running");
                    if Instant::now() >= deadline {
                        return Err(CrawlError::Timeout(id.to_string()));
                    }
                    sleep(self.poll_interval).await;
                }
            }
        }
    }
}

impl CrawlClient for FirecrawlClient {
    #[instrument(skip(self))]
    async fn crawl(&self, url: &str, limit: u32) -> Result<Vec<DiscoveredPage>, CrawlError> {
        let scrape = ScrapeOptions {
            formats: vec!["markdown".to_string(), "links".to_string()],
            only_main_content: true,
            wait_for_ms: 0,
        };
        let body = CrawlJobRequest {
            url,
            limit,
            scrape_options: (&scrape).into(),
        };

        let started: CrawlJobStarted = self.post("crawl", &body).await?;
        if let Some(message) = started.error {
            return Err(CrawlError::Upstream(message));
        }
        let id = match started.id {
            Some(id) if started.success => id,
            _ => {
                return Err(CrawlError::UnexpectedResponse(
                    "crawl job was not started".to_string(),
                ));
            }
        };

        info!(job = %id, "Crawl job started");
        let pages = self.wait_for_job(&id).await?;
        info!(job = %id, pages = pages.len(), "Crawl job completed");
        Ok(pages)
    }
}

impl ScrapeClient for FirecrawlClient {
    #[instrument(skip(self, options))]
    async fn scrape(&self, url: &str, options: &ScrapeOptions) -> Result<ScrapeOutput, CrawlError> {
        let body = ScrapeRequest {
            url,
            options: options.into(),
        };

        let response: ScrapeResponse = self.post("scrape", &body).await?;
        if let Some(message) = response.error {
            return Err(CrawlError::Upstream(message));
        }
        if !response.success {
            return Err(CrawlError::Upstream("scrape reported failure".to_string()));
        }

        Ok(ScrapeOutput {
            markdown: response.data.and_then(|data| data.markdown),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(server: &Server) -> FirecrawlClient {
        FirecrawlClient::new("test-key")
            .unwrap()
            .with_base_url(server.url())
            .with_polling(Duration::ZERO, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_crawl_collects_paginated_results() {
        let mut server = Server::new_async().await;
        let start = server
            .mock("POST", "/v1/crawl")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(
                json!({"url": "https://example.com", "limit": 2}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "id": "job-1"}"#)
            .expect(1)
            .create_async()
            .await;
        let first = server
            .mock("GET", "/v1/crawl/job-1")
            .match_query(Matcher::Missing)
            .with_status(200)
            .with_body(
                json!({
                    "status": "completed",
                    "data": [{
                        "links": ["https://example.com/a"],
                        "metadata": {"sourceURL": "https://example.com", "title": "Home"}
                    }],
                    "next": format!("{}/v1/crawl/job-1?skip=1", server.url())
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1/crawl/job-1")
            .match_query(Matcher::UrlEncoded("skip".into(), "1".into()))
            .with_status(200)
            .with_body(
                json!({
                    "status": "completed",
                    "data": [{
                        "metadata": {
                            "sourceURL": "https://example.com/a",
                            "linksOnPage": ["https://example.com/b"]
                        }
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let pages = client_for(&server)
            .crawl("https://example.com", 2)
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].source_url.as_deref(), Some("https://example.com"));
        assert_eq!(pages[0].title.as_deref(), Some("Home"));
        assert_eq!(pages[0].links_on_page, vec!["https://example.com/a"]);
        assert_eq!(pages[1].links_on_page, vec!["https://example.com/b"]);

        start.assert_async().await;
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_crawl_reports_failed_job() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/crawl")
            .with_status(200)
            .with_body(r#"{"success": true, "id": "job-2"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/crawl/job-2")
            .with_status(200)
            .with_body(r#"{"status": "failed"}"#)
            .create_async()
            .await;

        let result = client_for(&server).crawl("https://example.com", 10).await;
        assert!(matches!(
            result,
            Err(CrawlError::JobFailed { ref id, ref status }) if id == "job-2" && status == "failed"
        ));
    }

    #[tokio::test]
    async fn test_crawl_times_out_on_running_job() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/crawl")
            .with_status(200)
            .with_body(r#"{"success": true, "id": "job-3"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/crawl/job-3")
            .with_status(200)
            .with_body(r#"{"status": "scraping", "data": []}"#)
            .create_async()
            .await;

        let client = client_for(&server).with_polling(Duration::ZERO, Duration::ZERO);
        let result = client.crawl("https://example.com", 10).await;
        assert!(matches!(result, Err(CrawlError::Timeout(ref id)) if id == "job-3"));
    }

    #[tokio::test]
    async fn test_crawl_domain_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/crawl")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "domain is blocked"}"#)
            .create_async()
            .await;

        let result = client_for(&server).crawl("https://example.com", 10).await;
        assert!(matches!(result, Err(CrawlError::Upstream(ref m)) if m == "domain is blocked"));
    }

    #[tokio::test]
    async fn test_scrape_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/scrape")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "url": "https://example.com/a",
                "formats": ["markdown"],
                "onlyMainContent": true,
                "waitFor": 5000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r##"{"success": true, "data": {"markdown": "# A"}}"##)
            .expect(1)
            .create_async()
            .await;

        let output = client_for(&server)
            .scrape("https://example.com/a", &ScrapeOptions::default())
            .await
            .unwrap();
        assert_eq!(output.markdown.as_deref(), Some("# A"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_scrape_server_error_is_retryable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/scrape")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let result = client_for(&server)
            .scrape("https://example.com/a", &ScrapeOptions::default())
            .await;
        match result {
            Err(err @ CrawlError::Api { status_code: 502, .. }) => assert!(err.is_retryable()),
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scrape_reported_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/scrape")
            .with_status(200)
            .with_body(r#"{"success": false, "error": "page did not render"}"#)
            .create_async()
            .await;

        let result = client_for(&server)
            .scrape("https://example.com/a", &ScrapeOptions::default())
            .await;
        assert!(matches!(result, Err(CrawlError::Upstream(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = FirecrawlClient::new("secret-key").unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
