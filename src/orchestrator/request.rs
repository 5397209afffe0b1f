//! Boundary validation of crawl requests

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// Pages crawled when the caller does not say
pub const DEFAULT_LIMIT: u32 = 10;

/// Smallest accepted page limit
pub const MIN_LIMIT: u32 = 1;

/// Largest accepted page limit
pub const MAX_LIMIT: u32 = 100;

/// A validated crawl request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Seed URL exactly as submitted; also the cache key
    pub url: String,

    /// Maximum number of pages the crawl may discover
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
struct CrawlRequestBody {
    url: String,
    /// `None` only when the field is absent; an explicit `null` is kept
    #[serde(default, deserialize_with = "present")]
    limit: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Accept any JSON number with an integral value, so `10.0` means `10`
fn integral_limit(value: &Value) -> Result<i64> {
    let invalid = || Error::InvalidInput(format!("limit must be an integer, got {}", value));
    let number = value.as_number().ok_or_else(invalid)?;
    if let Some(limit) = number.as_i64() {
        return Ok(limit);
    }
    match number.as_f64() {
        Some(limit) if limit.is_finite() && limit.fract() == 0.0 => Ok(limit as i64),
        _ => Err(invalid()),
    }
}

impl CrawlRequest {
    /// Validate a seed URL and optional page limit
    pub fn new(url: impl Into<String>, limit: Option<i64>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;

        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(limit) => u32::try_from(limit)
                .ok()
                .filter(|limit| (MIN_LIMIT..=MAX_LIMIT).contains(limit))
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "limit must be between {} and {}, got {}",
                        MIN_LIMIT, MAX_LIMIT, limit
                    ))
                })?,
        };

        Ok(Self { url, limit })
    }

    /// Parse and validate a JSON request body
    pub fn parse(body: &[u8]) -> Result<Self> {
        let body: CrawlRequestBody = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("malformed request body: {}", e)))?;
        let limit = body.limit.as_ref().map(integral_limit).transpose()?;
        Self::new(body.url, limit)
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| Error::InvalidInput(format!("invalid url {:?}: {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidInput(format!(
            "url must be an absolute http(s) URL, got {:?}",
            url
        )));
    }
    Ok(())
}
