//! Request handlers

use std::net::SocketAddr;

use axum::Json;
use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::cache::CacheStore;
use crate::crawler::{CrawlClient, ScrapeClient, ScrapedPage};
use crate::error::Error;
use crate::orchestrator::CrawlRequest;
use crate::ratelimit::CounterStore;
use crate::server::{ApiError, AppState, MAX_BODY_BYTES, rate_limit_headers};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlResponse {
    scraped_content: Vec<ScrapedPage>,
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /crawl`
///
/// The quota is charged before the body is read, so rejected and malformed
/// requests still count against the client.
#[instrument(skip_all, fields(client = tracing::field::Empty))]
pub async fn crawl<C, S, K, R>(
    State(state): State<AppState<C, S, K, R>>,
    request: Request,
) -> Result<Response, ApiError>
where
    C: CrawlClient + 'static,
    S: ScrapeClient + 'static,
    K: CacheStore + 'static,
    R: CounterStore + 'static,
{
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(request.headers(), peer);
    tracing::Span::current().record("client", client.as_str());

    let decision = state
        .limiter
        .check(&client)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    if !decision.allowed {
        debug!("Rate limit exceeded");
        return Err(ApiError::TooManyRequests(decision));
    }

    let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| Error::InvalidInput(format!("unreadable request body: {}", e)))?;
    let crawl_request = CrawlRequest::parse(&body)?;

    let outcome = state.service.crawl(&crawl_request).await?;

    let cache_status = if outcome.cache_hit { "HIT" } else { "MISS" };
    Ok((
        rate_limit_headers(&decision),
        [("x-cache", cache_status)],
        Json(CrawlResponse {
            scraped_content: outcome.pages,
        }),
    )
        .into_response())
}

/// Identify the caller for rate limiting
///
/// Uses the first `X-Forwarded-For` entry, then the peer address.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
