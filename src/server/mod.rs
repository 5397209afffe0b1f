//! # HTTP Server Module
//!
//! Exposes the crawl workflow over HTTP with axum.
//!
//! - `POST /crawl` with `{"url": "...", "limit": 10}` returns
//!   `{"scrapedContent": [{"url": "...", "markdown": "..."}]}`
//! - `GET /health` returns `{"status": "ok"}`
//!
//! Every `/crawl` call is charged against the caller's rate limit quota
//! before anything else happens.

mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use error::ApiError;

use crate::cache::CacheStore;
use crate::crawler::{CrawlClient, ScrapeClient};
use crate::orchestrator::CrawlService;
use crate::ratelimit::{CounterStore, RateLimitDecision, RateLimiter};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state
pub struct AppState<C, S, K, R> {
    pub service: Arc<CrawlService<C, S, K>>,
    pub limiter: Arc<RateLimiter<R>>,
}

impl<C, S, K, R> AppState<C, S, K, R> {
    pub fn new(service: CrawlService<C, S, K>, limiter: RateLimiter<R>) -> Self {
        Self {
            service: Arc::new(service),
            limiter: Arc::new(limiter),
        }
    }
}

// Not derived: derive would require every type parameter to be `Clone`
impl<C, S, K, R> Clone for AppState<C, S, K, R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

/// Build the application router
pub fn router<C, S, K, R>(state: AppState<C, S, K, R>) -> Router
where
    C: CrawlClient + 'static,
    S: ScrapeClient + 'static,
    K: CacheStore + 'static,
    R: CounterStore + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/crawl", post(handlers::crawl::<C, S, K, R>))
        .with_state(state)
}

/// Serve the router on `addr` until ctrl-c
pub async fn serve<C, S, K, R>(addr: SocketAddr, state: AppState<C, S, K, R>) -> std::io::Result<()>
where
    C: CrawlClient + 'static,
    S: ScrapeClient + 'static,
    K: CacheStore + 'static,
    R: CounterStore + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Quota headers attached to `/crawl` responses
pub(crate) fn rate_limit_headers(decision: &RateLimitDecision) -> [(&'static str, String); 2] {
    [
        ("x-ratelimit-limit", decision.limit.to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
    ]
}
