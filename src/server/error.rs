//! HTTP error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, info};

use crate::error::Error;
use crate::ratelimit::RateLimitDecision;
use crate::server::rate_limit_headers;

/// Error returned by the HTTP handlers
///
/// Only a fixed message reaches the caller; causes are logged.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range request
    InvalidInput(String),

    /// Client exceeded its quota for the current window
    TooManyRequests(RateLimitDecision),

    /// Anything else
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(message) => ApiError::InvalidInput(message),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidInput(message) => {
                info!("Rejected request: {}", message);
                error_body(StatusCode::BAD_REQUEST, "Invalid input").into_response()
            }
            ApiError::TooManyRequests(decision) => (
                rate_limit_headers(&decision),
                error_body(StatusCode::TOO_MANY_REQUESTS, "Too many requests"),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("Crawl request failed: {:#}", anyhow::Error::new(err));
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to crawl and scrape")
                    .into_response()
            }
        }
    }
}

fn error_body(status: StatusCode, message: &'static str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message })))
}
