//! HTTP rejection shapes and rate-limit headers.
//!
//! Wire contract: denials are `429` with `Retry-After` and `X-RateLimit-*`
//! headers, missing identity is `401`, and a handler panic surfaces as a
//! generic `500`. All bodies share the `{ success, error }` envelope.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ratelimit::{Allowance, Denial};

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Absolute epoch seconds at which the caller's budget resets.
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            retry_after: None,
        }
    }
}

/// A denial, as seen on the wire.
pub fn too_many_requests(denial: &Denial) -> Response {
    let reset_at = chrono::Utc::now().timestamp().max(0) as u64 + denial.retry_after_secs;

    let body = ErrorBody {
        success: false,
        error: format!(
            "Too many requests. Retry in {} seconds.",
            denial.retry_after_secs
        ),
        retry_after: Some(denial.retry_after_secs),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(denial.retry_after_secs));
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(denial.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(denial.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at));
    response
}

/// Missing identity on a protected route. Deliberately not the 429 shape.
pub fn authentication_required() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("Authentication required")),
    )
        .into_response()
}

/// A caught handler failure. No internal detail leaks to the client.
pub fn internal_server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("Internal server error")),
    )
        .into_response()
}

/// Budget telemetry on admitted responses.
pub fn rate_limit_headers(headers: &mut HeaderMap, allowance: &Allowance) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(allowance.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(allowance.remaining));
}
