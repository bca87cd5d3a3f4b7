//! Middleware composers: ordered check chains over inbound requests.
//!
//! Three composition shapes, each a short-circuiting sequence of checks:
//!
//! - [`ip_rate_limit`]: trust gate, tier engine, handler.
//! - [`authenticated_rate_limit`]: trust gate, tier engine, identity, handler.
//! - [`user_action_rate_limit`]: identity, trust gate, tier engine,
//!   per-user action engine, handler.
//!
//! A rejection at any stage terminates the chain; later stages never run.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, trace};

use super::response;
use crate::ratelimit::{
    client_key, user_action_key, Allowance, LimiterRegistry, LimiterSettings, RateLimiter,
    TrustedSources,
};

/// Identity attached to the request by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
}

/// Shared state for the IP-tier defenses, built once at startup.
#[derive(Clone)]
pub struct RateLimitState {
    pub registry: Arc<LimiterRegistry>,
    pub trusted: Arc<TrustedSources>,
}

impl RateLimitState {
    pub fn new(registry: Arc<LimiterRegistry>, trusted: Arc<TrustedSources>) -> Self {
        Self { registry, trusted }
    }

    /// Trust gate: trusted callers skip every consumption check.
    fn is_trusted(&self, request: &Request) -> bool {
        self.trusted.is_trusted(request.headers())
    }

    /// Tier classification and engine consult for the caller's IP.
    fn check_ip_tier(&self, request: &Request) -> Result<Allowance, Response> {
        let key = client_key(request.headers());
        let path = request.uri().path();
        let (tier, limiter) = self.registry.for_path(path);

        match limiter.consume_one(&key) {
            Ok(allowance) => {
                trace!(
                    key = %key,
                    tier = %tier,
                    remaining = allowance.remaining,
                    "request admitted"
                );
                Ok(allowance)
            }
            Err(denial) => {
                debug!(
                    key = %key,
                    tier = %tier,
                    path = %path,
                    retry_after = denial.retry_after_secs,
                    "request throttled"
                );
                Err(response::too_many_requests(&denial))
            }
        }
    }
}

/// Identity check: the upstream auth layer must have attached a user.
fn require_user(request: &Request) -> Result<AuthenticatedUser, Response> {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) => Ok(user.clone()),
        None => {
            debug!(path = %request.uri().path(), "rejecting unauthenticated request");
            Err(response::authentication_required())
        }
    }
}

/// Bare rate limit wrapper: trust gate, then the caller's IP against the
/// path's tier.
pub async fn ip_rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_trusted(&request) {
        return next.run(request).await;
    }

    let allowance = match state.check_ip_tier(&request) {
        Ok(allowance) => allowance,
        Err(rejection) => return rejection,
    };

    let mut response = next.run(request).await;
    response::rate_limit_headers(response.headers_mut(), &allowance);
    response
}

/// Rate limit plus identity: the bare checks, then a valid authenticated
/// identity. Missing identity is a 401, never the 429 shape.
pub async fn authenticated_rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    if state.is_trusted(&request) {
        return match require_user(&request) {
            Ok(_) => next.run(request).await,
            Err(rejection) => rejection,
        };
    }

    let allowance = match state.check_ip_tier(&request) {
        Ok(allowance) => allowance,
        Err(rejection) => return rejection,
    };
    if let Err(rejection) = require_user(&request) {
        return rejection;
    }

    let mut response = next.run(request).await;
    response::rate_limit_headers(response.headers_mut(), &allowance);
    response
}

/// A per-user budget for one named business action, with its own engine and
/// namespace, independent of whichever tier the path maps to.
#[derive(Clone)]
pub struct UserActionLimit {
    state: RateLimitState,
    action: Arc<str>,
    limiter: Arc<RateLimiter>,
}

impl UserActionLimit {
    pub fn new(
        state: RateLimitState,
        action: impl Into<String>,
        settings: LimiterSettings,
    ) -> Self {
        let settings = if settings.key_prefix.is_none() {
            settings.with_prefix("user_action")
        } else {
            settings
        };
        Self {
            state,
            action: action.into().into(),
            limiter: Arc::new(RateLimiter::new(settings)),
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// User-action wrapper: authentication first, then the bare IP-tier checks,
/// then the dedicated per-user action engine. An IP-blocked caller never
/// reaches the action check, and an unauthenticated caller never reaches
/// either limiter.
pub async fn user_action_rate_limit(
    State(gate): State<UserActionLimit>,
    request: Request,
    next: Next,
) -> Response {
    let user = match require_user(&request) {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    if gate.state.is_trusted(&request) {
        return next.run(request).await;
    }

    let allowance = match gate.state.check_ip_tier(&request) {
        Ok(allowance) => allowance,
        Err(rejection) => return rejection,
    };

    let key = user_action_key(&user.id, &gate.action);
    if let Err(denial) = gate.limiter.consume_one(&key) {
        debug!(
            key = %key,
            action = %gate.action,
            retry_after = denial.retry_after_secs,
            "user action throttled"
        );
        return response::too_many_requests(&denial);
    }

    let mut response = next.run(request).await;
    response::rate_limit_headers(response.headers_mut(), &allowance);
    response
}
