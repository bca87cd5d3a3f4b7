//! HTTP-facing surface: middleware composers, rejection shapes, server.

mod middleware;
mod response;
mod server;

pub use middleware::{
    authenticated_rate_limit, ip_rate_limit, user_action_rate_limit, AuthenticatedUser,
    RateLimitState, UserActionLimit,
};
pub use response::{
    authentication_required, internal_server_error, rate_limit_headers, too_many_requests,
    X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
pub use server::HttpServer;
