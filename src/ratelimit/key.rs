//! Caller identity derivation.

use axum::http::HeaderMap;

/// Proxy-chain header: comma-separated addresses, client first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Single-value client address header set by fronting proxies.
pub const REAL_IP: &str = "x-real-ip";

/// Placeholder identity when no network metadata is present, e.g. local or
/// test execution.
const FALLBACK_ADDR: &str = "127.0.0.1";

/// A stable identity string for the request's client.
///
/// Prefers the first entry of the proxy-chain header, then the single-value
/// real-IP header, and falls back to loopback. Never fails.
pub fn client_key(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get(REAL_IP).and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    FALLBACK_ADDR.to_string()
}

/// A key for a per-user business action budget.
///
/// The `user_` prefix keeps these out of the IP key space, and the embedded
/// user id and action keep budgets independent across users and actions.
pub fn user_action_key(user_id: &str, action: &str) -> String {
    format!("user_{}_{}", user_id, action)
}
