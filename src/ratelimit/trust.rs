//! Trusted caller allowlist.

use std::collections::HashSet;

use axum::http::HeaderMap;
use parking_lot::RwLock;
use tracing::trace;

use super::key::client_key;

/// Default members: loopback callers (health checks, local tooling).
const LOOPBACK_SOURCES: [&str; 2] = ["127.0.0.1", "::1"];

/// A process-wide set of caller identities exempt from all consumption
/// checks. Consulted before any counter is touched; membership means the
/// request never decrements any budget.
pub struct TrustedSources {
    addrs: RwLock<HashSet<String>>,
}

impl TrustedSources {
    /// The loopback defaults only.
    pub fn new() -> Self {
        Self::with_sources(std::iter::empty::<String>())
    }

    /// Loopback defaults plus extra members, e.g. partner webhook senders.
    pub fn with_sources<I>(extra: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut addrs: HashSet<String> =
            LOOPBACK_SOURCES.iter().map(|s| s.to_string()).collect();
        addrs.extend(extra.into_iter().map(Into::into));
        Self {
            addrs: RwLock::new(addrs),
        }
    }

    /// Add a member at runtime.
    pub fn add(&self, addr: impl Into<String>) {
        self.addrs.write().insert(addr.into());
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.addrs.read().contains(addr)
    }

    /// Whether the request's derived client identity is a member.
    pub fn is_trusted(&self, headers: &HeaderMap) -> bool {
        let key = client_key(headers);
        let trusted = self.contains(&key);
        if trusted {
            trace!(key = %key, "trusted source, consumption skipped");
        }
        trusted
    }
}

impl Default for TrustedSources {
    fn default() -> Self {
        Self::new()
    }
}
