//! Standing tier engines.

use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::limiter::{LimiterSettings, RateLimiter};
use super::store::InMemoryStore;
use super::tiers::Tier;
use crate::config::RateLimitingConfig;

/// One rate limit engine per standing tier.
///
/// Each engine owns its own counter store, so exhausting one tier's budget
/// can never spill into another. Constructed once at startup and handed to
/// the middleware composers by reference.
pub struct LimiterRegistry {
    auth: RateLimiter,
    upload: RateLimiter,
    strict: RateLimiter,
    api: RateLimiter,
}

impl LimiterRegistry {
    /// Engines over the configured policies, on the system clock.
    pub fn new(config: &RateLimitingConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Engines on a caller-supplied clock.
    pub fn with_clock(config: &RateLimitingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            auth: Self::engine(Tier::Auth, &config.auth, clock.clone()),
            upload: Self::engine(Tier::Upload, &config.upload, clock.clone()),
            strict: Self::engine(Tier::Strict, &config.strict, clock.clone()),
            api: Self::engine(Tier::Api, &config.api, clock),
        }
    }

    pub fn for_tier(&self, tier: Tier) -> &RateLimiter {
        match tier {
            Tier::Auth => &self.auth,
            Tier::Upload => &self.upload,
            Tier::Strict => &self.strict,
            Tier::Api => &self.api,
        }
    }

    /// Classify a path and return its tier together with the tier's engine.
    pub fn for_path(&self, path: &str) -> (Tier, &RateLimiter) {
        let tier = Tier::from_path(path);
        (tier, self.for_tier(tier))
    }

    /// Total number of keys with stored state across all tiers.
    pub fn counter_count(&self) -> usize {
        Tier::ALL
            .iter()
            .map(|t| self.for_tier(*t).counter_count())
            .sum()
    }

    /// Clear every tier's counters.
    pub fn clear(&self) {
        for tier in Tier::ALL {
            self.for_tier(tier).clear();
        }
    }

    fn engine(tier: Tier, settings: &LimiterSettings, clock: Arc<dyn Clock>) -> RateLimiter {
        let mut settings = settings.clone();
        if settings.key_prefix.is_none() {
            settings.key_prefix = Some(format!("tier_{}", tier.as_str()));
        }
        RateLimiter::with_parts(settings, Arc::new(InMemoryStore::new()), clock)
    }
}
