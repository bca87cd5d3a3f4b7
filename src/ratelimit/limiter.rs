//! Core rate limit engine: fixed-window counting with a block cooldown.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::clock::{Clock, SystemClock};
use super::counter::CounterEntry;
use super::store::{CounterStore, InMemoryStore};

/// Immutable counting policy for one limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Maximum permitted consumptions within one window.
    pub points: u32,
    /// Window length in seconds.
    pub duration_secs: u64,
    /// Cooldown applied once `points` is exceeded within a window. May be
    /// longer than the window itself.
    pub block_secs: u64,
    /// Namespace for this limiter's keys, to keep independently constructed
    /// limiters from colliding in a shared store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

impl LimiterSettings {
    pub fn new(points: u32, duration_secs: u64, block_secs: u64) -> Self {
        Self {
            points,
            duration_secs,
            block_secs,
            key_prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// A committed consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    /// The limiter's budget.
    pub limit: u32,
    /// Points left in the current window.
    pub remaining: u32,
}

/// A rejected consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    /// Seconds until the caller may try again. Always at least 1.
    pub retry_after_secs: u64,
    /// The limiter's budget.
    pub limit: u32,
    /// Always 0 on a denial; carried so callers can build standard headers.
    pub remaining: u32,
}

/// The counting primitive: given a key, decide allow/deny and compute retry
/// metadata.
///
/// The check-then-commit sequence runs as a compare-and-set loop against the
/// store, so two concurrent consumptions straddling the limit boundary can
/// never both be admitted for the last slot.
pub struct RateLimiter {
    settings: LimiterSettings,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A limiter over its own in-memory store.
    pub fn new(settings: LimiterSettings) -> Self {
        Self::with_parts(settings, Arc::new(InMemoryStore::new()), Arc::new(SystemClock))
    }

    /// A limiter over a caller-supplied store and clock.
    pub fn with_parts(
        settings: LimiterSettings,
        store: Arc<dyn CounterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            store,
            clock,
        }
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    /// Consume one point for `key`.
    pub fn consume_one(&self, key: &str) -> Result<Allowance, Denial> {
        self.consume(key, 1)
    }

    /// Consume `points` for `key` and decide allow/deny.
    ///
    /// A fresh window opens when no entry exists or the stored window has
    /// fully elapsed with no active block. Inside an active block the counter
    /// is never touched. Exceeding the budget does not partially commit: the
    /// key is blocked for the full cooldown and the window resets to zero, so
    /// a caller starts clean once the block lapses.
    pub fn consume(&self, key: &str, points: u32) -> Result<Allowance, Denial> {
        let scoped = self.scoped(key);
        let limit = self.settings.points;

        loop {
            let now = self.clock.epoch_secs();
            let current = self.store.get(&scoped, now);

            if let Some(entry) = current {
                if let Some(until) = entry.blocked_until {
                    // The store only returns entries that still govern, so
                    // this block is active.
                    let retry_after_secs = until.saturating_sub(now).max(1);
                    debug!(
                        key = %scoped,
                        retry_after = retry_after_secs,
                        "consumption denied, block active"
                    );
                    return Err(Denial {
                        retry_after_secs,
                        limit,
                        remaining: 0,
                    });
                }
            }

            let window_started_at = current.map(|e| e.window_started_at).unwrap_or(now);
            let consumed = current.map(|e| e.consumed).unwrap_or(0);
            let new_total = consumed.saturating_add(points);

            if new_total <= limit {
                let next = CounterEntry {
                    consumed: new_total,
                    window_started_at,
                    blocked_until: None,
                };
                let expires_at = next.expires_at(self.settings.duration_secs);
                if self.store.compare_and_set(&scoped, current, next, expires_at, now) {
                    let remaining = limit - new_total;
                    trace!(key = %scoped, remaining, "consumption committed");
                    return Ok(Allowance { limit, remaining });
                }
            } else {
                let next = CounterEntry {
                    consumed: 0,
                    window_started_at: now,
                    blocked_until: Some(now + self.settings.block_secs),
                };
                let expires_at = next.expires_at(self.settings.duration_secs);
                if self.store.compare_and_set(&scoped, current, next, expires_at, now) {
                    warn!(
                        key = %scoped,
                        limit,
                        block_secs = self.settings.block_secs,
                        "limit exceeded, block started"
                    );
                    return Err(Denial {
                        retry_after_secs: self.settings.block_secs.max(1),
                        limit,
                        remaining: 0,
                    });
                }
            }
            // Lost a compare-and-set race; retry against a fresh snapshot.
        }
    }

    /// Number of keys with stored state. Primarily useful for tests.
    pub fn counter_count(&self) -> usize {
        self.store.entry_count()
    }

    /// Clear all counters.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn scoped(&self, key: &str) -> String {
        match &self.settings.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    fn limiter_at(settings: LimiterSettings, start: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let limiter =
            RateLimiter::with_parts(settings, Arc::new(InMemoryStore::new()), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_first_n_allowed_then_denied() {
        let (limiter, _) = limiter_at(LimiterSettings::new(3, 60, 120), 1_000);

        for i in 0..3 {
            let allowance = limiter.consume_one("1.2.3.4").unwrap();
            assert_eq!(allowance.limit, 3);
            assert_eq!(allowance.remaining, 2 - i);
        }

        let denial = limiter.consume_one("1.2.3.4").unwrap_err();
        assert_eq!(denial.retry_after_secs, 120);
        assert_eq!(denial.limit, 3);
        assert_eq!(denial.remaining, 0);
    }

    #[test]
    fn test_block_holds_until_cooldown_lapses() {
        let (limiter, clock) = limiter_at(LimiterSettings::new(2, 60, 300), 1_000);

        limiter.consume_one("key").unwrap();
        limiter.consume_one("key").unwrap();
        limiter.consume_one("key").unwrap_err();

        // One second before the block lapses: still denied, without touching
        // the counter.
        clock.advance(299);
        let denial = limiter.consume_one("key").unwrap_err();
        assert_eq!(denial.retry_after_secs, 1);

        // Block has lapsed: a clean window opens.
        clock.advance(1);
        let allowance = limiter.consume_one("key").unwrap();
        assert_eq!(allowance.remaining, 1);
    }

    #[test]
    fn test_elapsed_window_resets_count() {
        let (limiter, clock) = limiter_at(LimiterSettings::new(2, 60, 60), 1_000);

        limiter.consume_one("key").unwrap();
        limiter.consume_one("key").unwrap();

        // The budget is spent but no block is in force; once the window
        // elapses the count starts over.
        clock.advance(60);
        let allowance = limiter.consume_one("key").unwrap();
        assert_eq!(allowance.remaining, 1);
    }

    #[test]
    fn test_keys_are_isolated() {
        let (limiter, _) = limiter_at(LimiterSettings::new(1, 60, 60), 1_000);

        limiter.consume_one("a").unwrap();
        limiter.consume_one("a").unwrap_err();

        limiter.consume_one("b").unwrap();
    }

    #[test]
    fn test_single_point_budget_end_to_end() {
        let (limiter, _) = limiter_at(LimiterSettings::new(1, 60, 60), 1_000);

        let allowance = limiter.consume_one("caller").unwrap();
        assert_eq!(allowance.remaining, 0);

        let denial = limiter.consume_one("caller").unwrap_err();
        assert_eq!(denial.retry_after_secs, 60);
        assert_eq!(denial.limit, 1);
        assert_eq!(denial.remaining, 0);
    }

    #[test]
    fn test_oversized_consumption_always_denies() {
        let (limiter, clock) = limiter_at(LimiterSettings::new(10, 60, 120), 1_000);

        let denial = limiter.consume("key", 50).unwrap_err();
        assert_eq!(denial.retry_after_secs, 120);

        // The failed attempt did not partially commit; the key is simply
        // blocked until the cooldown clears.
        clock.advance(120);
        limiter.consume_one("key").unwrap();
    }

    #[test]
    fn test_exceeding_does_not_inherit_overflow() {
        let (limiter, clock) = limiter_at(LimiterSettings::new(2, 60, 30), 1_000);

        limiter.consume_one("key").unwrap();
        limiter.consume_one("key").unwrap();
        limiter.consume_one("key").unwrap_err();

        clock.advance(30);
        // Full budget available again, not budget-minus-overflow.
        assert_eq!(limiter.consume_one("key").unwrap().remaining, 1);
        assert_eq!(limiter.consume_one("key").unwrap().remaining, 0);
    }

    #[test]
    fn test_prefixes_partition_a_shared_store() {
        let store: Arc<dyn CounterStore> = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let first = RateLimiter::with_parts(
            LimiterSettings::new(1, 60, 60).with_prefix("tier_auth"),
            store.clone(),
            clock.clone(),
        );
        let second = RateLimiter::with_parts(
            LimiterSettings::new(1, 60, 60).with_prefix("tier_api"),
            store,
            clock,
        );

        first.consume_one("1.2.3.4").unwrap();
        first.consume_one("1.2.3.4").unwrap_err();

        // Same raw key, different namespace: untouched budget.
        second.consume_one("1.2.3.4").unwrap();
    }

    #[test]
    fn test_concurrent_consumption_admits_exactly_the_budget() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let limiter = RateLimiter::new(LimiterSettings::new(100, 600, 600));
        let admitted = AtomicU32::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        if limiter.consume_one("shared").is_ok() {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_counter_count_and_clear() {
        let (limiter, _) = limiter_at(LimiterSettings::new(5, 60, 60), 1_000);

        limiter.consume_one("a").unwrap();
        limiter.consume_one("b").unwrap();
        assert_eq!(limiter.counter_count(), 2);

        limiter.clear();
        assert_eq!(limiter.counter_count(), 0);
    }
}
