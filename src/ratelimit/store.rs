//! Counter storage boundary.
//!
//! The engine talks to its counters through [`CounterStore`]: get and
//! compare-and-set per key, with an expiry deadline on every write. The
//! in-memory implementation below is the default; a shared external store
//! can be substituted without changing the engine's algorithm.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::counter::CounterEntry;

/// Keyed counter storage with per-key atomic replacement.
///
/// Implementations must treat entries past their expiry deadline as absent.
/// `compare_and_set` must be atomic per key: it succeeds only when the live
/// entry for the key still equals `current`, so a lost race is observable
/// and the caller can retry against a fresh snapshot.
pub trait CounterStore: Send + Sync {
    /// The live entry for `key`, if any.
    fn get(&self, key: &str, now: u64) -> Option<CounterEntry>;

    /// Atomically replace the entry for `key`. `expires_at` is the moment
    /// the new entry stops governing decisions.
    fn compare_and_set(
        &self,
        key: &str,
        current: Option<CounterEntry>,
        next: CounterEntry,
        expires_at: u64,
        now: u64,
    ) -> bool;

    /// Number of stored entries, expired ones included.
    fn entry_count(&self) -> usize;

    /// Drop all entries.
    fn clear(&self);
}

struct StoredEntry {
    entry: CounterEntry,
    expires_at: u64,
}

/// Process-local counter storage over a sharded map.
///
/// Expired entries are reaped opportunistically on access; between accesses
/// they only occupy memory, never influence a decision.
#[derive(Default)]
pub struct InMemoryStore {
    entries: DashMap<String, StoredEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryStore {
    fn get(&self, key: &str, now: u64) -> Option<CounterEntry> {
        if let Some(stored) = self.entries.get(key) {
            if stored.expires_at > now {
                return Some(stored.entry);
            }
        } else {
            return None;
        }

        // Stale entry: reap it now rather than waiting for the next write.
        self.entries.remove_if(key, |_, stored| stored.expires_at <= now);
        None
    }

    fn compare_and_set(
        &self,
        key: &str,
        current: Option<CounterEntry>,
        next: CounterEntry,
        expires_at: u64,
        now: u64,
    ) -> bool {
        // The map entry holds its shard lock for the whole comparison, which
        // makes the check-then-replace atomic per key.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let live = if slot.get().expires_at > now {
                    Some(slot.get().entry)
                } else {
                    None
                };
                if live != current {
                    return false;
                }
                slot.insert(StoredEntry { entry: next, expires_at });
                true
            }
            Entry::Vacant(slot) => {
                if current.is_some() {
                    return false;
                }
                slot.insert(StoredEntry { entry: next, expires_at });
                true
            }
        }
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
