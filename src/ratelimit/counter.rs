//! Per-key counter state.

/// Snapshot of one key's consumption, as stored per key by the engine.
///
/// An entry is either counting (no block, window still open) or blocked.
/// Entries whose window has elapsed with no outstanding block are logically
/// expired; the store treats them as absent so a stale entry can never cause
/// a false rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Points consumed in the current window.
    pub consumed: u32,
    /// When the current window opened (epoch seconds).
    pub window_started_at: u64,
    /// When an active block lapses, if one is in force (epoch seconds).
    pub blocked_until: Option<u64>,
}

impl CounterEntry {
    /// A fresh window with nothing consumed.
    pub fn fresh(now: u64) -> Self {
        Self {
            consumed: 0,
            window_started_at: now,
            blocked_until: None,
        }
    }

    /// The moment this entry stops governing decisions: the end of the
    /// counting window, or the end of the block.
    pub fn expires_at(&self, window_secs: u64) -> u64 {
        match self.blocked_until {
            Some(until) => until,
            None => self.window_started_at.saturating_add(window_secs),
        }
    }
}
