//! Clock abstraction for window and block arithmetic.

/// Source of the current time, in whole seconds since the Unix epoch.
///
/// The engine only ever compares second-granularity timestamps, so this is
/// all it needs. Swapping in a manual clock makes block expiry testable
/// without sleeping.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn epoch_secs(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    secs: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            secs: std::sync::atomic::AtomicU64::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn epoch_secs(&self) -> u64 {
        self.secs.load(std::sync::atomic::Ordering::SeqCst)
    }
}
