//! Rate limiting logic and state management.

mod clock;
mod counter;
mod key;
mod limiter;
mod registry;
mod store;
mod tiers;
mod trust;

pub use clock::{Clock, SystemClock};
pub use counter::CounterEntry;
pub use key::{client_key, user_action_key};
pub use limiter::{Allowance, Denial, LimiterSettings, RateLimiter};
pub use registry::LimiterRegistry;
pub use store::{CounterStore, InMemoryStore};
pub use tiers::Tier;
pub use trust::TrustedSources;
