//! Route tier classification and standing limits.
//!
//! Every route resolves to exactly one of four standing tiers. Matching is
//! by path fragment in a fixed priority order, and that order is part of the
//! contract: auth-like paths win over upload-like paths, which win over the
//! strict (admin/payment/webhook) group, with everything else landing in the
//! general API tier. `/api/admin/upload` is therefore an upload route.

use serde::{Deserialize, Serialize};

use super::limiter::LimiterSettings;

const AUTH_FRAGMENTS: [&str; 4] = ["/auth", "/login", "/register", "/password"];
const UPLOAD_FRAGMENTS: [&str; 1] = ["/upload"];
const STRICT_FRAGMENTS: [&str; 3] = ["/admin", "/payment", "/webhook"];

/// A named rate-limit policy assigned to a class of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Credential endpoints: login, registration, password reset.
    Auth,
    /// File ingestion endpoints.
    Upload,
    /// Admin, payment and webhook endpoints.
    Strict,
    /// Everything else.
    Api,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Auth, Tier::Upload, Tier::Strict, Tier::Api];

    /// Tier name for logging and key namespacing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Auth => "auth",
            Tier::Upload => "upload",
            Tier::Strict => "strict",
            Tier::Api => "api",
        }
    }

    /// Classify a request path. The method plays no part.
    pub fn from_path(path: &str) -> Tier {
        let path = path.to_ascii_lowercase();

        if AUTH_FRAGMENTS.iter().any(|f| path.contains(f)) {
            return Tier::Auth;
        }
        if UPLOAD_FRAGMENTS.iter().any(|f| path.contains(f)) {
            return Tier::Upload;
        }
        if STRICT_FRAGMENTS.iter().any(|f| path.contains(f)) {
            return Tier::Strict;
        }
        Tier::Api
    }

    /// The standing policy for this tier.
    pub fn default_settings(&self) -> LimiterSettings {
        match self {
            Tier::Auth => LimiterSettings::new(5, 900, 900),
            Tier::Upload => LimiterSettings::new(5, 600, 600),
            Tier::Strict => LimiterSettings::new(10, 60, 300),
            Tier::Api => LimiterSettings::new(100, 60, 60),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
