//! Configuration management for Guardrail.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{GuardrailError, Result};
use crate::ratelimit::{LimiterSettings, Tier};

/// Main configuration for the Guardrail service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

/// Rate limiting configuration.
///
/// Each standing tier can be overridden independently; omitted tiers keep
/// the standing policy table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    #[serde(default = "default_auth_limits")]
    pub auth: LimiterSettings,

    #[serde(default = "default_upload_limits")]
    pub upload: LimiterSettings,

    #[serde(default = "default_strict_limits")]
    pub strict: LimiterSettings,

    #[serde(default = "default_api_limits")]
    pub api: LimiterSettings,

    /// Caller addresses trusted in addition to loopback, e.g. partner
    /// webhook senders.
    #[serde(default)]
    pub trusted_sources: Vec<String>,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            auth: default_auth_limits(),
            upload: default_upload_limits(),
            strict: default_strict_limits(),
            api: default_api_limits(),
            trusted_sources: Vec::new(),
        }
    }
}

fn default_auth_limits() -> LimiterSettings {
    Tier::Auth.default_settings()
}

fn default_upload_limits() -> LimiterSettings {
    Tier::Upload.default_settings()
}

fn default_strict_limits() -> LimiterSettings {
    Tier::Strict.default_settings()
}

fn default_api_limits() -> LimiterSettings {
    Tier::Api.default_settings()
}

impl GuardrailConfig {
    /// Load configuration from an optional file plus `GUARDRAIL_`-prefixed
    /// environment overrides (`GUARDRAIL_SERVER__LISTEN_ADDR=...`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder
            .add_source(config::Environment::with_prefix("GUARDRAIL").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| GuardrailError::Config(e.to_string()))
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GuardrailError::Config(format!("Failed to parse config: {}", e)))
    }
}
