//! Process-wide theme configuration.
//!
//! The hosting page injects a bootstrap object (gateway endpoint, security
//! token, debug flag) before the runtime starts; [`ThemeConfig`] is the
//! immutable-after-construction record deserialized from it. Everything
//! downstream receives a clone at construction time instead of reading
//! ambient globals.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Immutable runtime configuration sourced from injected bootstrap data.
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeConfig {
    /// Endpoint every gateway request is sent to.
    pub gateway_url: String,
    /// Per-page security token forwarded with every gateway request.
    pub security_token: String,
    /// Enables metrics collection and verbose lifecycle logging.
    #[serde(default)]
    pub debug_enabled: bool,
    /// Theme version advertised in gateway requests and state snapshots.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl ThemeConfig {
    /// Deserialize the configuration from the injected bootstrap value.
    ///
    /// `None` means the page never injected bootstrap data, which is a hard
    /// error: the runtime cannot reach the backend without it.
    pub fn from_bootstrap(bootstrap: Option<&Value>) -> Result<Self, ConfigError> {
        let value = bootstrap.ok_or(ConfigError::Missing)?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bootstrap data was not injected")]
    Missing,
    #[error("invalid bootstrap data: {0}")]
    Invalid(#[from] serde_json::Error),
}
