//! Configuration layering
//!
//! Runner settings are merged from four layers, later layers winning:
//! 1. Built-in defaults
//! 2. Profile file (~/.config/viya-jobs/config.toml or `--config`)
//! 3. Environment (`VIYA_BASE_URL`, `VIYA_TOKEN`, ...)
//! 4. CLI flags

mod defaults;
mod effective;

pub use defaults::{
    BuiltinDefaults, DEFAULT_CONTEXT_NAME, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_POLL_INTERVAL_MS,
};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, RunnerConfig};

use serde::{Deserialize, Serialize};

/// Environment variable for the service host
pub const ENV_BASE_URL: &str = "VIYA_BASE_URL";
/// Environment variable for the bearer token
pub const ENV_TOKEN: &str = "VIYA_TOKEN";
/// Environment variable for the poll interval
pub const ENV_POLL_INTERVAL_MS: &str = "VIYA_POLL_INTERVAL_MS";
/// Environment variable for the compute context
pub const ENV_CONTEXT: &str = "VIYA_CONTEXT";

/// One partial layer of configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_seconds: Option<u64>,
    /// Wall-clock deadline for a whole run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_context: Option<String>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a layer from environment variables through `lookup`
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let poll_interval_ms = match lookup(ENV_POLL_INTERVAL_MS) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_POLL_INTERVAL_MS.to_string(),
                value: raw,
            })?),
            None => None,
        };

        Ok(Self {
            base_url: lookup(ENV_BASE_URL).filter(|v| !v.is_empty()),
            token: lookup(ENV_TOKEN).filter(|v| !v.is_empty()),
            poll_interval_ms,
            default_context: lookup(ENV_CONTEXT).filter(|v| !v.is_empty()),
            ..Self::default()
        })
    }

    /// Read a layer from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// True when the layer sets nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn overlay(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            base_url: other.base_url.or(self.base_url),
            token: other.token.or(self.token),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            http_timeout_seconds: other.http_timeout_seconds.or(self.http_timeout_seconds),
            timeout_seconds: other.timeout_seconds.or(self.timeout_seconds),
            default_context: other.default_context.or(self.default_context),
        }
    }
}
