//! Effective runner configuration with provenance

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::BuiltinDefaults;
use super::ConfigLayer;
use crate::coordinator::CoordinatorOptions;
use crate::session::SessionContext;

/// Maximum accepted poll interval (one minute)
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Maximum accepted HTTP timeout (ten minutes)
const MAX_HTTP_TIMEOUT_SECONDS: u64 = 600;

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Profile,
    Env,
    Cli,
}

/// A contributing layer
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("{key} must be in (0, {max}], got {value}")]
    OutOfBounds { key: &'static str, value: u64, max: u64 },
}

/// Fully merged, validated settings for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunnerConfig {
    pub base_url: String,
    #[serde(skip)]
    pub token: String,
    pub poll_interval_ms: u64,
    pub http_timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    pub default_context: String,
    /// Contributing layers in precedence order
    pub sources: Vec<ConfigSource>,
}

impl RunnerConfig {
    /// Default profile location (~/.config/viya-jobs/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/viya-jobs/config.toml"))
    }

    /// Merge the layers and validate the result
    ///
    /// An explicitly named profile must exist; the default profile is
    /// optional.
    pub fn build(
        profile_path: Option<&Path>,
        profile_required: bool,
        env: ConfigLayer,
        cli: ConfigLayer,
    ) -> Result<Self, ConfigError> {
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];
        let mut merged = BuiltinDefaults::default().to_layer();

        if let Some(path) = profile_path {
            if path.exists() {
                let content = fs::read_to_string(path)?;
                merged = merged.overlay(ConfigLayer::parse(&content)?);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Profile,
                    path: Some(path.to_path_buf()),
                });
            } else if profile_required {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }

        if !env.is_empty() {
            merged = merged.overlay(env);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
            });
        }

        if !cli.is_empty() {
            merged = merged.overlay(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        Self::from_layer(merged, sources)
    }

    fn from_layer(layer: ConfigLayer, sources: Vec<ConfigSource>) -> Result<Self, ConfigError> {
        let defaults = BuiltinDefaults::default();

        let base_url = layer
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::Missing("base_url"))?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".to_string(),
                value: base_url,
            });
        }
        let token = layer
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing("token"))?;

        let poll_interval_ms = layer.poll_interval_ms.unwrap_or(defaults.poll_interval_ms);
        check_bounds("poll_interval_ms", poll_interval_ms, MAX_POLL_INTERVAL_MS)?;

        let http_timeout_seconds = layer
            .http_timeout_seconds
            .unwrap_or(defaults.http_timeout_seconds);
        check_bounds("http_timeout_seconds", http_timeout_seconds, MAX_HTTP_TIMEOUT_SECONDS)?;

        if let Some(timeout) = layer.timeout_seconds {
            check_bounds("timeout_seconds", timeout, u64::MAX)?;
        }

        Ok(Self {
            base_url,
            token: token.trim().to_string(),
            poll_interval_ms,
            http_timeout_seconds,
            timeout_seconds: layer.timeout_seconds,
            default_context: layer.default_context.unwrap_or(defaults.default_context),
            sources,
        })
    }

    /// Session context for the run
    pub fn session(&self) -> SessionContext {
        SessionContext::new(&self.base_url, &self.token)
    }

    /// Coordinator polling options
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            deadline: self.timeout_seconds.map(Duration::from_secs),
        }
    }

    /// Per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

fn check_bounds(key: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::OutOfBounds { key, value, max });
    }
    Ok(())
}
