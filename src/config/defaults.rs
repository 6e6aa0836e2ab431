//! Built-in defaults (layer 1)

use super::ConfigLayer;

/// Default delay between two state fetches
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Compute context used when neither the config nor the CLI names one
pub const DEFAULT_CONTEXT_NAME: &str = "SAS Job Execution compute context";

/// Built-in default configuration values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    pub poll_interval_ms: u64,
    pub http_timeout_seconds: u64,
    pub default_context: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            default_context: DEFAULT_CONTEXT_NAME.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Express the defaults as the lowest config layer
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            poll_interval_ms: Some(self.poll_interval_ms),
            http_timeout_seconds: Some(self.http_timeout_seconds),
            default_context: Some(self.default_context.clone()),
            ..ConfigLayer::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_credentials_unset() {
        let layer = BuiltinDefaults::default().to_layer();
        assert!(layer.base_url.is_none());
        assert!(layer.token.is_none());
        assert_eq!(layer.poll_interval_ms, Some(500));
        assert_eq!(layer.default_context.as_deref(), Some(DEFAULT_CONTEXT_NAME));
    }
}
