//! Failure injection for the mock service
//!
//! Failures match on method and path prefix, so a single injection can
//! cover every execution fetch or every request lookup.

use crate::host::transport::Method;

/// What an injected failure does
#[derive(Debug, Clone)]
pub enum FailureMode {
    /// Reply with this status and message
    Status { status: u16, message: String },
    /// Fail at the transport level, as if the connection dropped
    Disconnect,
}

/// Failure configuration for matching requests
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub method: Method,
    pub path_prefix: String,
    pub mode: FailureMode,
    /// Number of matching calls to let through before failing
    pub skip: u32,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Reply with an HTTP error status
    pub fn status(method: Method, path_prefix: &str, status: u16, message: &str) -> Self {
        Self {
            method,
            path_prefix: path_prefix.to_string(),
            mode: FailureMode::Status {
                status,
                message: message.to_string(),
            },
            skip: 0,
            fail_count: None,
        }
    }

    /// Drop the connection
    pub fn disconnect(method: Method, path_prefix: &str) -> Self {
        Self {
            method,
            path_prefix: path_prefix.to_string(),
            mode: FailureMode::Disconnect,
            skip: 0,
            fail_count: None,
        }
    }

    /// Let the first `skip` matching calls succeed
    pub fn after(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && path.starts_with(&self.path_prefix)
    }
}

/// Failure injector for the mock service
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: Vec<(FailureConfig, u32)>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure
    pub fn inject(&mut self, config: FailureConfig) {
        self.configs.push((config, 0));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
    }

    /// Check if a failure should occur for a request
    pub fn check(&mut self, method: Method, path: &str) -> Option<FailureMode> {
        for (config, calls) in self.configs.iter_mut() {
            if !config.matches(method, path) {
                continue;
            }
            *calls += 1;
            if *calls <= config.skip {
                return None;
            }
            if let Some(limit) = config.fail_count {
                if *calls - config.skip > limit {
                    return None;
                }
            }
            return Some(config.mode.clone());
        }
        None
    }
}
