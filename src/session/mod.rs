//! Session context
//!
//! Base URL and bearer credential for one coordinator run. Built once from
//! configuration and shared read-only (behind `Arc`) by the transport, the
//! resolver and the coordinator. Nothing below the constructor looks up
//! credentials from the environment.

use std::fmt;

/// Immutable endpoint and credential for a run
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    base_url: String,
    token: String,
}

impl SessionContext {
    /// Create a session for `base_url` authenticated with `token`
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Service host, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value for the `Authorization` header
    pub fn authorization_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Resolve a service path or an absolute href into a full URL
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
