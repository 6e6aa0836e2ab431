//! Error body returned by the service on non-2xx responses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Service error document.
///
/// Every field is optional on the wire; services differ in how much they
/// populate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Numeric service error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    /// Single-line message.
    #[serde(default)]
    pub message: String,
    /// Additional detail lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Suggested remediation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// HTTP status the service reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
}

impl ServiceError {
    /// Create an error body with a status and message.
    pub fn new(http_status_code: u16, message: impl Into<String>) -> Self {
        Self {
            error_code: None,
            message: message.into(),
            details: Vec::new(),
            remediation: None,
            http_status_code: Some(http_status_code),
        }
    }

    /// Attach detail lines.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Parse an error body out of an arbitrary JSON value.
    ///
    /// Returns `None` when the value does not look like an error document.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() || value.get("message").is_none() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_code {
            Some(code) => write!(f, "{} (error {})", self.message, code)?,
            None => write!(f, "{}", self.message)?,
        }
        for detail in &self.details {
            write!(f, "; {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_service_error() {
        let body = json!({
            "errorCode": 11704,
            "message": "The job definition was not found.",
            "details": ["path: /jobExecution/jobDefinitions/abc"],
            "httpStatusCode": 404,
            "version": 2
        });

        let err = ServiceError::from_value(&body).unwrap();
        assert_eq!(err.error_code, Some(11704));
        assert_eq!(err.http_status_code, Some(404));
        assert_eq!(err.details.len(), 1);
        assert!(err.to_string().contains("error 11704"));
    }

    #[test]
    fn test_non_error_body_is_rejected() {
        assert!(ServiceError::from_value(&json!({"id": "x"})).is_none());
        assert!(ServiceError::from_value(&json!("text")).is_none());
    }
}
