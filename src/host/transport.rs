//! Transport layer for the jobs client
//!
//! Abstracts the HTTP exchange for testability. Provides:
//! - Transport trait: one request, one response
//! - MockTransport: in-process fake service for unit tests
//! - HttpTransport: blocking HTTP client for production

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::mock::MockViya;
use crate::session::SessionContext;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(TransportError::Protocol(format!("unsupported method {}", other))),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Response body, parsed according to its content type
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Empty,
}

impl Body {
    /// Classify raw response text by content type
    pub fn from_text(content_type: &str, text: String) -> Result<Self, TransportError> {
        if text.trim().is_empty() {
            return Ok(Body::Empty);
        }
        if content_type.contains("json") {
            return Ok(Body::Json(serde_json::from_str(&text)?));
        }
        Ok(Body::Text(text))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// One HTTP response; non-2xx statuses are data, not errors
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Body,
}

impl Response {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: Body::Json(value),
        }
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Text(text.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Body::Empty,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for HTTP exchanges
pub trait Transport: Send + Sync {
    /// Perform one request and return the status and parsed body
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Mock transport for testing - routes requests to an in-process MockViya
pub struct MockTransport {
    service: Arc<MockViya>,
}

impl MockTransport {
    /// Create a mock transport over a fresh service
    pub fn new() -> Self {
        Self::with_service(Arc::new(MockViya::new()))
    }

    /// Create a mock transport over a shared, pre-configured service
    pub fn with_service(service: Arc<MockViya>) -> Self {
        Self { service }
    }

    /// Underlying service, for test setup and assertions
    pub fn service(&self) -> &MockViya {
        &self.service
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        self.service.handle(method, path, body)
    }
}

/// Accept header sent with every request
const ACCEPT_VALUE: &str = "application/json, text/plain;q=0.9";

/// HTTP transport for production use
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    session: Arc<SessionContext>,
}

impl HttpTransport {
    /// Create a transport for the session with a per-request timeout
    pub fn new(session: Arc<SessionContext>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, session })
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        let url = self.session.url_for(path);
        tracing::debug!(%method, %url, "sending request");

        let mut req = self
            .client
            .request(method.into(), &url)
            .header(AUTHORIZATION, self.session.authorization_header_value())
            .header(ACCEPT, ACCEPT_VALUE);
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = response.text()?;

        tracing::debug!(status, %content_type, bytes = text.len(), "received response");

        Ok(Response {
            status,
            body: Body::from_text(&content_type, text)?,
        })
    }
}
