//! Jobs client
//!
//! Typed operations over the Job Execution service. Maps transport
//! responses to resources and non-2xx statuses to `ApiError`. Nothing here
//! retries: transient failures surface to the caller.

use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use viya_jobs_protocol::{
    Collection, JobDefinition, JobExecution, JobRequest, JobState, Link, NewJobRequest,
    ServiceError, DEFINITIONS_PATH, JOBS_PATH, REQUESTS_PATH,
};

use super::transport::{Body, Method, Response, Transport, TransportError};

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type for client operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Query for job requests referencing a definition
#[derive(Debug, Clone)]
pub struct RequestQuery {
    /// URI the requests' `jobDefinitionUri` must equal
    pub definition_uri: String,
    /// Maximum number of requests to return
    pub limit: u32,
}

impl RequestQuery {
    /// Most recently modified requests for a definition
    pub fn for_definition(definition_uri: impl Into<String>) -> Self {
        Self {
            definition_uri: definition_uri.into(),
            limit: 10,
        }
    }

    /// Path with filter, sort and limit parameters
    pub fn to_path(&self) -> ApiResult<String> {
        let filter = format!("eq(jobDefinitionUri,'{}')", self.definition_uri);
        let limit = self.limit.to_string();
        with_query(
            REQUESTS_PATH,
            &[
                ("filter", filter.as_str()),
                ("sortBy", "modifiedTimeStamp:descending"),
                ("limit", limit.as_str()),
            ],
        )
    }
}

/// Base used to resolve service-relative paths; only path and query are kept
const PATH_BASE: &str = "http://service.invalid/";

/// Append encoded query parameters to a service path or link href
pub fn with_query(path: &str, params: &[(&str, &str)]) -> ApiResult<String> {
    let mut url = Url::parse(PATH_BASE)
        .and_then(|base| base.join(path))
        .map_err(|e| ApiError::Protocol(format!("Invalid path {}: {}", path, e)))?;
    url.query_pairs_mut().extend_pairs(params);

    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

/// Job Execution service client
#[derive(Clone)]
pub struct JobsClient {
    transport: Arc<dyn Transport>,
}

impl JobsClient {
    /// Create a client over a transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch a job definition
    pub fn get_definition(&self, definition_id: &str) -> ApiResult<JobDefinition> {
        let path = format!("{}/{}", DEFINITIONS_PATH, definition_id);
        let response = self.transport.request(Method::Get, &path, None)?;
        self.expect_json(response, "Job definition", definition_id)
    }

    /// List job requests matching a query, most recently modified first
    pub fn find_requests(&self, query: &RequestQuery) -> ApiResult<Collection<JobRequest>> {
        let response = self.transport.request(Method::Get, &query.to_path()?, None)?;
        self.expect_json(response, "Job requests", &query.definition_uri)
    }

    /// Create a job request
    pub fn create_request(&self, request: &NewJobRequest) -> ApiResult<JobRequest> {
        let body = serde_json::to_value(request).map_err(TransportError::from)?;
        let response = self.transport.request(Method::Post, REQUESTS_PATH, Some(&body))?;
        self.expect_json(response, "Job request", &request.name)
    }

    /// Fetch a job request
    pub fn get_request(&self, request_id: &str) -> ApiResult<JobRequest> {
        let path = format!("{}/{}", REQUESTS_PATH, request_id);
        let response = self.transport.request(Method::Get, &path, None)?;
        self.expect_json(response, "Job request", request_id)
    }

    /// Submit a job request through its `submitJob` link
    ///
    /// Not retried: a repeated submit would start a second execution.
    pub fn submit(&self, submit_link: &Link) -> ApiResult<JobExecution> {
        let method = submit_link.method.parse::<Method>()?;
        let response = self.transport.request(method, &submit_link.href, None)?;
        self.expect_json(response, "Job request", &submit_link.href)
    }

    /// Re-fetch an execution through its `self` link
    pub fn get_execution(&self, self_link: &Link) -> ApiResult<JobExecution> {
        let response = self.transport.request(Method::Get, &self_link.href, None)?;
        self.expect_json(response, "Job", &self_link.href)
    }

    /// Fetch an execution by identifier
    pub fn get_execution_by_id(&self, execution_id: &str) -> ApiResult<JobExecution> {
        let path = format!("{}/{}", JOBS_PATH, execution_id);
        let response = self.transport.request(Method::Get, &path, None)?;
        self.expect_json(response, "Job", execution_id)
    }

    /// Ask the service to move an execution to `target` through its
    /// `updateState` link
    ///
    /// Returns the state the service reports after the update.
    pub fn update_state(&self, update_link: &Link, target: JobState) -> ApiResult<JobState> {
        let method = update_link.method.parse::<Method>()?;
        let path = with_query(&update_link.href, &[("value", target.as_str())])?;

        let response = self.transport.request(method, &path, None)?;
        if !response.is_success() {
            return Err(self.status_error(response, "Job", &update_link.href));
        }

        match response.body {
            Body::Text(text) => text
                .parse::<JobState>()
                .map_err(|e| ApiError::Protocol(e.to_string())),
            Body::Json(value) => match value.get("state").and_then(Value::as_str) {
                Some(state) => state
                    .parse::<JobState>()
                    .map_err(|e| ApiError::Protocol(e.to_string())),
                None => Ok(target),
            },
            Body::Empty => Ok(target),
        }
    }

    fn expect_json<T: DeserializeOwned>(
        &self,
        response: Response,
        resource: &'static str,
        id: &str,
    ) -> ApiResult<T> {
        if !response.is_success() {
            return Err(self.status_error(response, resource, id));
        }
        match response.body {
            Body::Json(value) => serde_json::from_value(value).map_err(|e| {
                ApiError::Protocol(format!("Malformed {} document: {}", resource, e))
            }),
            Body::Text(_) | Body::Empty => Err(ApiError::Protocol(format!(
                "Expected a JSON {} document, got HTTP {} without JSON",
                resource, response.status
            ))),
        }
    }

    fn status_error(&self, response: Response, resource: &'static str, id: &str) -> ApiError {
        if response.status == 404 {
            return ApiError::NotFound {
                resource,
                id: id.to_string(),
            };
        }

        let message = match &response.body {
            Body::Json(value) => ServiceError::from_value(value)
                .map(|e| e.to_string())
                .unwrap_or_else(|| value.to_string()),
            Body::Text(text) => text.trim().to_string(),
            Body::Empty => String::new(),
        };
        tracing::warn!(status = response.status, %message, resource, id, "request rejected");
        ApiError::Status {
            status: response.status,
            message,
        }
    }
}
