//! Mock service request handling

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde_json::Value;

use viya_jobs_protocol::{
    definition_uri, Collection, JobDefinition, JobRequest, JobState, NewJobRequest, ServiceError,
    ARG_CONTEXT_NAME,
};

use super::failure::{FailureConfig, FailureInjector, FailureMode};
use super::state::{MockState, Script, ScriptedState};
use crate::host::transport::{Method, Response, TransportError};

/// Configurable fake of the Job Execution service
pub struct MockViya {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
    calls: Arc<Mutex<Vec<(Method, String)>>>,
}

impl Default for MockViya {
    fn default() -> Self {
        Self::new()
    }
}

impl MockViya {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // === Public API for test configuration ===

    /// Store a job definition
    pub fn add_definition(&self, id: &str, name: &str) -> JobDefinition {
        self.state.lock().unwrap().insert_definition(id, name)
    }

    /// Store a job request, optionally referencing a definition
    ///
    /// `modified` is an RFC 3339 timestamp.
    pub fn add_request(&self, id: &str, definition_id: Option<&str>, modified: &str) -> JobRequest {
        let modified: DateTime<Utc> = modified.parse().unwrap_or_else(|_| Utc::now());
        let mut arguments = BTreeMap::new();
        arguments.insert(ARG_CONTEXT_NAME.to_string(), "SAS Job Execution compute context".to_string());
        self.state.lock().unwrap().insert_request(
            id,
            &format!("request {}", id),
            definition_id.map(definition_uri),
            arguments,
            modified,
        )
    }

    /// Drive executions submitted from `request_id` through `steps`
    pub fn script_request(&self, request_id: &str, initial: JobState, steps: Vec<ScriptedState>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(request_id.to_string(), Script { initial, steps });
    }

    /// Change an execution's state behind the client's back
    pub fn set_execution_state(&self, execution_id: &str, step: ScriptedState) {
        let mut state = self.state.lock().unwrap();
        if let Some(mock) = state.executions.get_mut(execution_id) {
            mock.force(&step);
        }
    }

    /// Remove a link from a stored request
    pub fn remove_request_link(&self, request_id: &str, rel: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(req) = state.requests.iter_mut().find(|r| r.id == request_id) {
            req.links.retain(|l| l.rel != rel);
        }
    }

    /// Let the job finish as the next cancel arrives
    ///
    /// The state update is not applied and its reply carries the state
    /// from `step`.
    pub fn finish_before_cancel(&self, step: ScriptedState) {
        self.state.lock().unwrap().finish_before_cancel = Some(step);
    }

    /// Make list queries ignore the requested sort order
    pub fn set_honor_sort(&self, honor: bool) {
        self.state.lock().unwrap().honor_sort = honor;
    }

    /// Reply with `status` to requests matching method and path prefix
    pub fn inject_status(&self, method: Method, path_prefix: &str, status: u16, message: &str) {
        self.inject_failure(FailureConfig::status(method, path_prefix, status, message));
    }

    /// Inject a failure configuration
    pub fn inject_failure(&self, config: FailureConfig) {
        self.failures.lock().unwrap().inject(config);
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    // === Assertions ===

    /// Current state of an execution
    pub fn execution_state(&self, execution_id: &str) -> Option<JobState> {
        let state = self.state.lock().unwrap();
        state.executions.get(execution_id).map(|m| m.execution.state)
    }

    /// Number of times an execution was fetched
    pub fn fetch_count(&self, execution_id: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.executions.get(execution_id).map(|m| m.fetches).unwrap_or(0)
    }

    /// Number of requests created through the API
    pub fn created_request_count(&self) -> u32 {
        self.state.lock().unwrap().created_requests
    }

    /// Number of submits
    pub fn submitted_count(&self) -> u32 {
        self.state.lock().unwrap().submitted
    }

    /// Number of accepted state updates
    pub fn state_update_count(&self) -> u32 {
        self.state.lock().unwrap().state_updates
    }

    /// Every request seen, in order
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests seen for a method and path prefix
    pub fn count_calls(&self, method: Method, path_prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| *m == method && p.starts_with(path_prefix))
            .count()
    }

    // === Request handling ===

    /// Handle one request
    pub fn handle(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push((method, path.to_string()));

        if let Some(failure) = self.failures.lock().unwrap().check(method, path) {
            return match failure {
                FailureMode::Status { status, message } => Ok(error_response(status, &message)),
                FailureMode::Disconnect => Err(TransportError::ConnectionFailed(format!(
                    "connection reset during {} {}",
                    method, path
                ))),
            };
        }

        let (route, query) = split_query(path);
        let segments: Vec<&str> = route.trim_matches('/').split('/').collect();

        let mut state = self.state.lock().unwrap();
        let response = match (method, segments.as_slice()) {
            (Method::Get, ["jobExecution", "jobDefinitions", id]) => {
                match state.definitions.get(*id) {
                    Some(def) => ok_json(def),
                    None => not_found("job definition", id),
                }
            }
            (Method::Get, ["jobExecution", "jobRequests"]) => {
                let items = match query.get("filter").and_then(|f| parse_eq_filter(f)) {
                    Some(uri) => state.requests_for(&uri),
                    None => state.requests.clone(),
                };
                let limit = query
                    .get("limit")
                    .and_then(|l| l.parse::<usize>().ok())
                    .unwrap_or(items.len());
                let page: Vec<JobRequest> = items.into_iter().take(limit).collect();
                ok_json(&Collection::of(page))
            }
            (Method::Post, ["jobExecution", "jobRequests"]) => {
                match body.and_then(|b| serde_json::from_value::<NewJobRequest>(b.clone()).ok()) {
                    Some(new_request) => {
                        state.created_requests += 1;
                        let id = format!("req-new-{:03}", state.created_requests);
                        let created = state.insert_request(
                            &id,
                            &new_request.name,
                            Some(new_request.job_definition_uri),
                            new_request.arguments,
                            Utc::now(),
                        );
                        Response::json(201, to_value(&created))
                    }
                    None => error_response(400, "The request body is not a valid job request."),
                }
            }
            (Method::Get, ["jobExecution", "jobRequests", id]) => match state.find_request(id) {
                Some(req) => ok_json(req),
                None => not_found("job request", id),
            },
            (Method::Post, ["jobExecution", "jobRequests", id, "jobs"]) => {
                if state.find_request(id).is_none() {
                    not_found("job request", id)
                } else {
                    let execution = state.submit(id);
                    Response::json(201, to_value(&execution))
                }
            }
            (Method::Get, ["jobExecution", "jobs", id]) => match state.executions.get_mut(*id) {
                Some(mock) => {
                    mock.advance();
                    ok_json(&mock.execution)
                }
                None => not_found("job", id),
            },
            (Method::Get, ["jobExecution", "jobs", id, "state"]) => {
                match state.executions.get(*id) {
                    Some(mock) => Response::text(200, mock.execution.state.as_str()),
                    None => not_found("job", id),
                }
            }
            (Method::Put, ["jobExecution", "jobs", id, "state"]) => {
                let target = query.get("value").and_then(|v| v.parse::<JobState>().ok());
                let race = state.finish_before_cancel.take();
                let updated = match (target, state.executions.get_mut(*id)) {
                    (_, None) => Err(not_found("job", id)),
                    (Some(JobState::Canceled), Some(mock)) => match race {
                        Some(step) if !mock.execution.state.is_terminal() => {
                            mock.force(&step);
                            Ok(mock.execution.state)
                        }
                        _ if mock.execution.state.is_terminal() => Err(error_response(
                            409,
                            &format!("The job is already in state {}.", mock.execution.state),
                        )),
                        _ => {
                            mock.force(&ScriptedState::canceled());
                            Ok(JobState::Canceled)
                        }
                    },
                    _ => Err(error_response(400, "Only the value canceled is supported.")),
                };
                match updated {
                    Ok(JobState::Canceled) => {
                        state.state_updates += 1;
                        Response::text(202, JobState::Canceled.as_str())
                    }
                    Ok(reported) => Response::text(200, reported.as_str()),
                    Err(response) => response,
                }
            }
            _ => error_response(404, &format!("No route for {} {}", method, route)),
        };

        Ok(response)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn ok_json<T: serde::Serialize>(value: &T) -> Response {
    Response::json(200, to_value(value))
}

fn error_response(status: u16, message: &str) -> Response {
    Response::json(status, to_value(&ServiceError::new(status, message)))
}

fn not_found(kind: &str, id: &str) -> Response {
    error_response(404, &format!("The {} \"{}\" was not found.", kind, id))
}

fn split_query(path: &str) -> (&str, HashMap<String, String>) {
    let Some((route, _)) = path.split_once('?') else {
        return (path, HashMap::new());
    };
    let params = Url::parse("http://mock.invalid/")
        .and_then(|base| base.join(path))
        .map(|url| url.query_pairs().into_owned().collect())
        .unwrap_or_default();
    (route, params)
}

/// Extract the URI from `eq(jobDefinitionUri,'<uri>')`
fn parse_eq_filter(filter: &str) -> Option<String> {
    let inner = filter.strip_prefix("eq(jobDefinitionUri,")?.strip_suffix(')')?;
    let uri = inner.trim().trim_matches('\'').trim_matches('"');
    Some(uri.to_string())
}
