//! Mock service state
//!
//! Holds definitions, requests and executions, plus the per-request
//! scripts that drive executions through their states.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde_json::Value;

use viya_jobs_protocol::{
    JobDefinition, JobExecution, JobRequest, JobState, Link, DEFINITIONS_PATH, JOBS_PATH,
    REQUESTS_PATH,
};

/// One state an execution moves to on a fetch
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedState {
    pub state: JobState,
    pub state_details: Option<String>,
    pub error: Option<Value>,
    pub results: Option<BTreeMap<String, String>>,
}

impl ScriptedState {
    /// Bare state without payload
    pub fn state(state: JobState) -> Self {
        Self {
            state,
            state_details: None,
            error: None,
            results: None,
        }
    }

    pub fn running() -> Self {
        Self::state(JobState::Running)
    }

    pub fn pending() -> Self {
        Self::state(JobState::Pending)
    }

    /// Completed with a log and a listing in `results`
    pub fn completed_with_log(log_location: &str) -> Self {
        let mut results = BTreeMap::new();
        results.insert("job.log.txt".to_string(), log_location.to_string());
        results.insert(
            "job.lst".to_string(),
            log_location.replace("log", "listing"),
        );
        Self {
            results: Some(results),
            ..Self::state(JobState::Completed)
        }
    }

    /// Completed, but the service sent no `results` map
    pub fn completed_without_results() -> Self {
        Self::state(JobState::Completed)
    }

    /// Failed with an error document
    pub fn failed(message: &str) -> Self {
        Self {
            state_details: Some("Job ended with errors".to_string()),
            error: Some(serde_json::json!({
                "errorCode": 0,
                "message": message,
                "httpStatusCode": 500
            })),
            ..Self::state(JobState::Failed)
        }
    }

    pub fn canceled() -> Self {
        Self::state(JobState::Canceled)
    }

    fn apply(&self, execution: &mut JobExecution) {
        execution.state = self.state;
        execution.state_details = self.state_details.clone();
        execution.error = self.error.clone();
        execution.results = self.results.clone();
        if self.state.is_terminal() {
            execution.end_time_stamp = Some(Utc::now());
        }
    }
}

/// Script for executions submitted from one request
#[derive(Debug, Clone)]
pub struct Script {
    /// State returned by the submit call
    pub initial: JobState,
    /// States applied on successive fetches
    pub steps: Vec<ScriptedState>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            initial: JobState::Running,
            steps: vec![
                ScriptedState::running(),
                ScriptedState::completed_with_log("/files/files/default-log"),
            ],
        }
    }
}

/// An execution and its remaining script
#[derive(Debug, Clone)]
pub struct MockExecution {
    pub execution: JobExecution,
    pub remaining: VecDeque<ScriptedState>,
    pub fetches: u32,
}

impl MockExecution {
    /// Advance one step on fetch; terminal executions never move
    pub fn advance(&mut self) {
        self.fetches += 1;
        if self.execution.state.is_terminal() {
            self.remaining.clear();
            return;
        }
        if let Some(step) = self.remaining.pop_front() {
            step.apply(&mut self.execution);
        }
    }

    /// Jump straight to `step`, dropping the rest of the script
    pub fn force(&mut self, step: &ScriptedState) {
        self.remaining.clear();
        if !self.execution.state.is_terminal() {
            step.apply(&mut self.execution);
        }
    }
}

/// Mutable state of the mock service
#[derive(Debug, Default)]
pub struct MockState {
    pub definitions: BTreeMap<String, JobDefinition>,
    /// Requests in insertion order
    pub requests: Vec<JobRequest>,
    pub executions: HashMap<String, MockExecution>,
    pub scripts: HashMap<String, Script>,
    pub created_requests: u32,
    pub submitted: u32,
    pub state_updates: u32,
    /// When false, list queries ignore `sortBy` and return insertion order
    pub honor_sort: bool,
    /// State the next cancel finds the job in; the update reply reports it
    pub finish_before_cancel: Option<ScriptedState>,
}

impl MockState {
    pub fn new() -> Self {
        Self {
            honor_sort: true,
            ..Self::default()
        }
    }

    pub fn insert_definition(&mut self, id: &str, name: &str) -> JobDefinition {
        let href = format!("{}/{}", DEFINITIONS_PATH, id);
        let definition = JobDefinition {
            id: id.to_string(),
            name: name.to_string(),
            definition_type: Some("Compute".to_string()),
            description: None,
            links: vec![Link::new("GET", "self", href)],
        };
        self.definitions.insert(id.to_string(), definition.clone());
        definition
    }

    pub fn insert_request(
        &mut self,
        id: &str,
        name: &str,
        definition_uri: Option<String>,
        arguments: BTreeMap<String, String>,
        modified: DateTime<Utc>,
    ) -> JobRequest {
        let href = format!("{}/{}", REQUESTS_PATH, id);
        let request = JobRequest {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            job_definition_uri: definition_uri,
            arguments,
            creation_time_stamp: Some(modified),
            modified_time_stamp: Some(modified),
            links: vec![
                Link::new("GET", "self", href.clone()),
                Link::new("POST", "submitJob", format!("{}/jobs", href))
                    .with_type("application/vnd.sas.job.execution.job"),
            ],
        };
        self.requests.retain(|r| r.id != id);
        self.requests.push(request.clone());
        request
    }

    pub fn find_request(&self, id: &str) -> Option<&JobRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Requests referencing a definition, most recently modified first
    /// unless sorting is disabled
    pub fn requests_for(&self, definition_uri: &str) -> Vec<JobRequest> {
        let mut matches: Vec<JobRequest> = self
            .requests
            .iter()
            .filter(|r| r.job_definition_uri.as_deref() == Some(definition_uri))
            .cloned()
            .collect();
        if self.honor_sort {
            matches.sort_by(|a, b| b.modified_time_stamp.cmp(&a.modified_time_stamp));
        }
        matches
    }

    /// Start an execution for a request
    pub fn submit(&mut self, request_id: &str) -> JobExecution {
        self.submitted += 1;
        let id = format!("job-{:04}", self.submitted);
        let href = format!("{}/{}", JOBS_PATH, id);
        let script = self.scripts.get(request_id).cloned().unwrap_or_default();

        let execution = JobExecution {
            id: id.clone(),
            state: script.initial,
            state_details: None,
            error: None,
            results: None,
            job_request: self.find_request(request_id).and_then(|r| serde_json::to_value(r).ok()),
            log_location: None,
            creation_time_stamp: Some(Utc::now()),
            end_time_stamp: None,
            links: vec![
                Link::new("GET", "self", href.clone()),
                Link::new("GET", "state", format!("{}/state", href)).with_type("text/plain"),
                Link::new("PUT", "updateState", format!("{}/state", href)).with_type("text/plain"),
            ],
        };

        self.executions.insert(
            id,
            MockExecution {
                execution: execution.clone(),
                remaining: script.steps.into(),
                fetches: 0,
            },
        );
        execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_follows_script() {
        let mut state = MockState::new();
        state.scripts.insert(
            "r1".to_string(),
            Script {
                initial: JobState::Pending,
                steps: vec![ScriptedState::running(), ScriptedState::failed("boom")],
            },
        );

        let exec = state.submit("r1");
        assert_eq!(exec.state, JobState::Pending);

        let mock = state.executions.get_mut(&exec.id).unwrap();
        mock.advance();
        assert_eq!(mock.execution.state, JobState::Running);
        mock.advance();
        assert_eq!(mock.execution.state, JobState::Failed);
        assert!(mock.execution.error.is_some());

        // Terminal executions stay put
        mock.advance();
        assert_eq!(mock.execution.state, JobState::Failed);
        assert_eq!(mock.fetches, 3);
    }

    #[test]
    fn test_requests_sorted_by_modified() {
        let mut state = MockState::new();
        let uri = "/jobExecution/jobDefinitions/d1".to_string();
        let older: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let newer: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
        state.insert_request("r0", "old", Some(uri.clone()), BTreeMap::new(), older);
        state.insert_request("r1", "new", Some(uri.clone()), BTreeMap::new(), newer);

        let found = state.requests_for(&uri);
        assert_eq!(found[0].id, "r1");

        state.honor_sort = false;
        let found = state.requests_for(&uri);
        assert_eq!(found[0].id, "r0");
    }
}
