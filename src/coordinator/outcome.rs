//! Run outcomes
//!
//! A remote `failed`, a cancel that lost the race with completion and a
//! declined interrupt are all outcomes rather than errors.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use viya_jobs_protocol::{JobExecution, JobState};

/// Final report for an execution that reached a terminal state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalOutcome {
    pub execution_id: String,
    pub request_id: String,
    pub state: JobState,
    /// State detail text, falling back to the error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Error document, always present for `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_location: Option<String>,
    /// Listing output (`*.lst`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_location: Option<String>,
    /// Remaining `results` entries
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub result_locations: BTreeMap<String, String>,
}

impl TerminalOutcome {
    /// Build from the last execution document
    ///
    /// `state` is the locally tracked state, which wins over the document
    /// after a successful cancel.
    pub fn from_execution(execution: &JobExecution, request_id: &str, state: JobState) -> Self {
        let mut outcome = Self {
            execution_id: execution.id.clone(),
            request_id: request_id.to_string(),
            state,
            detail: execution.state_details.clone(),
            error_payload: execution.error.clone(),
            log_location: None,
            list_location: None,
            result_locations: BTreeMap::new(),
        };

        if let Some(results) = &execution.results {
            outcome.split_results(results);
        }
        if outcome.log_location.is_none() && execution.results.is_some() {
            outcome.log_location = execution.log_location.clone();
        }

        if outcome.detail.is_none() {
            outcome.detail = outcome
                .error_payload
                .as_ref()
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        if state == JobState::Failed && outcome.error_payload.is_none() {
            let message = outcome
                .detail
                .clone()
                .unwrap_or_else(|| "The job failed without an error document.".to_string());
            outcome.error_payload = Some(serde_json::json!({ "message": message }));
        }

        outcome
    }

    fn split_results(&mut self, results: &BTreeMap<String, String>) {
        let log_key = results
            .keys()
            .find(|k| is_log_key(k))
            .or_else(|| results.keys().find(|k| k.to_ascii_lowercase().contains("log")))
            .cloned();
        let list_key = results
            .keys()
            .find(|k| k.to_ascii_lowercase().ends_with(".lst"))
            .cloned();

        for (key, location) in results {
            if Some(key) == log_key.as_ref() {
                self.log_location = Some(location.clone());
            } else if Some(key) == list_key.as_ref() {
                self.list_location = Some(location.clone());
            } else {
                self.result_locations.insert(key.clone(), location.clone());
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }
}

fn is_log_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.ends_with(".log") || key.ends_with(".log.txt")
}

/// Result of a cancel attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    pub execution_id: String,
    /// The job reached a terminal state before the cancel took effect
    pub already_terminal: bool,
    /// The state update was accepted
    pub ok: bool,
    /// State after the attempt
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CancelOutcome {
    pub fn already_terminal(execution_id: &str, state: JobState) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            already_terminal: true,
            ok: false,
            state,
            error: None,
        }
    }

    pub fn accepted(execution_id: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            already_terminal: false,
            ok: true,
            state: JobState::Canceled,
            error: None,
        }
    }

    pub fn failed(execution_id: &str, state: JobState, error: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            already_terminal: false,
            ok: false,
            state,
            error: Some(error.into()),
        }
    }
}

/// How a supervised run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The job reached a terminal state
    Finished {
        #[serde(flatten)]
        terminal: TerminalOutcome,
        /// Cancel attempt made on the way, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        cancel: Option<CancelOutcome>,
    },
    /// The operator declined to cancel; the job keeps running remotely
    Detached { execution_id: String, state: JobState },
    /// The deadline passed
    TimedOut {
        #[serde(flatten)]
        terminal: TerminalOutcome,
        cancel: CancelOutcome,
    },
}

impl RunOutcome {
    pub fn execution_id(&self) -> &str {
        match self {
            RunOutcome::Finished { terminal, .. } | RunOutcome::TimedOut { terminal, .. } => {
                &terminal.execution_id
            }
            RunOutcome::Detached { execution_id, .. } => execution_id,
        }
    }

    /// Terminal report, when the run ended with one
    pub fn terminal(&self) -> Option<&TerminalOutcome> {
        match self {
            RunOutcome::Finished { terminal, .. } | RunOutcome::TimedOut { terminal, .. } => {
                Some(terminal)
            }
            RunOutcome::Detached { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn execution(value: Value) -> JobExecution {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_completed_with_results() {
        let exec = execution(json!({
            "id": "e1",
            "state": "completed",
            "results": {
                "e1.log.txt": "/files/files/log-1",
                "e1.lst": "/files/files/lst-1",
                "_webout.json": "/files/files/webout-1"
            }
        }));

        let outcome = TerminalOutcome::from_execution(&exec, "r1", JobState::Completed);
        assert_eq!(outcome.log_location.as_deref(), Some("/files/files/log-1"));
        assert_eq!(outcome.list_location.as_deref(), Some("/files/files/lst-1"));
        assert_eq!(outcome.result_locations.len(), 1);
        assert_eq!(
            outcome.result_locations.get("_webout.json").map(String::as_str),
            Some("/files/files/webout-1")
        );
        assert!(outcome.error_payload.is_none());
        assert!(outcome.is_success());
    }

    #[test]
    fn test_log_key_fallback() {
        let exec = execution(json!({
            "id": "e1",
            "state": "completed",
            "results": {"SASLOG": "/files/files/l"}
        }));
        let outcome = TerminalOutcome::from_execution(&exec, "r1", JobState::Completed);
        assert_eq!(outcome.log_location.as_deref(), Some("/files/files/l"));
        assert!(outcome.result_locations.is_empty());
    }

    #[test]
    fn test_completed_without_results() {
        let exec = execution(json!({"id": "e1", "state": "completed", "logLocation": "/x"}));
        let outcome = TerminalOutcome::from_execution(&exec, "r1", JobState::Completed);
        assert!(outcome.log_location.is_none());
        assert!(outcome.list_location.is_none());
        assert!(outcome.result_locations.is_empty());
    }

    #[test]
    fn test_failed_keeps_error_payload() {
        let exec = execution(json!({
            "id": "e1",
            "state": "failed",
            "error": {"message": "ERROR: Libref MYLIB is not assigned."}
        }));
        let outcome = TerminalOutcome::from_execution(&exec, "r1", JobState::Failed);
        assert_eq!(
            outcome.detail.as_deref(),
            Some("ERROR: Libref MYLIB is not assigned.")
        );
        assert_eq!(
            outcome.error_payload.unwrap()["message"],
            "ERROR: Libref MYLIB is not assigned."
        );
    }

    #[test]
    fn test_failed_without_error_document() {
        let exec = execution(json!({"id": "e1", "state": "failed", "stateDetails": "Compute server died"}));
        let outcome = TerminalOutcome::from_execution(&exec, "r1", JobState::Failed);
        assert_eq!(outcome.error_payload.unwrap()["message"], "Compute server died");
    }

    #[test]
    fn test_run_outcome_json() {
        let outcome = RunOutcome::Detached {
            execution_id: "e9".to_string(),
            state: JobState::Running,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "detached");
        assert_eq!(value["execution_id"], "e9");
        assert_eq!(value["state"], "running");
        assert_eq!(outcome.execution_id(), "e9");
        assert!(outcome.terminal().is_none());
    }
}
