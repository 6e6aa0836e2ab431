//! Job execution resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::link::{Link, Linked};
use crate::state::JobState;

/// A running or finished instance produced by submitting a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecution {
    /// Execution identifier.
    pub id: String,
    /// Current state.
    pub state: JobState,
    /// Extra text about the current state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_details: Option<String>,
    /// Error document, present when the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// Output artifacts keyed by file name, present once the job finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BTreeMap<String, String>>,
    /// Copy of the request that was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_request: Option<serde_json::Value>,
    /// Location of the log, when the service reports it directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_location: Option<String>,
    /// When the execution was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time_stamp: Option<DateTime<Utc>>,
    /// When the execution reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_stamp: Option<DateTime<Utc>>,
    /// Action links.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl JobExecution {
    /// True once the execution can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

impl Linked for JobExecution {
    fn links(&self) -> &[Link] {
        &self.links
    }
}
