//! Job Execution API resource types
//!
//! Shapes of the JSON documents exchanged with the Job Execution service:
//! job definitions, job requests, job executions, their link metadata and
//! the service error body.

pub mod error;
pub mod link;
pub mod collection;
pub mod resources;
pub mod state;

pub use collection::Collection;
pub use error::ServiceError;
pub use link::{Link, Linked};
pub use resources::{JobDefinition, JobExecution, JobRequest, NewJobRequest};
pub use state::{JobState, UnknownStateError};

/// Root path of the Job Execution service.
pub const SERVICE_ROOT: &str = "/jobExecution";

/// Collection of job definitions.
pub const DEFINITIONS_PATH: &str = "/jobExecution/jobDefinitions";

/// Collection of job requests.
pub const REQUESTS_PATH: &str = "/jobExecution/jobRequests";

/// Collection of job executions.
pub const JOBS_PATH: &str = "/jobExecution/jobs";

/// Link relation for submitting a job request.
pub const REL_SUBMIT: &str = "submitJob";

/// Link relation for re-fetching a resource.
pub const REL_SELF: &str = "self";

/// Link relation for reading an execution's state as text.
pub const REL_STATE: &str = "state";

/// Link relation for changing an execution's state.
pub const REL_UPDATE_STATE: &str = "updateState";

/// Argument that suppresses the JSON log copy in execution results.
pub const ARG_OMIT_JSON_LOG: &str = "_omitJsonLog";

/// Argument naming the compute context the job runs in.
pub const ARG_CONTEXT_NAME: &str = "_contextName";

/// Build the canonical URI of a job definition.
pub fn definition_uri(definition_id: &str) -> String {
    format!("{}/{}", DEFINITIONS_PATH, definition_id)
}
