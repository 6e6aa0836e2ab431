//! Execution state tracking
//!
//! Execution states: SUBMITTED → [PENDING →] RUNNING → {COMPLETED | FAILED | CANCELED}
//!
//! The record only moves forward: once a terminal state has been observed,
//! later observations are rejected.

mod execution_state;

pub use execution_state::{ExecutionRecord, StateChange, StateError};
pub use viya_jobs_protocol::JobState;
