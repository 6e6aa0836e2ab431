//! Observed state of one job execution

use chrono::{DateTime, Utc};
use serde::Serialize;

use viya_jobs_protocol::JobState;

/// One observed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub state: JobState,
    pub at: DateTime<Utc>,
}

/// Errors for state tracking
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("Execution is in terminal state {0}")]
    Terminal(JobState),
}

/// Local record of an execution's state as observed by polling
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    /// Execution identifier
    pub execution_id: String,

    /// Last observed state
    pub state: JobState,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the state last changed
    pub updated_at: DateTime<Utc>,

    /// Distinct states in the order they were observed
    pub history: Vec<StateChange>,
}

impl ExecutionRecord {
    /// Create a record in SUBMITTED state
    pub fn submitted(execution_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            execution_id: execution_id.into(),
            state: JobState::Submitted,
            created_at: now,
            updated_at: now,
            history: vec![StateChange {
                state: JobState::Submitted,
                at: now,
            }],
        }
    }

    /// Record a state read from the service
    ///
    /// Returns true when the state changed.
    pub fn observe(&mut self, observed: JobState) -> Result<bool, StateError> {
        if self.state.is_terminal() {
            return Err(StateError::Terminal(self.state));
        }
        if !self.state.can_transition_to(observed) {
            return Err(StateError::InvalidTransition {
                from: self.state,
                to: observed,
            });
        }
        if observed == self.state {
            return Ok(false);
        }

        let now = Utc::now();
        self.state = observed;
        self.updated_at = now;
        self.history.push(StateChange { state: observed, at: now });
        Ok(true)
    }

    /// Check if the execution is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the execution has been observed running
    pub fn has_run(&self) -> bool {
        self.history.iter().any(|c| c.state == JobState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let record = ExecutionRecord::submitted("job-1");
        assert_eq!(record.execution_id, "job-1");
        assert_eq!(record.state, JobState::Submitted);
        assert_eq!(record.history.len(), 1);
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_happy_path() {
        let mut record = ExecutionRecord::submitted("job-1");

        assert!(record.observe(JobState::Running).unwrap());
        assert!(!record.observe(JobState::Running).unwrap());
        assert!(record.observe(JobState::Completed).unwrap());

        assert!(record.is_terminal());
        assert!(record.has_run());
        let states: Vec<_> = record.history.iter().map(|c| c.state).collect();
        assert_eq!(
            states,
            vec![JobState::Submitted, JobState::Running, JobState::Completed]
        );
    }

    #[test]
    fn test_submitted_reported_by_service() {
        let mut record = ExecutionRecord::submitted("job-1");

        assert!(!record.observe(JobState::Submitted).unwrap());
        assert_eq!(record.history.len(), 1);
        assert!(record.observe(JobState::Pending).unwrap());
    }

    #[test]
    fn test_terminal_is_final() {
        let mut record = ExecutionRecord::submitted("job-1");
        record.observe(JobState::Running).unwrap();
        record.observe(JobState::Canceled).unwrap();

        assert_eq!(
            record.observe(JobState::Completed),
            Err(StateError::Terminal(JobState::Canceled))
        );
        assert_eq!(record.state, JobState::Canceled);
    }

    #[test]
    fn test_running_cannot_go_back_to_pending() {
        let mut record = ExecutionRecord::submitted("job-1");
        record.observe(JobState::Pending).unwrap();
        record.observe(JobState::Running).unwrap();

        assert!(matches!(
            record.observe(JobState::Pending),
            Err(StateError::InvalidTransition { .. })
        ));
    }
}
