//! Job execution state.
//!
//! States: SUBMITTED → [PENDING →] RUNNING → {COMPLETED | FAILED | CANCELED}
//!
//! `submitted` marks an execution whose submit call has returned but whose
//! state has not been read yet. A submit response may also carry it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution state as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submit returned, state not yet observed
    Submitted,
    /// Accepted, waiting for a compute session
    Pending,
    /// Executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped by a state update
    #[serde(alias = "cancelled")]
    Canceled,
}

impl JobState {
    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Canceled)
    }

    /// States in which a cancel request is meaningful.
    pub fn is_cancellable(&self) -> bool {
        !self.is_terminal()
    }

    /// Check if a poll may observe `target` after this state.
    ///
    /// Re-observing the same non-terminal state is allowed: that is what a
    /// poll returns while the job is still working.
    pub fn can_transition_to(&self, target: JobState) -> bool {
        match (self, target) {
            (JobState::Submitted, _) => true,

            (JobState::Pending, JobState::Submitted) => false,
            (JobState::Pending, _) => true,

            (JobState::Running, JobState::Running) => true,
            (JobState::Running, t) => t.is_terminal(),

            // Terminal states cannot transition
            _ => false,
        }
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state string the service sent that this client does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job state '{0}'")]
pub struct UnknownStateError(pub String);

impl FromStr for JobState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(JobState::Submitted),
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            // Older services spell it with two l's
            "canceled" | "cancelled" => Ok(JobState::Canceled),
            other => Err(UnknownStateError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Submitted.is_terminal());
    }

    #[test]
    fn test_submitted_may_be_observed_again() {
        assert!(JobState::Submitted.can_transition_to(JobState::Submitted));
        assert!(JobState::Submitted.can_transition_to(JobState::Pending));
        assert!(!JobState::Pending.can_transition_to(JobState::Submitted));
    }

    #[test]
    fn test_transitions_from_running() {
        assert!(JobState::Running.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Completed));
        assert!(JobState::Running.can_transition_to(JobState::Canceled));
        assert!(!JobState::Running.can_transition_to(JobState::Pending));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [JobState::Completed, JobState::Failed, JobState::Canceled] {
            for target in [
                JobState::Running,
                JobState::Completed,
                JobState::Failed,
                JobState::Canceled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_parse_state_text() {
        assert_eq!("running".parse::<JobState>().unwrap(), JobState::Running);
        assert_eq!("Completed\n".parse::<JobState>().unwrap(), JobState::Completed);
        assert_eq!("cancelled".parse::<JobState>().unwrap(), JobState::Canceled);
        assert!("exploded".parse::<JobState>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let state: JobState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(state, JobState::Failed);
        assert_eq!(serde_json::to_string(&JobState::Canceled).unwrap(), "\"canceled\"");
    }
}
