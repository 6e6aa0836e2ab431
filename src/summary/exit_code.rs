//! Process exit codes

use serde::{Deserialize, Serialize};

use viya_jobs_protocol::JobState;

use crate::coordinator::{CancelOutcome, RunOutcome};
use crate::error::CoordinatorError;
use crate::host::ApiError;

/// Stable exit codes for `viya-job`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Job completed
    Success = 0,
    /// Job reached `failed`
    JobFailed = 1,
    /// Job reached `canceled`
    JobCanceled = 2,
    /// Operator declined to cancel; job left running
    Detached = 3,
    /// Deadline passed and the job was canceled
    TimedOut = 4,
    /// Definition or request not found
    Resolution = 10,
    /// Coordinator already drives an execution
    Busy = 11,
    /// HTTP or connectivity failure
    Transport = 20,
    /// Unexpected document from the service
    Protocol = 21,
    /// Invalid configuration
    Config = 30,
    /// Second interrupt
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::JobFailed),
            2 => Some(ExitCode::JobCanceled),
            3 => Some(ExitCode::Detached),
            4 => Some(ExitCode::TimedOut),
            10 => Some(ExitCode::Resolution),
            11 => Some(ExitCode::Busy),
            20 => Some(ExitCode::Transport),
            21 => Some(ExitCode::Protocol),
            30 => Some(ExitCode::Config),
            130 => Some(ExitCode::Interrupted),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Code for a terminal job state
    ///
    /// Non-terminal states map to `Detached`: the job is still running.
    pub fn for_state(state: JobState) -> Self {
        match state {
            JobState::Completed => ExitCode::Success,
            JobState::Failed => ExitCode::JobFailed,
            JobState::Canceled => ExitCode::JobCanceled,
            JobState::Submitted | JobState::Pending | JobState::Running => ExitCode::Detached,
        }
    }

    pub fn for_run(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Finished { terminal, .. } => Self::for_state(terminal.state),
            RunOutcome::Detached { .. } => ExitCode::Detached,
            RunOutcome::TimedOut { .. } => ExitCode::TimedOut,
        }
    }

    /// Code for the `cancel` subcommand
    ///
    /// A job that was already finished is not a failure.
    pub fn for_cancel(outcome: &CancelOutcome) -> Self {
        if outcome.ok || outcome.already_terminal {
            ExitCode::Success
        } else {
            ExitCode::Transport
        }
    }

    pub fn for_error(error: &CoordinatorError) -> Self {
        match error {
            CoordinatorError::Resolution(_) => ExitCode::Resolution,
            CoordinatorError::Busy { .. } => ExitCode::Busy,
            CoordinatorError::Api(ApiError::Protocol(_)) => ExitCode::Protocol,
            CoordinatorError::Api(_) => ExitCode::Transport,
            CoordinatorError::State(_) | CoordinatorError::MissingLink { .. } => ExitCode::Protocol,
        }
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        ExitCode::Success
    }
}
