//! Cancel request shared by run handles and the `cancel` subcommand

use viya_jobs_protocol::{JobState, Link, REL_UPDATE_STATE};

use super::outcome::CancelOutcome;
use crate::host::{ApiError, JobsClient};

/// Ask the service to cancel a non-terminal execution
///
/// `state` is the last state seen locally. The reply to the state update
/// decides the outcome: a terminal state other than `canceled` means the
/// job finished before the update took effect. On HTTP 409 `refresh` is
/// called once to read the current state.
pub fn request_cancel<F>(
    client: &JobsClient,
    execution_id: &str,
    state: JobState,
    update_link: Option<&Link>,
    refresh: F,
) -> CancelOutcome
where
    F: FnOnce() -> Option<JobState>,
{
    let Some(link) = update_link else {
        return CancelOutcome::failed(
            execution_id,
            state,
            format!("Job {} has no '{}' link", execution_id, REL_UPDATE_STATE),
        );
    };

    match client.update_state(link, JobState::Canceled) {
        Ok(reported) if reported.is_terminal() && reported != JobState::Canceled => {
            tracing::info!(%execution_id, state = %reported, "job finished before cancel took effect");
            CancelOutcome::already_terminal(execution_id, reported)
        }
        Ok(_) => {
            tracing::info!(%execution_id, "job canceled");
            CancelOutcome::accepted(execution_id)
        }
        // The service refuses updates to finished jobs
        Err(ApiError::Status { status: 409, .. }) => match refresh() {
            Some(current) if current.is_terminal() => {
                CancelOutcome::already_terminal(execution_id, current)
            }
            current => CancelOutcome::failed(
                execution_id,
                current.unwrap_or(state),
                "The service refused the cancel request (HTTP 409)",
            ),
        },
        Err(e) => {
            tracing::warn!(%execution_id, error = %e, "cancel request failed");
            CancelOutcome::failed(execution_id, state, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::host::{Method, MockTransport};
    use crate::mock::{MockViya, ScriptedState};
    use viya_jobs_protocol::Linked;

    fn running_job(service: &Arc<MockViya>) -> (JobsClient, viya_jobs_protocol::JobExecution) {
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request("r1", JobState::Running, vec![ScriptedState::running(); 3]);
        let client = JobsClient::new(Arc::new(MockTransport::with_service(Arc::clone(service))));
        let request = client.get_request("r1").unwrap();
        let execution = client.submit(request.link("submitJob").unwrap()).unwrap();
        (client, execution)
    }

    #[test]
    fn test_accepted() {
        let service = Arc::new(MockViya::new());
        let (client, execution) = running_job(&service);

        let outcome = request_cancel(
            &client,
            &execution.id,
            execution.state,
            execution.link(REL_UPDATE_STATE),
            || None,
        );
        assert!(outcome.ok);
        assert_eq!(outcome.state, JobState::Canceled);
        assert_eq!(service.execution_state(&execution.id), Some(JobState::Canceled));
    }

    #[test]
    fn test_reply_with_finished_state() {
        let service = Arc::new(MockViya::new());
        let (client, execution) = running_job(&service);
        service.finish_before_cancel(ScriptedState::completed_with_log("/files/files/log"));

        let outcome = request_cancel(
            &client,
            &execution.id,
            execution.state,
            execution.link(REL_UPDATE_STATE),
            || panic!("no refresh expected"),
        );
        assert!(outcome.already_terminal);
        assert!(!outcome.ok);
        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(service.state_update_count(), 0);
    }

    #[test]
    fn test_conflict_refreshes_once() {
        let service = Arc::new(MockViya::new());
        let (client, execution) = running_job(&service);
        service.inject_status(Method::Put, "/jobExecution/jobs", 409, "already finished");

        let mut refreshes = 0;
        let outcome = request_cancel(
            &client,
            &execution.id,
            execution.state,
            execution.link(REL_UPDATE_STATE),
            || {
                refreshes += 1;
                Some(JobState::Failed)
            },
        );
        assert_eq!(refreshes, 1);
        assert!(outcome.already_terminal);
        assert_eq!(outcome.state, JobState::Failed);
    }

    #[test]
    fn test_conflict_while_still_running() {
        let service = Arc::new(MockViya::new());
        let (client, execution) = running_job(&service);
        service.inject_status(Method::Put, "/jobExecution/jobs", 409, "busy");

        let outcome = request_cancel(
            &client,
            &execution.id,
            execution.state,
            execution.link(REL_UPDATE_STATE),
            || Some(JobState::Running),
        );
        assert!(!outcome.ok);
        assert!(!outcome.already_terminal);
        assert_eq!(outcome.state, JobState::Running);
        assert!(outcome.error.unwrap().contains("409"));
    }

    #[test]
    fn test_missing_link() {
        let service = Arc::new(MockViya::new());
        let (client, execution) = running_job(&service);

        let outcome = request_cancel(&client, &execution.id, execution.state, None, || None);
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains(REL_UPDATE_STATE));
        assert_eq!(service.count_calls(Method::Put, "/"), 0);
    }
}
