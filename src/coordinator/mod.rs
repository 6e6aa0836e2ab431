//! Job coordinator
//!
//! Resolves a request, submits it, and hands back a `RunHandle` that polls
//! the execution to a terminal state. One coordinator drives at most one
//! active execution at a time; a second submit while a handle is still
//! live and non-terminal is refused.

mod cancel_request;
mod handle;
mod outcome;
mod sleeper;

pub use cancel_request::request_cancel;
pub use handle::RunHandle;
pub use outcome::{CancelOutcome, RunOutcome, TerminalOutcome};
pub use sleeper::{NoopSleeper, RecordingSleeper, Sleeper, ThreadSleeper};

use std::sync::Arc;
use std::time::Duration;

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::host::{JobsClient, Transport};
use crate::resolver::{JobSource, RequestResolver};
use crate::timeout::{Clock, SystemClock};
use handle::ActiveSlot;

/// Polling behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Fixed delay between polls
    pub poll_interval: Duration,
    /// Wall-clock limit for `RunHandle::run`
    pub deadline: Option<Duration>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            deadline: None,
        }
    }
}

/// Submits jobs and tracks the resulting execution
pub struct JobCoordinator {
    client: JobsClient,
    resolver: RequestResolver,
    options: CoordinatorOptions,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    active: ActiveSlot,
}

impl JobCoordinator {
    pub fn new(client: JobsClient, options: CoordinatorOptions) -> Self {
        Self {
            resolver: RequestResolver::new(client.clone()),
            client,
            options,
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(SystemClock::new()),
            active: ActiveSlot::default(),
        }
    }

    /// Coordinator over a transport with default options
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(JobsClient::new(transport), CoordinatorOptions::default())
    }

    /// Replace the inter-poll sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used for deadlines
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Id of the live, non-terminal execution, if any
    pub fn active_execution(&self) -> Option<String> {
        self.active.holder()
    }

    /// Run a definition in a compute context
    ///
    /// Reuses the most recently modified request for the definition, or
    /// creates one when none exist.
    pub fn submit_from_definition(
        &self,
        definition_id: &str,
        context_name: &str,
    ) -> CoordinatorResult<RunHandle> {
        self.submit(&JobSource::Definition {
            definition_id: definition_id.to_string(),
            context_name: context_name.to_string(),
        })
    }

    /// Run an existing request
    pub fn submit_from_request(&self, request_id: &str) -> CoordinatorResult<RunHandle> {
        self.submit(&JobSource::Request {
            request_id: request_id.to_string(),
        })
    }

    /// Resolve and submit
    ///
    /// The submit call is never retried: repeating it would start a second
    /// execution.
    pub fn submit(&self, source: &JobSource) -> CoordinatorResult<RunHandle> {
        if let Some(execution_id) = self.active.holder() {
            return Err(CoordinatorError::Busy { execution_id });
        }

        let resolved = self.resolver.resolve(source)?;
        let execution = self.client.submit(&resolved.submit_link)?;
        tracing::info!(
            request_id = %resolved.request.id,
            execution_id = %execution.id,
            state = %execution.state,
            "submitted job"
        );

        RunHandle::start(
            self.client.clone(),
            resolved,
            execution,
            self.options,
            Arc::clone(&self.sleeper),
            Arc::clone(&self.clock),
            self.active.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ApiError, Method, MockTransport};
    use crate::mock::{MockViya, ScriptedState};
    use crate::resolver::{RequestOrigin, ResolutionError};
    use viya_jobs_protocol::JobState;

    fn coordinator() -> (Arc<MockViya>, Arc<RecordingSleeper>, JobCoordinator) {
        let service = Arc::new(MockViya::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let transport = Arc::new(MockTransport::with_service(Arc::clone(&service)));
        let coordinator = JobCoordinator::new(JobsClient::new(transport), CoordinatorOptions::default())
            .with_sleeper(sleeper.clone());
        (service, sleeper, coordinator)
    }

    #[test]
    fn test_submit_and_wait() {
        let (service, sleeper, coordinator) = coordinator();
        service.add_definition("d1", "Nightly load");

        let mut handle = coordinator.submit_from_definition("d1", "ctx").unwrap();
        assert_eq!(handle.current_state(), JobState::Running);
        assert_eq!(handle.request().origin, RequestOrigin::Created);

        let outcome = handle.wait_for_completion().unwrap();
        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(outcome.log_location.as_deref(), Some("/files/files/default-log"));
        assert_eq!(outcome.request_id, "req-new-001");
        // running, completed: one sleep between the two fetches
        assert_eq!(service.fetch_count(handle.execution_id()), 2);
        assert_eq!(sleeper.count(), 1);
        assert_eq!(sleeper.delays()[0], Duration::from_millis(500));
    }

    #[test]
    fn test_poll_after_terminal_is_noop() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        handle.wait_for_completion().unwrap();
        let fetches = service.fetch_count(handle.execution_id());

        assert_eq!(handle.poll().unwrap(), JobState::Completed);
        assert_eq!(handle.poll().unwrap(), JobState::Completed);
        assert_eq!(service.fetch_count(handle.execution_id()), fetches);
        assert_eq!(service.submitted_count(), 1);
    }

    #[test]
    fn test_pending_is_polled() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request(
            "r1",
            JobState::Pending,
            vec![
                ScriptedState::pending(),
                ScriptedState::running(),
                ScriptedState::completed_without_results(),
            ],
        );

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        assert_eq!(handle.current_state(), JobState::Pending);

        let outcome = handle.wait_for_completion().unwrap();
        assert_eq!(outcome.state, JobState::Completed);
        assert!(outcome.log_location.is_none());
        let states: Vec<JobState> = handle.history().iter().map(|c| c.state).collect();
        assert_eq!(
            states,
            vec![JobState::Submitted, JobState::Pending, JobState::Running, JobState::Completed]
        );
    }

    #[test]
    fn test_submitted_response_is_polled() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request(
            "r1",
            JobState::Submitted,
            vec![ScriptedState::running(), ScriptedState::completed_without_results()],
        );

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        assert_eq!(handle.current_state(), JobState::Submitted);
        assert_eq!(handle.history().len(), 1);

        let outcome = handle.wait_for_completion().unwrap();
        assert_eq!(outcome.state, JobState::Completed);
    }

    #[test]
    fn test_one_active_execution() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");

        let mut first = coordinator.submit_from_request("r1").unwrap();
        assert_eq!(coordinator.active_execution().as_deref(), Some(first.execution_id()));

        let err = coordinator.submit_from_request("r1").unwrap_err();
        assert!(matches!(err, CoordinatorError::Busy { .. }));
        assert_eq!(service.submitted_count(), 1);

        first.wait_for_completion().unwrap();
        assert!(coordinator.active_execution().is_none());
        let second = coordinator.submit_from_request("r1").unwrap();
        assert_ne!(second.execution_id(), first.execution_id());
    }

    #[test]
    fn test_dropped_handle_frees_coordinator() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");

        let handle = coordinator.submit_from_request("r1").unwrap();
        drop(handle);
        assert!(coordinator.active_execution().is_none());
    }

    #[test]
    fn test_resolution_failure_submits_nothing() {
        let (service, _sleeper, coordinator) = coordinator();

        let err = coordinator.submit_from_definition("missing", "ctx").unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Resolution(ResolutionError::DefinitionNotFound(_))
        ));
        assert_eq!(service.submitted_count(), 0);
        assert!(coordinator.active_execution().is_none());
    }

    #[test]
    fn test_submit_failure() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.inject_status(Method::Post, "/jobExecution/jobRequests/r1/jobs", 503, "overloaded");

        let err = coordinator.submit_from_request("r1").unwrap_err();
        assert!(matches!(err, CoordinatorError::Api(ApiError::Status { status: 503, .. })));
        assert!(coordinator.active_execution().is_none());
    }

    #[test]
    fn test_cancel_running() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request("r1", JobState::Running, vec![ScriptedState::running(); 5]);

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        let outcome = handle.cancel();

        assert!(outcome.ok);
        assert!(!outcome.already_terminal);
        assert_eq!(handle.current_state(), JobState::Canceled);
        assert_eq!(service.state_update_count(), 1);
        assert_eq!(
            service.count_calls(Method::Put, "/jobExecution/jobs/job-0001/state?value=canceled"),
            1
        );
    }

    #[test]
    fn test_cancel_after_terminal() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        handle.wait_for_completion().unwrap();

        let outcome = handle.cancel();
        assert!(outcome.already_terminal);
        assert!(!outcome.ok);
        assert_eq!(handle.current_state(), JobState::Completed);
        assert_eq!(service.count_calls(Method::Put, "/"), 0);
    }

    #[test]
    fn test_cancel_reply_reports_completed() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request("r1", JobState::Running, vec![ScriptedState::running(); 3]);

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        service.finish_before_cancel(ScriptedState::completed_with_log("/files/files/race-log"));
        let outcome = handle.cancel();

        assert!(outcome.already_terminal);
        assert!(!outcome.ok);
        assert_eq!(outcome.state, JobState::Completed);
        assert_eq!(handle.current_state(), JobState::Completed);
        assert!(coordinator.active_execution().is_none());
        let terminal = handle.outcome().unwrap();
        assert_eq!(terminal.log_location.as_deref(), Some("/files/files/race-log"));
    }

    #[test]
    fn test_cancel_refused() {
        let (service, _sleeper, coordinator) = coordinator();
        service.add_request("r1", None, "2024-01-01T00:00:00Z");
        service.script_request("r1", JobState::Running, vec![ScriptedState::running(); 3]);
        service.inject_status(Method::Put, "/jobExecution/jobs", 403, "Not authorized to cancel");

        let mut handle = coordinator.submit_from_request("r1").unwrap();
        let outcome = handle.cancel();

        assert!(!outcome.ok);
        assert!(!outcome.already_terminal);
        assert!(outcome.error.unwrap().contains("Not authorized"));
        assert_eq!(handle.current_state(), JobState::Running);
    }
}
