//! Handle on one submitted execution

use std::sync::{Arc, Mutex};

use viya_jobs_protocol::{
    JobExecution, JobState, Link, Linked, REL_SELF, REL_UPDATE_STATE,
};

use super::cancel_request::request_cancel;
use super::outcome::{CancelOutcome, RunOutcome, TerminalOutcome};
use super::sleeper::Sleeper;
use super::CoordinatorOptions;
use crate::cancel::{CancellationController, InterruptDecision};
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::host::JobsClient;
use crate::resolver::ResolvedRequest;
use crate::state::{ExecutionRecord, StateChange};
use crate::timeout::{Clock, Deadline};

/// Slot holding the id of the coordinator's active execution
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveSlot(Arc<Mutex<Option<String>>>);

impl ActiveSlot {
    /// Id of the execution currently holding the slot
    pub(crate) fn holder(&self) -> Option<String> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }

    pub(crate) fn claim(&self, execution_id: &str) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(execution_id.to_string());
        }
    }

    fn release(&self, execution_id: &str) {
        if let Ok(mut slot) = self.0.lock() {
            if slot.as_deref() == Some(execution_id) {
                *slot = None;
            }
        }
    }
}

/// A submitted execution being observed by polling
///
/// The handle owns the only mutable view of the execution. Once a terminal
/// state is observed, `poll` stops contacting the service.
pub struct RunHandle {
    client: JobsClient,
    request: ResolvedRequest,
    execution: JobExecution,
    self_link: Link,
    record: ExecutionRecord,
    options: CoordinatorOptions,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    slot: ActiveSlot,
}

impl RunHandle {
    pub(crate) fn start(
        client: JobsClient,
        request: ResolvedRequest,
        execution: JobExecution,
        options: CoordinatorOptions,
        sleeper: Arc<dyn Sleeper>,
        clock: Arc<dyn Clock>,
        slot: ActiveSlot,
    ) -> CoordinatorResult<Self> {
        let self_link = execution
            .link(REL_SELF)
            .cloned()
            .ok_or_else(|| CoordinatorError::MissingLink {
                execution_id: execution.id.clone(),
                rel: REL_SELF,
            })?;

        let mut record = ExecutionRecord::submitted(execution.id.clone());
        record.observe(execution.state)?;

        slot.claim(&execution.id);
        let handle = Self {
            client,
            request,
            execution,
            self_link,
            record,
            options,
            sleeper,
            clock,
            slot,
        };
        if handle.is_terminal() {
            handle.slot.release(&handle.execution.id);
        }
        Ok(handle)
    }

    pub fn execution_id(&self) -> &str {
        &self.execution.id
    }

    /// The request that was submitted
    pub fn request(&self) -> &ResolvedRequest {
        &self.request
    }

    /// Last execution document received
    pub fn execution(&self) -> &JobExecution {
        &self.execution
    }

    /// Last observed state, without contacting the service
    pub fn current_state(&self) -> JobState {
        self.record.state
    }

    pub fn is_terminal(&self) -> bool {
        self.record.is_terminal()
    }

    /// States observed so far
    pub fn history(&self) -> &[StateChange] {
        &self.record.history
    }

    /// Fetch the execution once
    ///
    /// Does nothing once the execution is terminal. Transport failures are
    /// returned without retrying.
    pub fn poll(&mut self) -> CoordinatorResult<JobState> {
        if self.is_terminal() {
            return Ok(self.record.state);
        }

        let link = self.execution.link(REL_SELF).unwrap_or(&self.self_link).clone();
        let fetched = self.client.get_execution(&link)?;
        let changed = self.record.observe(fetched.state)?;
        self.execution = fetched;

        if changed {
            tracing::info!(execution_id = %self.execution.id, state = %self.record.state, "job state changed");
        } else {
            tracing::debug!(execution_id = %self.execution.id, state = %self.record.state, "polled job");
        }
        if self.is_terminal() {
            self.slot.release(&self.execution.id);
        }
        Ok(self.record.state)
    }

    /// Poll until the execution is terminal
    ///
    /// Sleeps the configured interval between fetches.
    pub fn wait_for_completion(&mut self) -> CoordinatorResult<TerminalOutcome> {
        while !self.is_terminal() {
            self.poll()?;
            if !self.is_terminal() {
                self.sleeper.sleep(self.options.poll_interval);
            }
        }
        Ok(self.finish())
    }

    /// Terminal report, once the execution is terminal
    pub fn outcome(&self) -> Option<TerminalOutcome> {
        self.is_terminal().then(|| self.finish())
    }

    /// Ask the service to cancel the execution
    ///
    /// A terminal execution is left alone. Otherwise the state is refreshed
    /// first so a job that finished since the last poll is reported as
    /// already terminal instead of being sent a state update. If the reply
    /// to the update reports another terminal state, that state is kept.
    /// A failed update is reported in the outcome and not retried.
    pub fn cancel(&mut self) -> CancelOutcome {
        let execution_id = self.execution.id.clone();
        if self.is_terminal() {
            return CancelOutcome::already_terminal(&execution_id, self.record.state);
        }

        if let Err(e) = self.poll() {
            tracing::warn!(%execution_id, error = %e, "could not refresh job before cancel");
            return CancelOutcome::failed(&execution_id, self.record.state, e.to_string());
        }
        if self.is_terminal() {
            tracing::info!(%execution_id, state = %self.record.state, "job finished before cancel");
            return CancelOutcome::already_terminal(&execution_id, self.record.state);
        }

        let link = self.execution.link(REL_UPDATE_STATE).cloned();
        let client = self.client.clone();
        let state = self.record.state;
        let outcome = request_cancel(&client, &execution_id, state, link.as_ref(), || {
            self.poll().ok()
        });

        if outcome.ok {
            if let Err(e) = self.record.observe(JobState::Canceled) {
                return CancelOutcome::failed(&execution_id, self.record.state, e.to_string());
            }
            self.slot.release(&execution_id);
        } else if outcome.already_terminal && !self.is_terminal() {
            // The update reply carried the final state; fetch the finished document
            if !matches!(self.poll(), Ok(s) if s.is_terminal()) {
                if let Err(e) = self.record.observe(outcome.state) {
                    return CancelOutcome::failed(&execution_id, self.record.state, e.to_string());
                }
                self.slot.release(&execution_id);
            }
            return CancelOutcome::already_terminal(&execution_id, self.record.state);
        }
        outcome
    }

    /// Poll to completion while servicing interrupts and the deadline
    ///
    /// A confirmed interrupt cancels the job. An accepted cancel makes the
    /// job terminal locally and the run finishes at once; after a failed
    /// cancel polling continues until the service reports a terminal state.
    /// A declined interrupt returns `RunOutcome::Detached` with the job
    /// still running. An expired
    /// deadline cancels through `cancel` and reports `RunOutcome::TimedOut`.
    pub fn run(&mut self, controller: &mut CancellationController) -> CoordinatorResult<RunOutcome> {
        let deadline = self
            .options
            .deadline
            .map(|limit| Deadline::new(limit, Arc::clone(&self.clock)));
        let mut cancel_attempt: Option<CancelOutcome> = None;

        loop {
            if self.is_terminal() {
                return Ok(RunOutcome::Finished {
                    terminal: self.finish(),
                    cancel: cancel_attempt,
                });
            }

            match controller.service(self) {
                Some(InterruptDecision::Cancelled(outcome)) => {
                    cancel_attempt = Some(outcome);
                    continue;
                }
                Some(InterruptDecision::AlreadyTerminal(_)) => continue,
                Some(InterruptDecision::Declined { execution_id }) => {
                    tracing::info!(%execution_id, "leaving job running");
                    return Ok(RunOutcome::Detached {
                        execution_id,
                        state: self.record.state,
                    });
                }
                None => {}
            }

            if let Some(deadline) = &deadline {
                if deadline.expired() {
                    tracing::warn!(
                        execution_id = %self.execution.id,
                        limit_secs = deadline.limit().as_secs(),
                        "deadline exceeded, canceling job"
                    );
                    let cancel = self.cancel();
                    let terminal = self.wait_for_completion()?;
                    if cancel.already_terminal {
                        return Ok(RunOutcome::Finished {
                            terminal,
                            cancel: cancel_attempt,
                        });
                    }
                    return Ok(RunOutcome::TimedOut { terminal, cancel });
                }
            }

            self.poll()?;
            if !self.is_terminal() {
                self.sleeper.sleep(self.options.poll_interval);
            }
        }
    }

    fn finish(&self) -> TerminalOutcome {
        TerminalOutcome::from_execution(&self.execution, &self.request.request.id, self.record.state)
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.slot.release(&self.execution.id);
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("execution_id", &self.execution.id)
            .field("request_id", &self.request.request.id)
            .field("state", &self.record.state)
            .finish()
    }
}
