//! Operator-driven cancellation
//!
//! An interrupt raises a `CancelToken`. The run loop calls
//! `CancellationController::service` between polls; when the token is
//! raised the operator is asked to confirm, and a confirmed interrupt goes
//! through `RunHandle::cancel`. The token stays raised while the prompt is
//! open, so a second interrupt at the prompt can be told apart from a
//! fresh one.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use viya_jobs_protocol::JobState;

use crate::coordinator::{CancelOutcome, RunHandle};

/// Shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    raised: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Mark the request as handled
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }
}

/// Asks the operator whether to cancel
pub trait Confirm {
    fn confirm(&mut self, execution_id: &str) -> bool;
}

/// Fixed answer, for tests and `--yes`
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer {
    answer: bool,
    asked: usize,
}

impl FixedAnswer {
    pub fn yes() -> Self {
        Self { answer: true, asked: 0 }
    }

    pub fn no() -> Self {
        Self { answer: false, asked: 0 }
    }

    /// Number of times the question was asked
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _execution_id: &str) -> bool {
        self.asked += 1;
        self.answer
    }
}

/// Yes/no prompt on stderr, answer read from stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, execution_id: &str) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        ask(&mut input, &mut output, execution_id).unwrap_or(false)
    }
}

/// Prompt on `output` and read one answer line from `input`
///
/// End of input counts as no.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, execution_id: &str) -> io::Result<bool> {
    write!(output, "\nCancel job {}? [y/N] ", execution_id)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    Ok(parse_answer(&line))
}

fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// What happened when an interrupt was serviced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptDecision {
    /// The operator confirmed and a cancel was attempted
    Cancelled(CancelOutcome),
    /// The job finished before anything was sent
    AlreadyTerminal(JobState),
    /// The operator chose to leave the job running
    Declined { execution_id: String },
}

/// Turns raised interrupts into cancel decisions
pub struct CancellationController {
    token: CancelToken,
    confirm: Box<dyn Confirm>,
}

impl CancellationController {
    pub fn new(token: CancelToken, confirm: Box<dyn Confirm>) -> Self {
        Self { token, confirm }
    }

    /// Controller with no interrupt source that never prompts
    pub fn inert() -> Self {
        Self::new(CancelToken::new(), Box::new(FixedAnswer::no()))
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Handle a pending interrupt, if any
    ///
    /// Returns `None` when no interrupt is pending.
    pub fn service(&mut self, handle: &mut RunHandle) -> Option<InterruptDecision> {
        if !self.token.is_raised() {
            return None;
        }
        let decision = self.decide(handle);
        self.token.clear();
        tracing::debug!(execution_id = %handle.execution_id(), ?decision, "serviced interrupt");
        Some(decision)
    }

    fn decide(&mut self, handle: &mut RunHandle) -> InterruptDecision {
        if handle.is_terminal() {
            return InterruptDecision::AlreadyTerminal(handle.current_state());
        }

        let execution_id = handle.execution_id().to_string();
        if !self.confirm.confirm(&execution_id) {
            return InterruptDecision::Declined { execution_id };
        }

        let outcome = handle.cancel();
        if outcome.already_terminal {
            InterruptDecision::AlreadyTerminal(outcome.state)
        } else {
            InterruptDecision::Cancelled(outcome)
        }
    }
}
