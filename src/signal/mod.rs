//! OS interrupt handling
//!
//! The first SIGINT (Ctrl-C) raises the run's `CancelToken`; the run loop
//! then asks the operator what to do. A second interrupt that arrives
//! before the first one has been serviced (typically while the prompt is
//! open) exits the process immediately. The remote job is left as it is.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::cancel::CancelToken;

/// Exit code after an immediate exit on a second interrupt
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Raise the token and let the run loop prompt
    RequestCancel,
    /// Interrupt while a previous one is still pending
    ImmediateExit,
}

/// Signal handler state
#[derive(Debug, Default)]
pub struct SignalState {
    token: CancelToken,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            signal_count: AtomicU8::new(0),
        }
    }

    /// Number of signals received
    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Record a signal and decide what to do
    pub fn handle_signal(&self) -> SignalAction {
        let _ = self
            .signal_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_add(1)));

        if self.token.is_raised() {
            SignalAction::ImmediateExit
        } else {
            self.token.raise();
            SignalAction::RequestCancel
        }
    }
}

/// Installs the process signal handler
pub struct SignalHandler {
    state: Arc<SignalState>,
}

impl SignalHandler {
    pub fn new(token: CancelToken) -> Self {
        Self {
            state: Arc::new(SignalState::new(token)),
        }
    }

    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Install the SIGINT handler
    ///
    /// Must be called once at program startup.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::RequestCancel => {
                eprintln!("\nReceived interrupt, will ask before canceling the job...");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting without canceling the job");
                std::process::exit(EXIT_CODE_INTERRUPTED);
            }
        })
    }
}
