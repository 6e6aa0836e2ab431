//! Viya Jobs - job submission and lifecycle coordinator
//!
//! Turns a stored job definition or job request on a SAS Viya Job
//! Execution service into a running job, polls it to a terminal state,
//! lets the operator cancel it mid-flight, and reports a structured
//! outcome.

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod mock;
pub mod resolver;
pub mod session;
pub mod signal;
pub mod state;
pub mod summary;
pub mod timeout;

pub use cancel::{CancelToken, CancellationController, Confirm, FixedAnswer, InterruptDecision, StdinConfirm};
pub use config::{ConfigError, ConfigLayer, RunnerConfig};
pub use coordinator::{
    CancelOutcome, CoordinatorOptions, JobCoordinator, RunHandle, RunOutcome, TerminalOutcome,
};
pub use error::{CoordinatorError, CoordinatorResult};
pub use host::{ApiError, HttpTransport, JobsClient, MockTransport, Transport, TransportError};
pub use resolver::{JobSource, RequestOrigin, RequestResolver, ResolutionError, ResolvedRequest};
pub use session::SessionContext;
pub use summary::ExitCode;
pub use viya_jobs_protocol::JobState;
