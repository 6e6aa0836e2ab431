//! Job Execution resources.

mod definition;
mod execution;
mod request;

pub use definition::JobDefinition;
pub use execution::JobExecution;
pub use request::{JobRequest, NewJobRequest};
