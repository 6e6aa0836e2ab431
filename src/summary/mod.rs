//! Outcome reporting and exit codes

mod exit_code;
mod report;

pub use exit_code::ExitCode;
pub use report::{render_cancel, render_error, render_execution, render_run, Format};
