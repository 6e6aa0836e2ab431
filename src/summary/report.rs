//! Human and JSON rendering of outcomes

use std::fmt::Write as _;

use serde::Serialize;

use viya_jobs_protocol::JobExecution;

use super::exit_code::ExitCode;
use crate::coordinator::{CancelOutcome, RunOutcome, TerminalOutcome};
use crate::error::CoordinatorError;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl Format {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Format::Json
        } else {
            Format::Text
        }
    }
}

#[derive(Serialize)]
struct Report<'a, T: Serialize> {
    #[serde(flatten)]
    body: &'a T,
    exit_code: i32,
}

fn to_json<T: Serialize>(body: &T, exit_code: ExitCode) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Report {
        body,
        exit_code: exit_code.as_i32(),
    })
}

/// Render the result of `run`
pub fn render_run(outcome: &RunOutcome, format: Format) -> Result<String, serde_json::Error> {
    let exit_code = ExitCode::for_run(outcome);
    if format == Format::Json {
        return to_json(outcome, exit_code);
    }

    let mut out = String::new();
    match outcome {
        RunOutcome::Finished { terminal, cancel } => {
            write_terminal(&mut out, terminal);
            if let Some(cancel) = cancel {
                write_cancel_line(&mut out, cancel);
            }
        }
        RunOutcome::Detached {
            execution_id,
            state,
        } => {
            let _ = writeln!(out, "Job {} left {} at operator request.", execution_id, state);
            let _ = writeln!(out, "Track it with: viya-job status {}", execution_id);
        }
        RunOutcome::TimedOut { terminal, cancel } => {
            let _ = writeln!(out, "Deadline exceeded; cancel requested.");
            write_terminal(&mut out, terminal);
            write_cancel_line(&mut out, cancel);
        }
    }
    Ok(out)
}

/// Render the result of `cancel`
pub fn render_cancel(outcome: &CancelOutcome, format: Format) -> Result<String, serde_json::Error> {
    if format == Format::Json {
        return to_json(outcome, ExitCode::for_cancel(outcome));
    }
    let mut out = String::new();
    write_cancel_line(&mut out, outcome);
    Ok(out)
}

/// Render an execution document for `status`
pub fn render_execution(execution: &JobExecution, format: Format) -> Result<String, serde_json::Error> {
    if format == Format::Json {
        return serde_json::to_string_pretty(execution);
    }

    let mut out = String::new();
    row(&mut out, "Execution", &execution.id);
    row(&mut out, "State", execution.state.as_str());
    if let Some(details) = &execution.state_details {
        row(&mut out, "Detail", details);
    }
    if let Some(created) = &execution.creation_time_stamp {
        row(&mut out, "Created", &created.to_rfc3339());
    }
    if let Some(ended) = &execution.end_time_stamp {
        row(&mut out, "Ended", &ended.to_rfc3339());
    }
    if let Some(results) = &execution.results {
        for (name, location) in results {
            row(&mut out, "Result", &format!("{}  {}", name, location));
        }
    }
    Ok(out)
}

/// Render a hard failure
pub fn render_error(error: &CoordinatorError, format: Format) -> String {
    let exit_code = ExitCode::for_error(error);
    match format {
        Format::Json => serde_json::json!({
            "error": error.to_string(),
            "exit_code": exit_code.as_i32(),
        })
        .to_string(),
        Format::Text => format!("error: {}", error),
    }
}

fn write_terminal(out: &mut String, terminal: &TerminalOutcome) {
    row(out, "Execution", &terminal.execution_id);
    row(out, "Request", &terminal.request_id);
    row(out, "State", terminal.state.as_str());
    if let Some(detail) = &terminal.detail {
        row(out, "Detail", detail);
    }
    if let Some(log) = &terminal.log_location {
        row(out, "Log", log);
    }
    if let Some(list) = &terminal.list_location {
        row(out, "Listing", list);
    }
    for (name, location) in &terminal.result_locations {
        row(out, "Result", &format!("{}  {}", name, location));
    }
}

fn write_cancel_line(out: &mut String, cancel: &CancelOutcome) {
    let text = if cancel.already_terminal {
        format!("job had already finished ({})", cancel.state)
    } else if cancel.ok {
        "canceled".to_string()
    } else {
        format!(
            "failed: {}",
            cancel.error.as_deref().unwrap_or("no reason given")
        )
    };
    row(out, "Cancel", &text);
}

fn row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<10} {}", label, value);
}
