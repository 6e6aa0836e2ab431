//! Viya Jobs CLI
//!
//! Entry point for the `viya-job` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use viya_jobs::cancel::{CancelToken, CancellationController, Confirm, FixedAnswer, StdinConfirm};
use viya_jobs::config::{ConfigLayer, RunnerConfig};
use viya_jobs::coordinator::{request_cancel, CancelOutcome, JobCoordinator, RunHandle};
use viya_jobs::host::{HttpTransport, JobsClient};
use viya_jobs::signal::SignalHandler;
use viya_jobs::summary::{self, ExitCode, Format};
use viya_jobs::{CoordinatorError, JobSource};
use viya_jobs_protocol::{Linked, REL_UPDATE_STATE};

#[derive(Parser)]
#[command(name = "viya-job")]
#[command(about = "Submit and supervise SAS Viya jobs", version)]
struct Cli {
    /// Path to profile file (default: ~/.config/viya-jobs/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Service base URL (overrides VIYA_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token (overrides VIYA_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Delay between polls in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job and wait for it to finish
    Run {
        /// Job definition to run
        #[arg(long, conflicts_with = "request_id", required_unless_present = "request_id")]
        definition_id: Option<String>,

        /// Compute context for a new request (default from config)
        #[arg(long, requires = "definition_id")]
        context: Option<String>,

        /// Existing job request to run
        #[arg(long)]
        request_id: Option<String>,

        /// Cancel the job after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Cancel on interrupt without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the state of an execution
    Status {
        /// Execution ID
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running execution
    Cancel {
        /// Execution ID
        execution_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let timeout = match &cli.command {
        Commands::Run { timeout, .. } => *timeout,
        _ => None,
    };
    let config = load_config(&cli, timeout);

    let code = match cli.command {
        Commands::Run {
            definition_id,
            context,
            request_id,
            yes,
            json,
            ..
        } => {
            let source = match (definition_id, request_id) {
                (Some(definition_id), _) => JobSource::Definition {
                    definition_id,
                    context_name: context.unwrap_or_else(|| config.default_context.clone()),
                },
                (None, Some(request_id)) => JobSource::Request { request_id },
                (None, None) => {
                    eprintln!("error: either --definition-id or --request-id is required");
                    process::exit(ExitCode::Config.as_i32());
                }
            };
            run_job(&config, &source, yes, Format::from_json_flag(json))
        }
        Commands::Status { execution_id, json } => {
            run_status(&config, &execution_id, Format::from_json_flag(json))
        }
        Commands::Cancel { execution_id, json } => {
            run_cancel(&config, &execution_id, Format::from_json_flag(json))
        }
    };

    process::exit(code.as_i32());
}

fn load_config(cli: &Cli, timeout: Option<u64>) -> RunnerConfig {
    let (profile, required) = match &cli.config {
        Some(path) => (Some(path.clone()), true),
        None => (RunnerConfig::default_path(), false),
    };

    let env = match ConfigLayer::from_env() {
        Ok(layer) => layer,
        Err(e) => config_error(&e),
    };
    let flags = ConfigLayer {
        base_url: cli.base_url.clone(),
        token: cli.token.clone(),
        poll_interval_ms: cli.poll_interval_ms,
        timeout_seconds: timeout,
        ..ConfigLayer::default()
    };

    match RunnerConfig::build(profile.as_deref(), required, env, flags) {
        Ok(config) => {
            tracing::debug!(sources = ?config.sources, "loaded configuration");
            config
        }
        Err(e) => config_error(&e),
    }
}

fn config_error(error: &dyn std::fmt::Display) -> ! {
    eprintln!("Error loading config: {}", error);
    process::exit(ExitCode::Config.as_i32());
}

fn client(config: &RunnerConfig) -> JobsClient {
    match HttpTransport::new(Arc::new(config.session()), config.http_timeout()) {
        Ok(transport) => JobsClient::new(Arc::new(transport)),
        Err(e) => {
            eprintln!("error: could not create HTTP client: {}", e);
            process::exit(ExitCode::Transport.as_i32());
        }
    }
}

fn run_job(config: &RunnerConfig, source: &JobSource, yes: bool, format: Format) -> ExitCode {
    let token = CancelToken::new();
    if let Err(e) = SignalHandler::new(token.clone()).install() {
        tracing::warn!(error = %e, "could not install interrupt handler");
    }
    let confirm: Box<dyn Confirm> = if yes {
        Box::new(FixedAnswer::yes())
    } else {
        Box::new(StdinConfirm)
    };
    let mut controller = CancellationController::new(token, confirm);

    let coordinator = JobCoordinator::new(client(config), config.coordinator_options());
    let result = coordinator
        .submit(source)
        .and_then(|mut handle: RunHandle| {
            if format == Format::Text {
                eprintln!(
                    "Submitted job {} from request {}",
                    handle.execution_id(),
                    handle.request().request.id
                );
            }
            handle.run(&mut controller)
        });

    match result {
        Ok(outcome) => {
            print_rendered(summary::render_run(&outcome, format));
            ExitCode::for_run(&outcome)
        }
        Err(e) => report_error(&e, format),
    }
}

fn run_status(config: &RunnerConfig, execution_id: &str, format: Format) -> ExitCode {
    match client(config).get_execution_by_id(execution_id) {
        Ok(execution) => {
            print_rendered(summary::render_execution(&execution, format));
            ExitCode::Success
        }
        Err(e) => report_error(&CoordinatorError::from(e), format),
    }
}

/// Cancel by id without a run handle
///
/// A finished job is left alone, as with `RunHandle::cancel`.
fn run_cancel(config: &RunnerConfig, execution_id: &str, format: Format) -> ExitCode {
    let client = client(config);
    let execution = match client.get_execution_by_id(execution_id) {
        Ok(execution) => execution,
        Err(e) => return report_error(&CoordinatorError::from(e), format),
    };

    let outcome = if execution.is_terminal() {
        CancelOutcome::already_terminal(execution_id, execution.state)
    } else {
        request_cancel(
            &client,
            execution_id,
            execution.state,
            execution.link(REL_UPDATE_STATE),
            || client.get_execution_by_id(execution_id).ok().map(|e| e.state),
        )
    };

    print_rendered(summary::render_cancel(&outcome, format));
    ExitCode::for_cancel(&outcome)
}

fn print_rendered(rendered: Result<String, serde_json::Error>) {
    match rendered {
        Ok(text) => print!("{}", ensure_newline(text)),
        Err(e) => eprintln!("error: could not render output: {}", e),
    }
}

fn ensure_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn report_error(error: &CoordinatorError, format: Format) -> ExitCode {
    match format {
        Format::Json => println!("{}", summary::render_error(error, format)),
        Format::Text => eprintln!("{}", summary::render_error(error, format)),
    }
    ExitCode::for_error(error)
}
