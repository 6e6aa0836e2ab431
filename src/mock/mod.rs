//! Mock Job Execution service
//!
//! In-process fake of the Job Execution REST API for testing the resolver,
//! the coordinator and the cancellation path without a live server.
//!
//! # Endpoints
//!
//! - `GET  /jobExecution/jobDefinitions/{id}`
//! - `GET  /jobExecution/jobRequests?filter=eq(jobDefinitionUri,'...')&sortBy=...`
//! - `POST /jobExecution/jobRequests`
//! - `GET  /jobExecution/jobRequests/{id}`
//! - `POST /jobExecution/jobRequests/{id}/jobs`
//! - `GET  /jobExecution/jobs/{id}`
//! - `GET  /jobExecution/jobs/{id}/state`
//! - `PUT  /jobExecution/jobs/{id}/state?value=...`
//!
//! Executions follow a per-request script of states, one step per fetch.

mod failure;
mod service;
mod state;

pub use failure::{FailureConfig, FailureInjector};
pub use service::MockViya;
pub use state::{MockState, ScriptedState};
