//! Client-side plumbing to the Job Execution service
//!
//! `transport` performs single authenticated exchanges; `client` maps them
//! to typed resources and errors.

pub mod client;
pub mod transport;

pub use client::{ApiError, ApiResult, JobsClient, RequestQuery};
pub use transport::{Body, HttpTransport, Method, MockTransport, Response, Transport, TransportError};
