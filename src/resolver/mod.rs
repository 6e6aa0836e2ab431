//! Request resolution
//!
//! Turns a job definition id or a job request id into a concrete job
//! request and its submit link. For definitions, an existing request is
//! reused when one references the definition, so repeated runs of the same
//! definition do not pile up duplicate requests.

use chrono::Utc;

use viya_jobs_protocol::{
    JobDefinition, JobRequest, Link, Linked, NewJobRequest, REL_SUBMIT,
};

use crate::error::{CoordinatorError, CoordinatorResult};
use crate::host::{ApiError, JobsClient, RequestQuery};

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// A stored definition, run in the named compute context
    Definition {
        definition_id: String,
        context_name: String,
    },
    /// An existing job request
    Request { request_id: String },
}

/// How the request was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOrigin {
    /// An existing request for the definition was reused
    Reused,
    /// No request referenced the definition; one was created
    Created,
    /// The caller named the request directly
    Direct,
}

/// A request ready to submit
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub request: JobRequest,
    pub submit_link: Link,
    pub origin: RequestOrigin,
}

impl ResolvedRequest {
    pub fn request_id(&self) -> &str {
        &self.request.id
    }
}

/// Resolution failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("Job definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Job request not found: {0}")]
    RequestNotFound(String),

    #[error("Job request {request_id} has no '{rel}' link")]
    MissingLink { request_id: String, rel: &'static str },
}

/// Resolves job sources to submittable requests
pub struct RequestResolver {
    client: JobsClient,
}

impl RequestResolver {
    pub fn new(client: JobsClient) -> Self {
        Self { client }
    }

    /// Resolve a source to a request and its submit link
    ///
    /// Lookup and creation failures are returned as-is; nothing is retried.
    pub fn resolve(&self, source: &JobSource) -> CoordinatorResult<ResolvedRequest> {
        let (request, origin) = match source {
            JobSource::Definition {
                definition_id,
                context_name,
            } => self.resolve_definition(definition_id, context_name)?,
            JobSource::Request { request_id } => (self.fetch_request(request_id)?, RequestOrigin::Direct),
        };

        let submit_link = request
            .link(REL_SUBMIT)
            .cloned()
            .ok_or_else(|| ResolutionError::MissingLink {
                request_id: request.id.clone(),
                rel: REL_SUBMIT,
            })?;

        tracing::info!(request_id = %request.id, ?origin, "resolved job request");
        Ok(ResolvedRequest {
            request,
            submit_link,
            origin,
        })
    }

    fn resolve_definition(
        &self,
        definition_id: &str,
        context_name: &str,
    ) -> CoordinatorResult<(JobRequest, RequestOrigin)> {
        let definition = self.client.get_definition(definition_id).map_err(|e| match e {
            ApiError::NotFound { .. } => {
                CoordinatorError::from(ResolutionError::DefinitionNotFound(definition_id.to_string()))
            }
            other => CoordinatorError::from(other),
        })?;

        let existing = self
            .client
            .find_requests(&RequestQuery::for_definition(definition.uri()))?;
        tracing::debug!(
            definition_id,
            candidates = existing.items.len(),
            "looked up existing requests"
        );

        if let Some(request) = select_most_recent(existing.items) {
            return Ok((request, RequestOrigin::Reused));
        }

        let created = self.client.create_request(&new_request_for(&definition, context_name))?;
        tracing::info!(request_id = %created.id, definition_id, "created job request");
        Ok((created, RequestOrigin::Created))
    }

    fn fetch_request(&self, request_id: &str) -> CoordinatorResult<JobRequest> {
        self.client.get_request(request_id).map_err(|e| match e {
            ApiError::NotFound { .. } => {
                CoordinatorError::from(ResolutionError::RequestNotFound(request_id.to_string()))
            }
            other => CoordinatorError::from(other),
        })
    }
}

/// Pick the most recently modified request
///
/// The list is requested sorted newest first, so the first item normally
/// wins; the timestamps are still compared in case the service ignored the
/// sort. Ties keep the earlier item. Requests without a timestamp lose to
/// any request that has one.
pub fn select_most_recent(requests: Vec<JobRequest>) -> Option<JobRequest> {
    let mut best: Option<JobRequest> = None;
    for candidate in requests {
        let replace = match &best {
            None => true,
            Some(current) => candidate.modified_time_stamp > current.modified_time_stamp,
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Body for a new request instantiating `definition`
pub fn new_request_for(definition: &JobDefinition, context_name: &str) -> NewJobRequest {
    let name = if definition.name.is_empty() {
        format!("{} request", definition.id)
    } else {
        format!("{} request", definition.name)
    };
    let description = format!(
        "Created by viya-job for job definition {} on {}",
        definition.id,
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    NewJobRequest::for_definition(name, description, definition.uri(), context_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::host::{Method, MockTransport};
    use crate::mock::MockViya;

    fn resolver() -> (Arc<MockViya>, RequestResolver) {
        let service = Arc::new(MockViya::new());
        let transport = Arc::new(MockTransport::with_service(Arc::clone(&service)));
        (service, RequestResolver::new(JobsClient::new(transport)))
    }

    fn definition_source(id: &str) -> JobSource {
        JobSource::Definition {
            definition_id: id.to_string(),
            context_name: "ctx".to_string(),
        }
    }

    fn request(id: &str, modified: Option<&str>) -> JobRequest {
        JobRequest {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            job_definition_uri: None,
            arguments: BTreeMap::new(),
            creation_time_stamp: None,
            modified_time_stamp: modified.map(|m| m.parse().unwrap()),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_creates_request_when_none_exist() {
        let (service, resolver) = resolver();
        service.add_definition("d1", "Nightly load");

        let resolved = resolver.resolve(&definition_source("d1")).unwrap();

        assert_eq!(resolved.origin, RequestOrigin::Created);
        assert_eq!(service.created_request_count(), 1);
        assert_eq!(resolved.request.context_name(), Some("ctx"));
        assert_eq!(resolved.request.arguments.get("_omitJsonLog").map(String::as_str), Some("true"));
        assert_eq!(resolved.request.name, "Nightly load request");
        assert!(resolved.submit_link.href.ends_with("/jobs"));
    }

    #[test]
    fn test_reuses_most_recent_request() {
        let (service, resolver) = resolver();
        service.add_definition("d1", "Nightly load");
        service.add_request("r0", Some("d1"), "2024-01-01T00:00:00Z");
        service.add_request("r1", Some("d1"), "2024-05-01T00:00:00Z");

        let resolved = resolver.resolve(&definition_source("d1")).unwrap();

        assert_eq!(resolved.origin, RequestOrigin::Reused);
        assert_eq!(resolved.request_id(), "r1");
        assert_eq!(service.created_request_count(), 0);
    }

    #[test]
    fn test_reuse_survives_unsorted_listing() {
        let (service, resolver) = resolver();
        service.set_honor_sort(false);
        service.add_definition("d1", "Nightly load");
        service.add_request("r0", Some("d1"), "2024-01-01T00:00:00Z");
        service.add_request("r1", Some("d1"), "2024-05-01T00:00:00Z");

        let resolved = resolver.resolve(&definition_source("d1")).unwrap();
        assert_eq!(resolved.request_id(), "r1");
    }

    #[test]
    fn test_repeated_runs_create_one_request() {
        let (service, resolver) = resolver();
        service.add_definition("d1", "Nightly load");

        let first = resolver.resolve(&definition_source("d1")).unwrap();
        let second = resolver.resolve(&definition_source("d1")).unwrap();

        assert_eq!(first.origin, RequestOrigin::Created);
        assert_eq!(second.origin, RequestOrigin::Reused);
        assert_eq!(first.request_id(), second.request_id());
        assert_eq!(service.created_request_count(), 1);
    }

    #[test]
    fn test_missing_definition() {
        let (service, resolver) = resolver();

        let err = resolver.resolve(&definition_source("nope")).unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Resolution(ResolutionError::DefinitionNotFound(ref id)) if id == "nope"
        ));
        assert_eq!(service.count_calls(Method::Post, "/"), 0);
    }

    #[test]
    fn test_direct_request() {
        let (service, resolver) = resolver();
        service.add_request("r9", None, "2024-01-01T00:00:00Z");

        let resolved = resolver
            .resolve(&JobSource::Request {
                request_id: "r9".to_string(),
            })
            .unwrap();
        assert_eq!(resolved.origin, RequestOrigin::Direct);
        assert_eq!(resolved.request_id(), "r9");
    }

    #[test]
    fn test_missing_request() {
        let (_service, resolver) = resolver();
        let err = resolver
            .resolve(&JobSource::Request {
                request_id: "gone".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Resolution(ResolutionError::RequestNotFound(_))
        ));
    }

    #[test]
    fn test_request_without_submit_link() {
        let (service, resolver) = resolver();
        service.add_request("r2", None, "2024-01-01T00:00:00Z");
        service.remove_request_link("r2", "submitJob");

        let err = resolver
            .resolve(&JobSource::Request {
                request_id: "r2".to_string(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Resolution(ResolutionError::MissingLink { rel: "submitJob", .. })
        ));
    }

    #[test]
    fn test_lookup_failure_is_not_retried() {
        let (service, resolver) = resolver();
        service.add_definition("d1", "Nightly load");
        service.inject_status(Method::Get, "/jobExecution/jobRequests", 500, "database offline");

        let err = resolver.resolve(&definition_source("d1")).unwrap_err();
        assert!(matches!(err, CoordinatorError::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(service.count_calls(Method::Get, "/jobExecution/jobRequests"), 1);
        assert_eq!(service.created_request_count(), 0);
    }

    #[test]
    fn test_select_most_recent() {
        let picked = select_most_recent(vec![
            request("a", Some("2024-01-01T00:00:00Z")),
            request("b", Some("2024-03-01T00:00:00Z")),
            request("c", Some("2024-03-01T00:00:00Z")),
            request("d", None),
        ])
        .unwrap();
        assert_eq!(picked.id, "b");

        assert!(select_most_recent(Vec::new()).is_none());
    }
}
