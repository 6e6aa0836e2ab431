//! Job request resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::link::{Link, Linked};

/// A submittable instantiation of a definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Request identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URI of the definition this request instantiates (absent for ad hoc requests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_definition_uri: Option<String>,
    /// Arguments passed to the job.
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    /// When the request was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time_stamp: Option<DateTime<Utc>>,
    /// When the request was last modified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time_stamp: Option<DateTime<Utc>>,
    /// Action links.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl JobRequest {
    /// Name of the compute context the request is bound to, if any.
    pub fn context_name(&self) -> Option<&str> {
        self.arguments.get(crate::ARG_CONTEXT_NAME).map(String::as_str)
    }
}

impl Linked for JobRequest {
    fn links(&self) -> &[Link] {
        &self.links
    }
}

/// Body for creating a job request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// URI of the definition to instantiate.
    pub job_definition_uri: String,
    /// Arguments passed to the job.
    pub arguments: BTreeMap<String, String>,
}

impl NewJobRequest {
    /// Build a request for a definition bound to a compute context.
    ///
    /// The JSON copy of the log is always omitted.
    pub fn for_definition(
        name: impl Into<String>,
        description: impl Into<String>,
        definition_uri: impl Into<String>,
        context_name: &str,
    ) -> Self {
        let mut arguments = BTreeMap::new();
        arguments.insert(crate::ARG_CONTEXT_NAME.to_string(), context_name.to_string());
        arguments.insert(crate::ARG_OMIT_JSON_LOG.to_string(), "true".to_string());
        Self {
            name: name.into(),
            description: description.into(),
            job_definition_uri: definition_uri.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_request_arguments() {
        let req = NewJobRequest::for_definition(
            "nightly request",
            "created by viya-job",
            "/jobExecution/jobDefinitions/d1",
            "SAS Job Execution compute context",
        );

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["jobDefinitionUri"], "/jobExecution/jobDefinitions/d1");
        assert_eq!(body["arguments"]["_omitJsonLog"], "true");
        assert_eq!(body["arguments"]["_contextName"], "SAS Job Execution compute context");
    }

    #[test]
    fn test_request_parses_timestamps() {
        let req: JobRequest = serde_json::from_value(json!({
            "id": "r1",
            "name": "n",
            "jobDefinitionUri": "/jobExecution/jobDefinitions/d1",
            "arguments": {"_contextName": "ctx"},
            "modifiedTimeStamp": "2024-03-01T10:15:00.000Z",
            "links": []
        }))
        .unwrap();

        assert_eq!(req.context_name(), Some("ctx"));
        assert!(req.modified_time_stamp.is_some());
    }
}
