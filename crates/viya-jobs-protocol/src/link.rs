//! Hypermedia links.
//!
//! Actions on a resource (submit, refresh, change state) are discovered
//! from its `links` array by relation name.

use serde::{Deserialize, Serialize};

/// A single link from a resource's `links` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// HTTP method to use.
    pub method: String,
    /// Relation name.
    pub rel: String,
    /// Target path, relative to the service host.
    pub href: String,
    /// Canonical URI of the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Media type of the response.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Media type of the request body.
    #[serde(default, rename = "responseType", skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
}

impl Link {
    /// Create a link with method, relation and href.
    pub fn new(method: &str, rel: &str, href: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            method: method.to_string(),
            rel: rel.to_string(),
            uri: Some(href.clone()),
            href,
            media_type: None,
            response_type: None,
        }
    }

    /// Set the media type.
    pub fn with_type(mut self, media_type: &str) -> Self {
        self.media_type = Some(media_type.to_string());
        self
    }
}

/// Resources that carry a `links` array.
pub trait Linked {
    /// All links on the resource.
    fn links(&self) -> &[Link];

    /// Find a link by relation name.
    fn link(&self, rel: &str) -> Option<&Link> {
        self.links().iter().find(|l| l.rel == rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Holder(Vec<Link>);

    impl Linked for Holder {
        fn links(&self) -> &[Link] {
            &self.0
        }
    }

    #[test]
    fn test_link_lookup_by_rel() {
        let holder = Holder(vec![
            Link::new("GET", "self", "/jobExecution/jobs/1"),
            Link::new("PUT", "updateState", "/jobExecution/jobs/1/state").with_type("text/plain"),
        ]);

        let link = holder.link("updateState").unwrap();
        assert_eq!(link.method, "PUT");
        assert_eq!(link.media_type.as_deref(), Some("text/plain"));
        assert!(holder.link("submitJob").is_none());
    }

    #[test]
    fn test_link_deserializes_type_field() {
        let link: Link = serde_json::from_str(
            r#"{"method":"POST","rel":"submitJob","href":"/jobExecution/jobRequests/r1/jobs","type":"application/vnd.sas.job.execution.job"}"#,
        )
        .unwrap();
        assert_eq!(link.rel, "submitJob");
        assert_eq!(link.uri, None);
        assert_eq!(
            link.media_type.as_deref(),
            Some("application/vnd.sas.job.execution.job")
        );
    }
}
