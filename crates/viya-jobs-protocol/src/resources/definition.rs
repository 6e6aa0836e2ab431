//! Job definition resource.

use serde::{Deserialize, Serialize};

use crate::link::{Link, Linked};

/// Stored template describing what code runs.
///
/// Read-only from the client's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    /// Definition identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Definition type (e.g. `Compute`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Action links.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl JobDefinition {
    /// Canonical URI of this definition.
    pub fn uri(&self) -> String {
        self.link(crate::REL_SELF)
            .and_then(|l| l.uri.clone())
            .unwrap_or_else(|| crate::definition_uri(&self.id))
    }
}

impl Linked for JobDefinition {
    fn links(&self) -> &[Link] {
        &self.links
    }
}
