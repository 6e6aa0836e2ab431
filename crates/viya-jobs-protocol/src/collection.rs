//! Paged collection envelope.

use serde::{Deserialize, Serialize};

/// A page of items returned by a list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Total number of matching items, when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Offset of the first item.
    #[serde(default)]
    pub start: u64,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl<T> Collection<T> {
    /// Wrap a list of items as a single page.
    pub fn of(items: Vec<T>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            count: Some(count),
            start: 0,
            limit: None,
        }
    }

    /// True when the page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobRequest;

    #[test]
    fn test_deserialize_request_page() {
        let page: Collection<JobRequest> = serde_json::from_value(serde_json::json!({
            "items": [{"id": "r1", "links": []}],
            "count": 1,
            "start": 0,
            "limit": 10
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "r1");
        assert_eq!(page.count, Some(1));
    }

    #[test]
    fn test_missing_items_is_empty_page() {
        let page: Collection<JobRequest> = serde_json::from_value(serde_json::json!({"count": 0})).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.start, 0);
    }
}
