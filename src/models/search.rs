//! Search request and response models.

use serde::{Deserialize, Serialize};

use crate::models::Citation;

/// Inbound request: the passage to find citations for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageRequest {
    /// The passage of text to find citations for
    pub text: String,
}

/// One item returned by the web search provider.
///
/// Only `link` is used; everything else the provider returns is kept
/// verbatim for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SearchResultItem {
    /// Create an item with only a link
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Items returned by one web search, in provider order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearchResults {
    pub items: Vec<SearchResultItem>,

    /// The provider's response body as received
    pub raw: serde_json::Value,
}

impl WebSearchResults {
    /// Build results from items, synthesizing a raw payload
    pub fn from_items(items: Vec<SearchResultItem>) -> Self {
        let raw = serde_json::json!({ "items": &items });
        Self { items, raw }
    }
}

/// Final response: the input text and its supporting citations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Input text exactly as received
    pub search_text: String,

    /// Citations in the order the search provider ranked their articles
    pub citations: Vec<Citation>,
}

impl SearchResponse {
    /// Create a new search response
    pub fn new(search_text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            search_text: search_text.into(),
            citations,
        }
    }
}
