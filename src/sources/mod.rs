//! External collaborators: the web search provider and the literature repository.
//!
//! The pipeline only depends on the [`WebSearch`] and [`ArticleRepository`]
//! traits. [`GoogleSearch`] and [`PmcSource`] are the production
//! implementations; [`mock`] holds in-memory ones for tests.
//!
//! Each external call is attempted exactly once. Failures are reported as a
//! [`SourceError`] and the caller decides whether they drop a candidate or
//! fail the request.

mod google;
mod pmc;

pub mod mock;

pub use google::GoogleSearch;
pub use mock::{MockArticleRepository, MockWebSearch};
pub use pmc::{extract_sections, PmcSource};

use crate::models::{ArticleId, ArticleSections, WebSearchResults};
use async_trait::async_trait;

/// A web search provider queried with the raw passage text
#[async_trait]
pub trait WebSearch: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Run one search. Only `items[].link` is consumed downstream.
    async fn search(&self, query: &str) -> Result<WebSearchResults, SourceError>;
}

/// A literature repository serving full-text article XML
#[async_trait]
pub trait ArticleRepository: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this repository
    fn name(&self) -> &str;

    /// Fetch an article and split it into front matter and body.
    ///
    /// `Ok(None)` means the record was retrieved but lacks one of the two
    /// sections. Transport and HTTP status failures are errors.
    async fn fetch(&self, id: &ArticleId) -> Result<Option<ArticleSections>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status from the remote API
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required API key is not configured
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
