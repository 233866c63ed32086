//! Language-model gateway.
//!
//! Two independent single-message calls: one turns article front matter into
//! a formatted citation, the other checks whether an article body supports a
//! passage. Both are fail-soft: any transport, provider or schema problem is
//! folded into the returned [`CitationDraft`] or [`RelevanceVerdict`] so a
//! caller can drop the candidate without aborting its siblings.

mod openai;
mod prompts;

pub mod mock;

pub use mock::MockGateway;
pub use openai::OpenAiGateway;
pub use prompts::{citation_prompt, relevance_prompt};

use async_trait::async_trait;

use crate::models::{CitationDraft, RelevanceVerdict};

/// Citation generation and relevance checking backed by a generative model
#[async_trait]
pub trait CitationGateway: Send + Sync + std::fmt::Debug {
    /// Format a citation for the article described by `article_metadata`
    /// (the `<front>` XML), following `citation_guide`.
    async fn generate_citation(&self, article_metadata: &str, citation_guide: &str)
        -> CitationDraft;

    /// Decide whether `article_body` contains a passage that strongly supports `claim`.
    async fn check_relevance(&self, claim: &str, article_body: &str) -> RelevanceVerdict;
}

/// Errors from a single model round-trip. Never escapes the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model API error: {0}")]
    Api(String),

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model response did not match schema: {0}")]
    Schema(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Schema(err.to_string())
    }
}
