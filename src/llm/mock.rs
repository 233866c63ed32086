//! Mock gateway for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::llm::CitationGateway;
use crate::models::{CitationDraft, RelevanceVerdict};

/// A deterministic gateway.
///
/// By default every article yields a successful draft derived from its front
/// matter and a positive verdict quoting its body. Markers switch individual
/// articles to failure: a marker matches when the front (for drafts) or body
/// (for verdicts) contains it.
#[derive(Debug, Default)]
pub struct MockGateway {
    citation_failures: Mutex<Vec<String>>,
    irrelevant: Mutex<Vec<String>>,
    panics: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail citation generation for front matter containing `marker`.
    pub fn fail_citation_for(&self, marker: impl Into<String>) {
        self.citation_failures.lock().unwrap().push(marker.into());
    }

    /// Report no supporting passage for bodies containing `marker`.
    pub fn irrelevant_for(&self, marker: impl Into<String>) {
        self.irrelevant.lock().unwrap().push(marker.into());
    }

    /// Panic while checking bodies containing `marker`.
    pub fn panic_for(&self, marker: impl Into<String>) {
        self.panics.lock().unwrap().push(marker.into());
    }

    /// Sleep for `delay` in every call before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Total gateway calls so far (both operations).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn matches(markers: &Mutex<Vec<String>>, text: &str) -> bool {
        markers.lock().unwrap().iter().any(|m| text.contains(m.as_str()))
    }
}

#[async_trait]
impl CitationGateway for MockGateway {
    async fn generate_citation(&self, article_metadata: &str, _citation_guide: &str) -> CitationDraft {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if Self::matches(&self.citation_failures, article_metadata) {
            return CitationDraft::failure("mock citation failure");
        }
        CitationDraft {
            success: true,
            reference_list_citation: Some(format!("Author, A. (2020) {}", article_metadata)),
            in_text_citation: Some("(Author, 2020)".to_string()),
            title: Some(article_metadata.to_string()),
            doi: None,
            publication_date: Some("1st January 2020".to_string()),
            reason: None,
        }
    }

    async fn check_relevance(&self, claim: &str, article_body: &str) -> RelevanceVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if Self::matches(&self.panics, article_body) {
            panic!("mock gateway panic for {}", article_body);
        }
        if Self::matches(&self.irrelevant, article_body) {
            return RelevanceVerdict::not_found("mock: no supporting passage");
        }
        RelevanceVerdict {
            found: true,
            passage: Some(article_body.to_string()),
            reasoning: format!("mock: supports '{}'", claim),
        }
    }
}
