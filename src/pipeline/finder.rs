//! Search orchestrator.

use futures_util::future::join_all;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, SearchConfig};
use crate::llm::{CitationGateway, OpenAiGateway};
use crate::models::{ArticleId, Citation, SearchResponse, SearchResultItem};
use crate::pipeline::audit::{self, sink_from_config, AuditSink, ClientInfo, RequestTrace, TracingAuditSink};
use crate::pipeline::{CandidateOutcome, CandidatePipeline, DropReason, FinderError};
use crate::sources::{ArticleRepository, GoogleSearch, PmcSource, WebSearch};
use crate::utils::{extract_pmc_id, today, validate_passage, HttpClient};

/// Guide used when no file is configured
const BUILTIN_STYLE_GUIDE: &str = "Harvard (Cite Them Right). Reference list: Author surname, Initials. \
(Year) 'Title of article', Journal Title, Volume(Issue), pp. first-last. Available at: \
https://doi.org/DOI. In-text: (Author, Year); two authors (Author and Author, Year); \
three or more authors (Author et al., Year).";

/// Where the citation style guide text comes from
#[derive(Debug, Clone)]
pub enum StyleGuide {
    /// Read from disk on every request
    File(PathBuf),
    Inline(Arc<str>),
}

impl Default for StyleGuide {
    fn default() -> Self {
        StyleGuide::Inline(Arc::from(BUILTIN_STYLE_GUIDE))
    }
}

impl StyleGuide {
    pub fn inline(text: impl Into<Arc<str>>) -> Self {
        StyleGuide::Inline(text.into())
    }

    async fn load(&self) -> std::io::Result<Arc<str>> {
        match self {
            StyleGuide::File(path) => {
                tracing::debug!(path = %path.display(), "Loading citation guide");
                let text = tokio::fs::read_to_string(path).await?;
                Ok(Arc::from(text))
            }
            StyleGuide::Inline(text) => Ok(Arc::clone(text)),
        }
    }
}

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    Searching,
    FanningOut,
    Aggregating,
    Responded,
    Failed,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestPhase::Received => "received",
            RequestPhase::Searching => "searching",
            RequestPhase::FanningOut => "fanning_out",
            RequestPhase::Aggregating => "aggregating",
            RequestPhase::Responded => "responded",
            RequestPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Finds citations supporting a passage of text.
///
/// Collaborators are injected once and shared across requests; nothing is
/// cached between requests.
#[derive(Debug, Clone)]
pub struct CitationFinder {
    search: Arc<dyn WebSearch>,
    repository: Arc<dyn ArticleRepository>,
    gateway: Arc<dyn CitationGateway>,
    audit: Arc<dyn AuditSink>,
    guide: StyleGuide,
    limits: SearchConfig,
    await_audit: bool,
}

impl CitationFinder {
    /// Build a finder that logs audit records through `tracing` and uses the built-in guide.
    pub fn new(
        search: Arc<dyn WebSearch>,
        repository: Arc<dyn ArticleRepository>,
        gateway: Arc<dyn CitationGateway>,
    ) -> Self {
        Self {
            search,
            repository,
            gateway,
            audit: Arc::new(TracingAuditSink),
            guide: StyleGuide::default(),
            limits: SearchConfig::default(),
            await_audit: false,
        }
    }

    /// Wire the production collaborators described by `config`
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = HttpClient::new()?;
        let model_http = HttpClient::with_timeout(config.model.timeout())?;

        Ok(Self::new(
            Arc::new(GoogleSearch::new(http.clone(), config)),
            Arc::new(PmcSource::new(http, config)),
            Arc::new(OpenAiGateway::new(model_http, config)),
        )
        .with_audit_sink(sink_from_config(&config.audit))
        .with_style_guide(StyleGuide::File(config.citation_guide.clone()))
        .with_limits(config.search.clone()))
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_style_guide(mut self, guide: StyleGuide) -> Self {
        self.guide = guide;
        self
    }

    pub fn with_limits(mut self, limits: SearchConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Wait for the audit write before returning from a request.
    ///
    /// Short-lived processes need this; a server leaves it off.
    pub fn with_awaited_audit(mut self, await_audit: bool) -> Self {
        self.await_audit = await_audit;
        self
    }

    /// Validate the passage, then run the search.
    ///
    /// Rejected passages never reach the core and are not audited.
    pub async fn find_citations_for_passage(
        &self,
        text: &str,
        client: ClientInfo,
    ) -> Result<SearchResponse, FinderError> {
        validate_passage(text)?;
        self.find_citations(text, client).await
    }

    /// Run one request. An audit record is dispatched whatever the outcome,
    /// and a failing sink never changes the result.
    pub async fn find_citations(
        &self,
        text: &str,
        client: ClientInfo,
    ) -> Result<SearchResponse, FinderError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("request", %request_id);
        self.handle(request_id, text, client).instrument(span).await
    }

    async fn handle(
        &self,
        request_id: Uuid,
        text: &str,
        client: ClientInfo,
    ) -> Result<SearchResponse, FinderError> {
        let started = Instant::now();
        let preview: String = text.chars().take(50).collect();
        tracing::info!(phase = %RequestPhase::Received, "Received citation request for text: {}...", preview);

        let mut trace = RequestTrace::new(request_id, text, client);
        let mut phase = RequestPhase::Received;
        let result = self.execute(text, &mut trace, &mut phase).await;

        let (status, error) = match &result {
            Ok(response) => {
                tracing::info!(
                    phase = %RequestPhase::Responded,
                    citations = response.citations.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request complete"
                );
                (200, None)
            }
            Err(e) => {
                tracing::error!(phase = %RequestPhase::Failed, failed_during = %phase, error = %e, "Request failed");
                (e.status_code(), Some(e.detail()))
            }
        };

        let pending = audit::dispatch(Arc::clone(&self.audit), trace.finish(status, started.elapsed(), error));
        if self.await_audit {
            if let Err(e) = pending.await {
                tracing::error!(error = %e, "Audit task aborted");
            }
        }
        result
    }

    async fn execute(
        &self,
        text: &str,
        trace: &mut RequestTrace,
        phase: &mut RequestPhase,
    ) -> Result<SearchResponse, FinderError> {
        let guide = self
            .guide
            .load()
            .await
            .map_err(|e| FinderError::Internal(format!("could not load citation guide: {}", e)))?;

        *phase = RequestPhase::Searching;
        tracing::info!(phase = %phase, provider = self.search.name(), "Searching");
        let results = self
            .search
            .search(text)
            .await
            .map_err(|e| FinderError::Upstream(e.to_string()))?;

        let found_pmc_ids: Vec<ArticleId> = results
            .items
            .iter()
            .filter_map(|item| extract_pmc_id(&item.link))
            .collect();
        tracing::info!(
            results = results.items.len(),
            pmc_ids = found_pmc_ids.len(),
            "Search complete"
        );
        trace.record_search(&results, found_pmc_ids);

        *phase = RequestPhase::FanningOut;
        let candidates: Vec<SearchResultItem> = results
            .items
            .into_iter()
            .take(self.limits.candidate_limit())
            .collect();
        let pipeline = CandidatePipeline::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.gateway),
            text,
            guide,
            today(),
        );
        let outcomes = self.fan_out(pipeline, candidates).await;

        *phase = RequestPhase::Aggregating;
        let citations: Vec<Citation> = outcomes
            .iter()
            .filter_map(|outcome| outcome.citation().cloned())
            .collect();
        tracing::info!(phase = %phase, "Found {} relevant citations", citations.len());
        trace.record_outcomes(outcomes);

        *phase = RequestPhase::Responded;
        Ok(SearchResponse::new(text, citations))
    }

    /// Run every candidate on its own task, at most `concurrency_limit` at a time.
    ///
    /// Outcomes come back in candidate order. A task that panics becomes a
    /// dropped candidate.
    async fn fan_out(
        &self,
        pipeline: CandidatePipeline,
        candidates: Vec<SearchResultItem>,
    ) -> Vec<CandidateOutcome> {
        let pipeline = Arc::new(pipeline);
        let permits = Arc::new(Semaphore::new(self.limits.concurrency_limit()));
        tracing::info!(
            candidates = candidates.len(),
            concurrency = self.limits.concurrency_limit(),
            "Fanning out"
        );

        let handles: Vec<_> = candidates
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, item)| {
                let pipeline = Arc::clone(&pipeline);
                let permits = Arc::clone(&permits);
                tokio::spawn(
                    async move {
                        let _permit = permits.acquire_owned().await.ok();
                        pipeline.run(index, &item).await
                    }
                    .in_current_span(),
                )
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(candidates)
            .enumerate()
            .map(|(index, (joined, item))| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(index, link = %item.link, error = %e, "Candidate task aborted");
                    let pmc_id = extract_pmc_id(&item.link);
                    CandidateOutcome::dropped(index, item.link, pmc_id, DropReason::Unexpected(e.to_string()))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockGateway;
    use crate::pipeline::audit::{AuditError, AuditRecord, JsonlAuditLog};
    use crate::sources::{MockArticleRepository, MockWebSearch};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    const PASSAGE: &str = "Vitamin D supplementation reduces respiratory infections in adults.";

    #[derive(Debug)]
    struct ChannelSink(mpsc::UnboundedSender<AuditRecord>);

    #[async_trait]
    impl AuditSink for ChannelSink {
        async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
            let _ = self.0.send(record.clone());
            Ok(())
        }
    }

    fn link(id: u32) -> String {
        format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{}/", id)
    }

    #[tokio::test]
    async fn test_success_is_audited() {
        let search = Arc::new(MockWebSearch::with_links(vec![
            link(1),
            "https://example.com/blog".to_string(),
            link(2),
        ]));
        let repo = Arc::new(MockArticleRepository::new());
        repo.insert("1", "front-1", "body-1");
        repo.insert("2", "front-2", "body-2");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let finder = CitationFinder::new(search, repo, Arc::new(MockGateway::new()))
            .with_audit_sink(Arc::new(ChannelSink(tx)));
        let response = finder
            .find_citations(PASSAGE, ClientInfo::local("test"))
            .await
            .unwrap();

        assert_eq!(response.search_text, PASSAGE);
        let ids: Vec<_> = response.citations.iter().map(|c| c.pmc_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let record = rx.recv().await.unwrap();
        assert_eq!(record.response_status, 200);
        assert_eq!(record.citations_found, 2);
        assert_eq!(record.found_pmc_ids.len(), 2);
        assert_eq!(record.citation_generation_results.len(), 2);
        assert_eq!(record.relevance_check_results.len(), 2);
        assert_eq!(record.client.user_agent, "test");
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_search_failure_is_upstream_error() {
        let search = Arc::new(MockWebSearch::failing("quota exceeded"));
        let repo = Arc::new(MockArticleRepository::new());
        let gateway = Arc::new(MockGateway::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let finder = CitationFinder::new(search, repo.clone(), gateway.clone())
            .with_audit_sink(Arc::new(ChannelSink(tx)));
        let err = finder
            .find_citations(PASSAGE, ClientInfo::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FinderError::Upstream(_)));
        assert_eq!(err.status_code(), 503);
        assert_eq!(repo.calls(), 0);
        assert_eq!(gateway.calls(), 0);

        let record = rx.recv().await.unwrap();
        assert_eq!(record.response_status, 503);
        assert!(record.error.unwrap().starts_with("Error fetching data:"));
        assert!(record.search_results.is_none());
    }

    #[tokio::test]
    async fn test_found_ids_cover_all_results() {
        let links: Vec<String> = (1..=12).map(link).collect();
        let search = Arc::new(MockWebSearch::with_links(links));
        let repo = Arc::new(MockArticleRepository::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let finder = CitationFinder::new(search, repo.clone(), Arc::new(MockGateway::new()))
            .with_audit_sink(Arc::new(ChannelSink(tx)));
        finder
            .find_citations(PASSAGE, ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(repo.calls(), 10);
        let record = rx.recv().await.unwrap();
        assert_eq!(record.found_pmc_ids.len(), 12);
        assert_eq!(record.citations_found, 0);
    }

    #[tokio::test]
    async fn test_missing_guide_file_is_internal_error() {
        let search = Arc::new(MockWebSearch::with_links(vec![link(1)]));
        let finder = CitationFinder::new(
            search.clone(),
            Arc::new(MockArticleRepository::new()),
            Arc::new(MockGateway::new()),
        )
        .with_style_guide(StyleGuide::File(PathBuf::from("/nonexistent/guide.md")));

        let err = finder
            .find_citations(PASSAGE, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(err.detail().contains("citation guide"));
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_short_passage_is_rejected_before_search() {
        let search = Arc::new(MockWebSearch::with_links(vec![link(1)]));
        let finder = CitationFinder::new(
            search.clone(),
            Arc::new(MockArticleRepository::new()),
            Arc::new(MockGateway::new()),
        );

        let err = finder
            .find_citations_for_passage("too short", ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(search.calls(), 0);
    }

    #[derive(Debug)]
    struct FailingSink(AtomicUsize);

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_change_response() {
        let search = Arc::new(MockWebSearch::with_links(vec![link(1), link(2)]));
        let repo = Arc::new(MockArticleRepository::new());
        repo.insert("1", "front-1", "body-1");
        repo.insert("2", "front-2", "body-2");
        let sink = Arc::new(FailingSink(AtomicUsize::new(0)));

        let finder = CitationFinder::new(search, repo, Arc::new(MockGateway::new()))
            .with_audit_sink(sink.clone())
            .with_awaited_audit(true);
        let response = finder
            .find_citations(PASSAGE, ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
        assert_eq!(response.search_text, PASSAGE);
        let ids: Vec<_> = response.citations.iter().map(|c| c.pmc_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_failing_sink_keeps_upstream_error() {
        let sink = Arc::new(FailingSink(AtomicUsize::new(0)));
        let finder = CitationFinder::new(
            Arc::new(MockWebSearch::failing("quota exceeded")),
            Arc::new(MockArticleRepository::new()),
            Arc::new(MockGateway::new()),
        )
        .with_audit_sink(sink.clone())
        .with_awaited_audit(true);

        let err = finder
            .find_citations(PASSAGE, ClientInfo::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_awaited_audit_is_on_disk_before_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("searches.jsonl");
        let search = Arc::new(MockWebSearch::with_links(vec![link(1)]));
        let repo = Arc::new(MockArticleRepository::new());
        repo.insert("1", "front-1", "body-1");

        let finder = CitationFinder::new(search, repo, Arc::new(MockGateway::new()))
            .with_audit_sink(Arc::new(JsonlAuditLog::new(path.clone())))
            .with_awaited_audit(true);
        finder
            .find_citations(PASSAGE, ClientInfo::local("cli"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        let record: AuditRecord = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(record.client.user_agent, "cli");
        assert_eq!(record.citations_found, 1);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RequestPhase::FanningOut.to_string(), "fanning_out");
        assert_eq!(RequestPhase::Failed.to_string(), "failed");
    }
}
