//! Per-request audit records and the sinks that persist them.
//!
//! One [`AuditRecord`] is written for every request that reaches the core,
//! whether it succeeded or failed. Writing happens on its own task; a sink
//! failure is logged and never reaches the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AuditConfig;
use crate::models::{ArticleId, Citation, CitationDraft, RelevanceVerdict, WebSearchResults};
use crate::pipeline::CandidateOutcome;

/// Who made the request, as seen by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_ip: Option<String>,
    pub user_agent: String,
    pub query_params: HashMap<String, String>,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            client_ip: None,
            user_agent: "unknown".to_string(),
            query_params: HashMap::new(),
        }
    }
}

impl ClientInfo {
    /// A caller that did not arrive over HTTP, e.g. the CLI or an MCP client
    pub fn local(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }
}

/// Everything observed while serving one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub client: ClientInfo,
    pub search_text: String,
    pub response_status: u16,
    pub response_time_secs: f64,
    pub citations_found: usize,
    pub search_results: Option<serde_json::Value>,
    pub found_pmc_ids: Vec<ArticleId>,
    pub processed_pmc_ids: Vec<ArticleId>,
    pub citation_generation_results: Vec<CitationDraft>,
    pub relevance_check_results: Vec<RelevanceVerdict>,
    pub final_citations: Vec<Citation>,
    pub error: Option<String>,
}

/// Accumulates audit data while a request moves through the pipeline
#[derive(Debug)]
pub struct RequestTrace {
    request_id: Uuid,
    timestamp: DateTime<Utc>,
    client: ClientInfo,
    search_text: String,
    search_results: Option<serde_json::Value>,
    found_pmc_ids: Vec<ArticleId>,
    outcomes: Vec<CandidateOutcome>,
}

impl RequestTrace {
    pub fn new(request_id: Uuid, search_text: &str, client: ClientInfo) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
            client,
            search_text: search_text.to_string(),
            search_results: None,
            found_pmc_ids: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Record the raw search response and the identifiers it contains
    pub fn record_search(&mut self, results: &WebSearchResults, found_pmc_ids: Vec<ArticleId>) {
        self.search_results = Some(results.raw.clone());
        self.found_pmc_ids = found_pmc_ids;
    }

    pub fn record_outcomes(&mut self, outcomes: Vec<CandidateOutcome>) {
        self.outcomes = outcomes;
    }

    /// Close the trace with the final status
    pub fn finish(self, response_status: u16, elapsed: Duration, error: Option<String>) -> AuditRecord {
        let final_citations: Vec<Citation> = self
            .outcomes
            .iter()
            .filter_map(|o| o.citation().cloned())
            .collect();

        AuditRecord {
            request_id: self.request_id,
            timestamp: self.timestamp,
            client: self.client,
            search_text: self.search_text,
            response_status,
            response_time_secs: elapsed.as_secs_f64(),
            citations_found: final_citations.len(),
            search_results: self.search_results,
            found_pmc_ids: self.found_pmc_ids,
            processed_pmc_ids: final_citations.iter().map(|c| c.pmc_id.clone()).collect(),
            citation_generation_results: self.outcomes.iter().filter_map(|o| o.draft.clone()).collect(),
            relevance_check_results: self.outcomes.iter().filter_map(|o| o.verdict.clone()).collect(),
            final_citations,
            error,
        }
    }
}

/// Audit sink errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Appends one JSON object per line to a file
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::info!(request_id = %record.request_id, "Search log written");
        Ok(())
    }
}

/// Emits each record as a structured log event
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)?;
        tracing::info!(target: "citation_finder::audit", request_id = %record.request_id, record = %json, "Search log");
        Ok(())
    }
}

/// Pick the sink described by the configuration
pub fn sink_from_config(config: &AuditConfig) -> Arc<dyn AuditSink> {
    if config.enabled {
        Arc::new(JsonlAuditLog::new(config.path.clone()))
    } else {
        Arc::new(TracingAuditSink)
    }
}

/// Hand a record to the sink without waiting for it.
///
/// The returned handle may be ignored; errors are logged inside the task.
pub fn dispatch(sink: Arc<dyn AuditSink>, record: AuditRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.record(&record).await {
            tracing::error!(request_id = %record.request_id, error = %e, "Error writing search log");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResultItem;
    use crate::pipeline::DropReason;
    use tempfile::tempdir;

    fn sample_record() -> AuditRecord {
        let mut trace = RequestTrace::new(Uuid::new_v4(), "some passage text here", ClientInfo::default());
        let results = WebSearchResults::from_items(vec![SearchResultItem::new("https://example.com")]);
        trace.record_search(&results, Vec::new());
        trace.record_outcomes(vec![CandidateOutcome::dropped(
            0,
            "https://example.com",
            None,
            DropReason::NoIdentifier,
        )]);
        trace.finish(200, Duration::from_millis(1500), None)
    }

    #[test]
    fn test_finish_counts_citations() {
        let record = sample_record();
        assert_eq!(record.response_status, 200);
        assert_eq!(record.citations_found, 0);
        assert!(record.citation_generation_results.is_empty());
        assert_eq!(record.response_time_secs, 1.5);
        assert!(record.search_results.is_some());
    }

    #[test]
    fn test_record_serializes_flat_client_fields() {
        let value = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(value["user_agent"], "unknown");
        assert!(value["client_ip"].is_null());
        assert!(value.get("client").is_none());
    }

    #[tokio::test]
    async fn test_jsonl_log_appends_lines() {
        let dir = tempdir().unwrap();
        let log = JsonlAuditLog::new(dir.path().join("logs").join("searches.jsonl"));

        log.record(&sample_record()).await.unwrap();
        log.record(&sample_record()).await.unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.search_text, "some passage text here");
    }

    #[derive(Debug)]
    struct BrokenSink;

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[tokio::test]
    async fn test_dispatch_swallows_sink_errors() {
        let handle = dispatch(Arc::new(BrokenSink), sample_record());
        assert!(handle.await.is_ok());
    }
}
