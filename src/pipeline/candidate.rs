//! Per-candidate pipeline: identifier → fetch → model calls → citation.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::Instrument;

use crate::llm::CitationGateway;
use crate::models::{ArticleId, Citation, CitationDraft, RelevanceVerdict, SearchResultItem};
use crate::sources::ArticleRepository;
use crate::utils::{append_access_date, extract_pmc_id};

/// Why a candidate produced no citation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("no PMC ID in link")]
    NoIdentifier,

    #[error("article is missing front matter or body")]
    MissingSections,

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("citation generation failed: {0}")]
    CitationFailed(String),

    #[error("no relevant passage: {0}")]
    NotRelevant(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Everything one candidate produced, kept for aggregation and audit
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    /// Position in the search results
    pub index: usize,

    pub link: String,

    pub pmc_id: Option<ArticleId>,

    /// Present once the article was fetched
    pub draft: Option<CitationDraft>,

    /// Present once the article was fetched
    pub verdict: Option<RelevanceVerdict>,

    pub result: Result<Citation, DropReason>,
}

impl CandidateOutcome {
    /// An outcome that never reached the model calls
    pub fn dropped(
        index: usize,
        link: impl Into<String>,
        pmc_id: Option<ArticleId>,
        reason: DropReason,
    ) -> Self {
        Self {
            index,
            link: link.into(),
            pmc_id,
            draft: None,
            verdict: None,
            result: Err(reason),
        }
    }

    pub fn citation(&self) -> Option<&Citation> {
        self.result.as_ref().ok()
    }
}

/// Shared, read-only inputs for every candidate of one request
#[derive(Debug, Clone)]
pub struct CandidatePipeline {
    repository: Arc<dyn ArticleRepository>,
    gateway: Arc<dyn CitationGateway>,
    claim: Arc<str>,
    citation_guide: Arc<str>,
    accessed: NaiveDate,
}

impl CandidatePipeline {
    pub fn new(
        repository: Arc<dyn ArticleRepository>,
        gateway: Arc<dyn CitationGateway>,
        claim: impl Into<Arc<str>>,
        citation_guide: impl Into<Arc<str>>,
        accessed: NaiveDate,
    ) -> Self {
        Self {
            repository,
            gateway,
            claim: claim.into(),
            citation_guide: citation_guide.into(),
            accessed,
        }
    }

    /// Evaluate one search result. Never fails; problems become a [`DropReason`].
    pub async fn run(&self, index: usize, item: &SearchResultItem) -> CandidateOutcome {
        let span = tracing::info_span!("candidate", index, link = %item.link);
        self.run_inner(index, item).instrument(span).await
    }

    async fn run_inner(&self, index: usize, item: &SearchResultItem) -> CandidateOutcome {
        tracing::info!("Processing search result");

        let Some(pmc_id) = extract_pmc_id(&item.link) else {
            tracing::warn!("No PMC ID found for link");
            return CandidateOutcome::dropped(index, &item.link, None, DropReason::NoIdentifier);
        };

        let sections = match self.repository.fetch(&pmc_id).await {
            Ok(Some(sections)) => sections,
            Ok(None) => {
                tracing::warn!(pmc_id = %pmc_id, "Article is missing front or body");
                return CandidateOutcome::dropped(
                    index,
                    &item.link,
                    Some(pmc_id),
                    DropReason::MissingSections,
                );
            }
            Err(e) => {
                tracing::error!(pmc_id = %pmc_id, error = %e, "Error fetching article");
                return CandidateOutcome::dropped(
                    index,
                    &item.link,
                    Some(pmc_id),
                    DropReason::FetchFailed(e.to_string()),
                );
            }
        };

        let (draft, verdict) = tokio::join!(
            self.gateway
                .generate_citation(&sections.front, &self.citation_guide),
            self.gateway.check_relevance(&self.claim, &sections.body),
        );

        let result = assemble_citation(&pmc_id, &draft, &verdict, self.accessed);
        match &result {
            Ok(_) => tracing::info!(pmc_id = %pmc_id, "Relevant passage found"),
            Err(reason) => tracing::warn!(pmc_id = %pmc_id, %reason, "Candidate dropped"),
        }

        CandidateOutcome {
            index,
            link: item.link.clone(),
            pmc_id: Some(pmc_id),
            draft: Some(draft),
            verdict: Some(verdict),
            result,
        }
    }
}

/// Combine a draft and a verdict into a final citation.
///
/// Both must be positive; the reference list entry gets the access date appended.
pub fn assemble_citation(
    pmc_id: &ArticleId,
    draft: &CitationDraft,
    verdict: &RelevanceVerdict,
    accessed: NaiveDate,
) -> Result<Citation, DropReason> {
    if !draft.success {
        let reason = draft.reason.clone().unwrap_or_else(|| "no reason given".to_string());
        return Err(DropReason::CitationFailed(reason));
    }
    if !verdict.found {
        return Err(DropReason::NotRelevant(verdict.reasoning.clone()));
    }

    let required = |value: &Option<String>, field: &str| {
        value
            .clone()
            .ok_or_else(|| DropReason::CitationFailed(format!("missing {}", field)))
    };

    Ok(Citation {
        reference_list_citation: append_access_date(
            &required(&draft.reference_list_citation, "reference_list_citation")?,
            accessed,
        ),
        in_text_citation: required(&draft.in_text_citation, "in_text_citation")?,
        supporting_passage: verdict
            .passage
            .clone()
            .ok_or_else(|| DropReason::NotRelevant("no passage quoted".to_string()))?,
        reasoning: verdict.reasoning.clone(),
        pmc_id: pmc_id.clone(),
        title: required(&draft.title, "title")?,
        doi: draft.doi.clone(),
        pmc_link: pmc_id.public_link(),
        publication_date: required(&draft.publication_date, "publication_date")?,
    })
}
