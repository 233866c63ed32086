//! The citation search core.
//!
//! [`CitationFinder`] runs one request end to end: web search, bounded
//! concurrent fan-out of [`CandidatePipeline`] over the first results,
//! ordered aggregation, and an [`audit::AuditRecord`] handed to the
//! configured [`audit::AuditSink`].

pub mod audit;
mod candidate;
mod finder;

pub use audit::{AuditRecord, AuditSink, ClientInfo, JsonlAuditLog, TracingAuditSink};
pub use candidate::{assemble_citation, CandidateOutcome, CandidatePipeline, DropReason};
pub use finder::{CitationFinder, RequestPhase, StyleGuide};

use crate::utils::ValidationError;

/// Errors surfaced to the caller of a request
#[derive(Debug, thiserror::Error)]
pub enum FinderError {
    /// Input rejected before the core ran
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The search provider failed
    #[error("Error fetching data: {0}")]
    Upstream(String),

    /// Anything else that went wrong outside a candidate
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl FinderError {
    /// HTTP status equivalent
    pub fn status_code(&self) -> u16 {
        match self {
            FinderError::Validation(_) => 400,
            FinderError::Upstream(_) => 503,
            FinderError::Internal(_) => 500,
        }
    }

    /// Message shown to the caller
    pub fn detail(&self) -> String {
        self.to_string()
    }
}
