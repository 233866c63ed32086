//! # Citation Finder
//!
//! Finds peer-reviewed articles that support a passage of text and formats
//! Harvard-style citations for them.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Citation, CitationDraft, RelevanceVerdict, etc.)
//! - [`sources`]: Web search and literature repository collaborators
//! - [`llm`]: Language-model gateway for citation generation and relevance checks
//! - [`pipeline`]: Per-candidate pipeline, search orchestrator and audit records
//! - [`api`]: HTTP transport
//! - [`mcp`]: MCP protocol implementation and server
//! - [`utils`]: Identifier extraction, dates, validation, HTTP client
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{Citation, SearchResponse};
pub use pipeline::{CitationFinder, FinderError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
