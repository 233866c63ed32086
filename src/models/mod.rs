//! Core data models for articles, citations and search operations.

mod citation;
mod search;

pub use citation::{
    ArticleId, ArticleSections, Citation, CitationDraft, RelevanceVerdict, PMC_ARTICLE_BASE_URL,
};
pub use search::{PassageRequest, SearchResponse, SearchResultItem, WebSearchResults};
