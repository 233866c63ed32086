//! Utility modules supporting the citation pipeline.
//!
//! - [`extract_pmc_id`]: Pull a PubMed Central identifier out of a search result URL
//! - [`append_access_date`]: Suffix a reference list citation with `(Accessed: 1st January 2024)`
//! - [`validate_passage`]: Enforce the 5 to 300 word limit on inbound text
//! - [`HttpClient`]: Shared `reqwest` client with timeouts and user agent
//!
//! # Identifier extraction
//!
//! ```rust
//! use citation_finder::utils::extract_pmc_id;
//!
//! let id = extract_pmc_id("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC12345/");
//! assert_eq!(id.map(|id| id.to_string()), Some("12345".to_string()));
//! ```

mod dates;
mod http;
mod identifier;
mod validate;

pub use dates::{append_access_date, format_long_date, ordinal_suffix, today};
pub use http::{HttpClient, DEFAULT_TIMEOUT};
pub use identifier::extract_pmc_id;
pub use validate::{validate_passage, word_count, ValidationError, MAX_WORD_COUNT, MIN_WORD_COUNT};
