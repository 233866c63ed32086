//! Extraction of PubMed Central identifiers from result URLs.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::ArticleId;

static PMC_ID_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pmc_id_pattern() -> &'static Regex {
    PMC_ID_PATTERN.get_or_init(|| Regex::new(r"PMC([0-9]+)").expect("static pattern is valid"))
}

/// Pull the PMC identifier out of a URL.
///
/// Matches the literal, case-sensitive prefix `PMC` followed by digits; the
/// first match wins. A URL without one is not an error.
pub fn extract_pmc_id(url: &str) -> Option<ArticleId> {
    let id = pmc_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| ArticleId::new(m.as_str()));

    match &id {
        Some(id) => tracing::debug!(url, pmc_id = %id, "Extracted PMC ID"),
        None => tracing::debug!(url, "No PMC ID found in link"),
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_article_url() {
        let id = extract_pmc_id("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC12345/").unwrap();
        assert_eq!(id.as_str(), "12345");
    }

    #[test]
    fn test_extract_absent() {
        assert!(extract_pmc_id("https://example.com/no-id").is_none());
        assert!(extract_pmc_id("").is_none());
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        assert!(extract_pmc_id("https://example.com/pmc12345").is_none());
        assert!(extract_pmc_id("https://example.com/PMC/").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let id = extract_pmc_id("https://x.org/PMC111/related/PMC222").unwrap();
        assert_eq!(id.as_str(), "111");
    }

    #[test]
    fn test_non_ascii_digits_are_skipped() {
        let id = extract_pmc_id("https://x.org/PMC\u{661}\u{662}/see/PMC456").unwrap();
        assert_eq!(id.as_str(), "456");
    }

    #[test]
    fn test_extract_from_new_pmc_domain() {
        let id = extract_pmc_id("https://pmc.ncbi.nlm.nih.gov/articles/PMC7096066").unwrap();
        assert_eq!(id.as_str(), "7096066");
    }
}
