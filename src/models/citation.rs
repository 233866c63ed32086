//! Article and citation models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL for public PubMed Central article pages
pub const PMC_ARTICLE_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";

/// Numeric PubMed Central identifier (the digits after the `PMC` prefix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Wrap a run of digits. Returns `None` for anything else.
    pub fn new(digits: impl Into<String>) -> Option<Self> {
        let digits = digits.into();
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(digits))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public article page for this identifier
    pub fn public_link(&self) -> String {
        format!("{}/PMC{}/", PMC_ARTICLE_BASE_URL, self.0)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetched article split into its metadata and full-text subtrees.
///
/// Both fields hold the raw XML of the `<front>` and `<body>` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSections {
    pub front: String,
    pub body: String,
}

/// Citation-generation output from the language model.
///
/// Field names match the JSON schema the model is asked to produce, so the
/// same shape is used on the wire and in audit records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationDraft {
    pub success: bool,

    #[serde(default)]
    pub reference_list_citation: Option<String>,

    #[serde(default)]
    pub in_text_citation: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub doi: Option<String>,

    /// Formatted like `1st January 2024`
    #[serde(default)]
    pub publication_date: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,
}

impl CitationDraft {
    /// A failed draft carrying the reason
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reference_list_citation: None,
            in_text_citation: None,
            title: None,
            doi: None,
            publication_date: None,
            reason: Some(reason.into()),
        }
    }

    /// Downgrade a successful draft that is missing a field the final citation needs.
    pub fn into_checked(self) -> Self {
        if !self.success {
            return self;
        }
        let missing = [
            ("reference_list_citation", self.reference_list_citation.is_none()),
            ("in_text_citation", self.in_text_citation.is_none()),
            ("title", self.title.is_none()),
            ("publication_date", self.publication_date.is_none()),
        ]
        .into_iter()
        .find_map(|(name, absent)| absent.then_some(name));

        match missing {
            Some(field) => Self {
                success: false,
                reason: Some(format!("model response missing required field '{}'", field)),
                ..self
            },
            None => self,
        }
    }
}

/// Relevance-check output from the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    #[serde(rename = "found_relevant_passage")]
    pub found: bool,

    #[serde(default)]
    pub passage: Option<String>,

    pub reasoning: String,
}

impl RelevanceVerdict {
    /// A negative verdict carrying the reason
    pub fn not_found(reasoning: impl Into<String>) -> Self {
        Self {
            found: false,
            passage: None,
            reasoning: reasoning.into(),
        }
    }

    /// A positive verdict without a passage cannot be cited.
    pub fn into_checked(self) -> Self {
        if self.found && self.passage.is_none() {
            Self::not_found(format!(
                "model reported a relevant passage but did not quote it: {}",
                self.reasoning
            ))
        } else {
            self
        }
    }
}

/// A finished citation returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Reference list entry, ending with the access date
    pub reference_list_citation: String,

    /// In-text form, e.g. `(Smith et al., 2020)`
    pub in_text_citation: String,

    /// Passage from the article body that supports the input text
    pub supporting_passage: String,

    /// Why the model considers the passage supportive
    pub reasoning: String,

    pub pmc_id: ArticleId,

    pub title: String,

    pub doi: Option<String>,

    pub pmc_link: String,

    pub publication_date: String,
}
