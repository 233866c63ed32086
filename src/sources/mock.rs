//! Mock sources for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{ArticleId, ArticleSections, SearchResultItem, WebSearchResults};
use crate::sources::{ArticleRepository, SourceError, WebSearch};

/// A mock web search that returns a predefined response.
#[derive(Debug, Default)]
pub struct MockWebSearch {
    response: Mutex<Option<Result<WebSearchResults, String>>>,
    calls: AtomicUsize,
}

impl MockWebSearch {
    /// Create a new mock search with no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these links, in order, from every search.
    pub fn with_links<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let search = Self::new();
        search.set_items(links.into_iter().map(SearchResultItem::new).collect());
        search
    }

    /// Fail every search with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        let search = Self::new();
        search.set_failure(message);
        search
    }

    /// Set the items to return.
    pub fn set_items(&self, items: Vec<SearchResultItem>) {
        let mut guard = self.response.lock().unwrap();
        *guard = Some(Ok(WebSearchResults::from_items(items)));
    }

    /// Make searches fail.
    pub fn set_failure(&self, message: impl Into<String>) {
        let mut guard = self.response.lock().unwrap();
        *guard = Some(Err(message.into()));
    }

    /// Number of searches issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearch for MockWebSearch {
    fn name(&self) -> &str {
        "Mock Search"
    }

    async fn search(&self, _query: &str) -> Result<WebSearchResults, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.response.lock().unwrap();
        match &*guard {
            Some(Ok(results)) => Ok(results.clone()),
            Some(Err(message)) => Err(SourceError::Api(message.clone())),
            None => Ok(WebSearchResults::default()),
        }
    }
}

#[derive(Debug, Clone)]
enum MockArticle {
    Found(ArticleSections),
    Incomplete,
    Failing(String),
}

/// A mock article repository keyed by PMC identifier.
///
/// Unknown identifiers behave like a record without sections.
#[derive(Debug, Default)]
pub struct MockArticleRepository {
    articles: Mutex<HashMap<String, MockArticle>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl MockArticleRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve an article with the given sections.
    pub fn insert(&self, id: &str, front: impl Into<String>, body: impl Into<String>) {
        let sections = ArticleSections {
            front: front.into(),
            body: body.into(),
        };
        self.set(id, MockArticle::Found(sections));
    }

    /// Serve a record that lacks front matter or body.
    pub fn insert_incomplete(&self, id: &str) {
        self.set(id, MockArticle::Incomplete);
    }

    /// Fail fetches of this identifier with a network error.
    pub fn insert_failing(&self, id: &str, message: impl Into<String>) {
        self.set(id, MockArticle::Failing(message.into()));
    }

    /// Delay the response for this identifier.
    pub fn set_delay(&self, id: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(id.to_string(), delay);
    }

    /// Number of fetches issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set(&self, id: &str, article: MockArticle) {
        self.articles.lock().unwrap().insert(id.to_string(), article);
    }
}

#[async_trait]
impl ArticleRepository for MockArticleRepository {
    fn name(&self) -> &str {
        "Mock Repository"
    }

    async fn fetch(&self, id: &ArticleId) -> Result<Option<ArticleSections>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let article = self.articles.lock().unwrap().get(id.as_str()).cloned();
        match article {
            Some(MockArticle::Found(sections)) => Ok(Some(sections)),
            Some(MockArticle::Failing(message)) => Err(SourceError::Network(message)),
            Some(MockArticle::Incomplete) | None => Ok(None),
        }
    }
}
