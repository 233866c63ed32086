//! Google Custom Search JSON API.

use async_trait::async_trait;

use crate::config::Config;
use crate::models::{SearchResultItem, WebSearchResults};
use crate::sources::{SourceError, WebSearch};
use crate::utils::HttpClient;

/// Web search backed by a Google Programmable Search Engine
#[derive(Debug, Clone)]
pub struct GoogleSearch {
    client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    cx: Option<String>,
}

impl GoogleSearch {
    pub fn new(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            endpoint: config.endpoints.search_url.clone(),
            api_key: config.api_keys.google_search.clone(),
            cx: config.api_keys.google_cx.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), SourceError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            SourceError::MissingCredentials("GOOGLE_CUSTOM_SEARCH_API_KEY".to_string())
        })?;
        let cx = self
            .cx
            .as_deref()
            .ok_or_else(|| SourceError::MissingCredentials("GOOGLE_CUSTOM_SEARCH_CX".to_string()))?;
        Ok((key, cx))
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    fn name(&self) -> &str {
        "Google Custom Search"
    }

    async fn search(&self, query: &str) -> Result<WebSearchResults, SourceError> {
        let (key, cx) = self.credentials()?;
        tracing::debug!(endpoint = %self.endpoint, "Sending request to Google Custom Search API");

        let response = self
            .client
            .client()
            .get(&self.endpoint)
            .query(&[("key", key), ("cx", cx), ("q", query)])
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach search API: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Search API returned status: {}",
                response.status()
            )));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse search response: {}", e)))?;
        tracing::debug!(response = %raw, "Google Custom Search API response");

        // No "items" key means zero results
        let items: Vec<SearchResultItem> = match raw.get("items") {
            Some(items) => serde_json::from_value(items.clone())?,
            None => Vec::new(),
        };

        Ok(WebSearchResults { items, raw })
    }
}
