//! OpenAI chat completions gateway.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::llm::{citation_prompt, relevance_prompt, CitationGateway, GatewayError};
use crate::models::{CitationDraft, RelevanceVerdict};
use crate::utils::HttpClient;

/// Gateway to an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiGateway {
    /// The client should carry a timeout suited to long prompts (see `ModelConfig::timeout`).
    pub fn new(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            base_url: config.endpoints.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_keys.openai.clone(),
            model: config.model.name.clone(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::MissingCredentials("OPENAI_API_KEY".to_string()))?;
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| GatewayError::MissingCredentials("invalid OpenAI API key".to_string()))?,
        );
        Ok(headers)
    }

    /// Send one user message in JSON-object mode and parse the reply as `T`.
    async fn complete_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .client()
            .post(format!("{}/chat/completions", self.base_url))
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GatewayError::Api(format!("{}: {}", status, text)));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GatewayError::EmptyResponse)?;

        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl CitationGateway for OpenAiGateway {
    async fn generate_citation(&self, article_metadata: &str, citation_guide: &str) -> CitationDraft {
        tracing::info!(model = %self.model, "Generating citation");
        let prompt = citation_prompt(citation_guide, article_metadata);

        match self.complete_json::<CitationDraft>(&prompt).await {
            Ok(draft) => {
                tracing::debug!(?draft, "Citation generation result");
                draft.into_checked()
            }
            Err(e) => {
                tracing::error!(error = %e, "Citation generation failed");
                CitationDraft::failure(e.to_string())
            }
        }
    }

    async fn check_relevance(&self, claim: &str, article_body: &str) -> RelevanceVerdict {
        tracing::info!(model = %self.model, "Checking relevance");
        let prompt = relevance_prompt(claim, article_body);

        match self.complete_json::<RelevanceVerdict>(&prompt).await {
            Ok(verdict) => {
                tracing::debug!(?verdict, "Relevance check result");
                verdict.into_checked()
            }
            Err(e) => {
                tracing::error!(error = %e, "Relevance check failed");
                RelevanceVerdict::not_found(e.to_string())
            }
        }
    }
}

// ===== Chat Completions API Types =====

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn gateway_for(server: &mockito::Server) -> OpenAiGateway {
        let mut config = Config::default();
        config.endpoints.openai_base_url = format!("{}/v1/", server.url());
        config.api_keys.openai = Some("sk-test".to_string());
        OpenAiGateway::new(HttpClient::new().unwrap(), &config)
    }

    fn completion(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_generate_citation() {
        let mut server = mockito::Server::new_async().await;
        let draft = r#"{
            "success": true,
            "reference_list_citation": "Aranow, C. (2011) 'Vitamin D and the immune system', Journal of Investigative Medicine, 59(6), pp. 881-886.",
            "in_text_citation": "(Aranow, 2011)",
            "title": "Vitamin D and the immune system",
            "doi": "10.2310/JIM.0b013e31821b8755",
            "publication_date": "1st August 2011",
            "reason": null
        }"#;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(draft))
            .create_async()
            .await;

        let result = gateway_for(&server)
            .generate_citation("<front>meta</front>", "guide")
            .await;

        mock.assert_async().await;
        assert!(result.success);
        assert_eq!(result.in_text_citation.as_deref(), Some("(Aranow, 2011)"));
        assert_eq!(result.publication_date.as_deref(), Some("1st August 2011"));
    }

    #[tokio::test]
    async fn test_check_relevance() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion(
                r#"{"found_relevant_passage": true, "passage": "Vitamin D modulates immunity.", "reasoning": "Directly states it."}"#,
            ))
            .create_async()
            .await;

        let verdict = gateway_for(&server)
            .check_relevance("Vitamin D affects the immune system response.", "<body/>")
            .await;

        assert!(verdict.found);
        assert_eq!(verdict.passage.as_deref(), Some("Vitamin D modulates immunity."));
    }

    #[tokio::test]
    async fn test_provider_error_is_fail_soft() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .expect(2)
            .create_async()
            .await;

        let gateway = gateway_for(&server);
        let draft = gateway.generate_citation("<front/>", "guide").await;
        assert!(!draft.success);
        assert!(draft.reason.unwrap().contains("500"));

        let verdict = gateway.check_relevance("claim", "<body/>").await;
        assert!(!verdict.found);
        assert!(verdict.passage.is_none());
        assert!(verdict.reasoning.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_fail_soft() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion("this is not json"))
            .create_async()
            .await;

        let draft = gateway_for(&server).generate_citation("<front/>", "guide").await;
        assert!(!draft.success);
        assert!(draft.reason.is_some());
    }

    #[tokio::test]
    async fn test_missing_schema_field_is_fail_soft() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion(r#"{"passage": "x", "reasoning": "y"}"#))
            .create_async()
            .await;

        let verdict = gateway_for(&server).check_relevance("claim", "<body/>").await;
        assert!(!verdict.found);
        assert!(verdict.reasoning.contains("found_relevant_passage"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut config = Config::default();
        config.api_keys.openai = None;
        let gateway = OpenAiGateway::new(HttpClient::new().unwrap(), &config);

        let draft = gateway.generate_citation("<front/>", "guide").await;
        assert!(!draft.success);
        assert!(draft.reason.unwrap().contains("OPENAI_API_KEY"));
    }
}
