//! PubMed Central (PMC) article source.
//!
//! Uses the NCBI E-utilities `efetch` endpoint to retrieve full-text JATS XML.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::config::Config;
use crate::models::{ArticleId, ArticleSections};
use crate::sources::{ArticleRepository, SourceError};
use crate::utils::HttpClient;

/// PMC article repository
#[derive(Debug, Clone)]
pub struct PmcSource {
    client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
}

impl PmcSource {
    pub fn new(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            endpoint: config.endpoints.efetch_url.clone(),
            api_key: config.api_keys.ncbi.clone(),
        }
    }

    /// Query parameters for one efetch call
    fn query_params<'a>(&'a self, id: &'a ArticleId) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("db", "pmc"), ("id", id.as_str()), ("retmode", "xml")];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }
        params
    }
}

#[async_trait]
impl ArticleRepository for PmcSource {
    fn name(&self) -> &str {
        "PubMed Central"
    }

    async fn fetch(&self, id: &ArticleId) -> Result<Option<ArticleSections>, SourceError> {
        tracing::debug!(endpoint = %self.endpoint, pmc_id = %id, "Fetching article content from PMC");

        let response = self
            .client
            .client()
            .get(&self.endpoint)
            .query(&self.query_params(id))
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch article: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "PMC API returned status: {}",
                response.status()
            )));
        }

        let xml_content = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read XML: {}", e)))?;

        match extract_sections(&xml_content) {
            Ok(sections) => Ok(sections),
            Err(e) => {
                // Unparseable records are incomplete records, not fetch failures
                tracing::warn!(pmc_id = %id, error = %e, "Malformed article XML");
                Ok(None)
            }
        }
    }
}

/// Split JATS XML into its `<front>` and `<body>` subtrees.
///
/// Returns `Ok(None)` when either element is missing. A self-closing
/// `<body/>` counts as present.
pub fn extract_sections(xml: &str) -> Result<Option<ArticleSections>, quick_xml::Error> {
    let front = extract_element(xml, b"front")?;
    let body = extract_element(xml, b"body")?;

    match (front, body) {
        (Some(front), Some(body)) => Ok(Some(ArticleSections { front, body })),
        (front, body) => {
            if front.is_none() {
                tracing::warn!("Missing front in article XML");
            }
            if body.is_none() {
                tracing::warn!("Missing body in article XML");
            }
            Ok(None)
        }
    }
}

/// Raw markup of the first element named `name`, tags included.
fn extract_element(xml: &str, name: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut start: Option<usize> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == name => {
                if start.is_none() {
                    // The opening tag ends at the current position; it begins at the last '<'
                    let tag_end = reader.buffer_position() as usize;
                    start = xml[..tag_end].rfind('<');
                }
                depth += 1;
            }
            Event::Empty(e) if e.name().as_ref() == name && start.is_none() => {
                let end = reader.buffer_position() as usize;
                return Ok(xml[..end].rfind('<').map(|s| xml[s..end].to_string()));
            }
            Event::End(e) if e.name().as_ref() == name && start.is_some() => {
                depth -= 1;
                if depth == 0 {
                    let end = reader.buffer_position() as usize;
                    return Ok(start.map(|s| xml[s..end].to_string()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ARTICLE: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE pmc-articleset PUBLIC "-//NLM//DTD ARTICLE SET 2.0//EN" "https://dtd.nlm.nih.gov/ncbi/pmc/articleset/nlm-articleset-2.0.dtd">
<pmc-articleset><article article-type="research-article">
<front><journal-meta><journal-title>Nutrients</journal-title></journal-meta>
<article-meta><title-group><article-title>Vitamin D &amp; Immunity</article-title></title-group></article-meta></front>
<body><sec><title>Results</title><p>Supplementation reduced infections.</p></sec></body>
<back><ref-list/></back>
</article></pmc-articleset>"#;

    #[test]
    fn test_extract_sections() {
        let sections = extract_sections(ARTICLE).unwrap().unwrap();
        assert!(sections.front.starts_with("<front>"));
        assert!(sections.front.ends_with("</front>"));
        assert!(sections.front.contains("Vitamin D &amp; Immunity"));
        assert!(sections.body.starts_with("<body>"));
        assert!(sections.body.ends_with("</body>"));
        assert!(sections.body.contains("Supplementation reduced infections."));
        assert!(!sections.body.contains("ref-list"));
    }

    #[test]
    fn test_extract_keeps_attributes_and_nested_elements() {
        let xml = r#"<article><front id="f1"><front>inner</front></front><body class="x"><p>text</p></body></article>"#;
        let sections = extract_sections(xml).unwrap().unwrap();
        assert_eq!(sections.front, r#"<front id="f1"><front>inner</front></front>"#);
        assert_eq!(sections.body, r#"<body class="x"><p>text</p></body>"#);
    }

    #[test]
    fn test_missing_body() {
        let xml = "<article><front><article-title>T</article-title></front></article>";
        assert_eq!(extract_sections(xml).unwrap(), None);
    }

    #[test]
    fn test_self_closing_body_counts_as_present() {
        let xml = "<article><front>meta</front><body/></article>";
        let sections = extract_sections(xml).unwrap().unwrap();
        assert_eq!(sections.front, "<front>meta</front>");
        assert_eq!(sections.body, "<body/>");
    }

    #[test]
    fn test_error_response_document() {
        let xml = r#"<pmc-articleset><error>The following PMCID is not available: 99</error></pmc-articleset>"#;
        assert_eq!(extract_sections(xml).unwrap(), None);
    }

    fn source_for(server: &mockito::Server, api_key: Option<&str>) -> PmcSource {
        let mut config = Config::default();
        config.endpoints.efetch_url = format!("{}/entrez/eutils/efetch.fcgi", server.url());
        config.api_keys.ncbi = api_key.map(str::to_string);
        PmcSource::new(HttpClient::new().unwrap(), &config)
    }

    #[tokio::test]
    async fn test_fetch_requests_xml() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/entrez/eutils/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("db".into(), "pmc".into()),
                Matcher::UrlEncoded("id".into(), "3166406".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
                Matcher::UrlEncoded("api_key".into(), "ncbi-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(ARTICLE)
            .create_async()
            .await;

        let id = ArticleId::new("3166406").unwrap();
        let sections = source_for(&server, Some("ncbi-key"))
            .fetch(&id)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(sections.is_some());
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/entrez/eutils/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let id = ArticleId::new("1").unwrap();
        let err = source_for(&server, None).fetch(&id).await.unwrap_err();
        assert!(matches!(err, SourceError::Api(_)));
    }

    #[tokio::test]
    async fn test_fetch_malformed_xml_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/entrez/eutils/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<article><front>meta</body></article>")
            .create_async()
            .await;

        let id = ArticleId::new("1").unwrap();
        let sections = source_for(&server, None).fetch(&id).await.unwrap();
        assert!(sections.is_none());
    }
}
