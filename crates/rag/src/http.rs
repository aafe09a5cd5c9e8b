//! Remote knowledge service client
//!
//! Talks to an external scheme search service over JSON:
//!
//! - `POST {base_url}/search` with a `RetrievalQuery`, returns a `RetrievalResult`
//! - `POST {base_url}/fresh-search` with the same body, for freshness lookups
//!
//! Transport and decoding failures surface as `RetrievalUnavailable`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use udyami_core::{KnowledgeService, RetrievalOrigin, RetrievalQuery, RetrievalResult};

use crate::RagError;

/// Remote knowledge service configuration
#[derive(Debug, Clone)]
pub struct HttpKnowledgeConfig {
    /// Service base URL, without a trailing slash
    pub base_url: String,
    /// Transport-level timeout; the executor applies its own bound on top
    pub timeout: Duration,
}

impl HttpKnowledgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP knowledge service client
pub struct HttpKnowledgeService {
    client: Client,
    config: HttpKnowledgeConfig,
}

impl HttpKnowledgeService {
    pub fn new(config: HttpKnowledgeConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Connection(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn post(&self, path: &str, query: &RetrievalQuery) -> crate::Result<RetrievalResult> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(|e| RagError::Connection(format!("Knowledge service request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Service { status, body });
        }

        response
            .json::<RetrievalResult>()
            .await
            .map_err(|e| RagError::Decode(e.to_string()))
    }
}

#[async_trait]
impl KnowledgeService for HttpKnowledgeService {
    async fn search(&self, query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        let mut result = self.post("search", query).await?;
        result.origin = RetrievalOrigin::Primary;
        Ok(result)
    }

    async fn fresh_search(&self, query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        let mut result = self.post("fresh-search", query).await?;
        result.origin = RetrievalOrigin::Fresh;
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udyami_core::{Error, Intent};

    #[test]
    fn test_endpoint_joins_paths() {
        let service = HttpKnowledgeService::new(HttpKnowledgeConfig::new("http://kb.local:9000/")).unwrap();
        assert_eq!(service.base_url(), "http://kb.local:9000");
        assert_eq!(service.endpoint("fresh-search"), "http://kb.local:9000/fresh-search");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let mut config = HttpKnowledgeConfig::new("http://127.0.0.1:9");
        config.timeout = Duration::from_millis(500);
        let service = HttpKnowledgeService::new(config).unwrap();
        let query = RetrievalQuery {
            text: "Discover schemes".into(),
            intent: Intent::DiscoverSchemes,
            snapshot: Default::default(),
            reference: None,
            top_k: 5,
        };
        let err = service.search(&query).await.unwrap_err();
        assert!(matches!(err, Error::RetrievalUnavailable(_)));
    }
}
