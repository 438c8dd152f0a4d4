//! Tavily search API client.
//!
//! Without a configured credential the client returns a fixed two-item
//! placeholder result set instead of failing, which keeps the whole
//! pipeline runnable offline and in tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, ResearchResult};
use crate::search::{Document, SearchProvider};

/// Per-query time budget.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Search API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Search API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key for authentication.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
        }
    }
}

/// Tavily HTTP client.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    settings: SearchSettings,
    client: Client,
}

impl TavilyClient {
    /// Create a new client from settings.
    pub fn new(settings: SearchSettings) -> ResearchResult<Self> {
        let client = Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|e| ResearchError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// Fixed results served when no API key is configured.
    fn placeholder_results() -> Vec<Document> {
        vec![
            Document {
                title: "Mock Search Result 1".to_string(),
                url: "https://example.com/mock1".to_string(),
                snippet: "This is a mock search result for testing purposes.".to_string(),
            },
            Document {
                title: "Mock Search Result 2".to_string(),
                url: "https://example.com/mock2".to_string(),
                snippet: "Another mock search result for testing.".to_string(),
            },
        ]
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> ResearchResult<Vec<Document>> {
        let Some(ref api_key) = self.settings.api_key else {
            tracing::debug!(query = %query, "No search API key, serving placeholder results");
            return Ok(Self::placeholder_results());
        };

        let body = TavilyRequest {
            query,
            search_depth: "basic",
            include_answer: false,
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ResearchError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let payload: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(format!("Malformed search payload: {e}")))?;

        Ok(payload
            .results
            .into_iter()
            .map(|item| Document {
                title: item.title,
                url: item.url,
                snippet: item.content,
            })
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_results_without_key() {
        let client = TavilyClient::new(SearchSettings::default()).unwrap();

        let results = client.search("anything").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/mock1");
        assert_eq!(results[1].url, "https://example.com/mock2");
    }

    #[tokio::test]
    async fn test_placeholder_results_are_deterministic() {
        let client = TavilyClient::new(SearchSettings::default()).unwrap();

        let first = client.search("query one").await.unwrap();
        let second = client.search("query two").await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_response_payload_mapping() {
        let payload = r#"{"results": [{"title": "T", "url": "https://t.example", "content": "C"}]}"#;
        let parsed: TavilyResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].content, "C");
    }
}
