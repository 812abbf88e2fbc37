//! Tavily web search client
//!
//! Searches a fixed allow-list of medical sites. The outgoing query is
//! wrapped with medical context words before it is sent.

use crate::cli::config::WebSearchConfig;
use crate::errors::{AssistantError, Result};
use crate::services::WebSearch;
use crate::types::WebResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "tavily";

/// Tavily search client
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: String,
    config: WebSearchConfig,
}

impl TavilyClient {
    pub fn new(config: WebSearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Query actually sent to the provider
    pub fn medical_query(&self, query: &str) -> String {
        [
            self.config.query_prefix.as_str(),
            query.trim(),
            self.config.query_suffix.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let body = SearchRequest {
            api_key: &self.api_key,
            query: self.medical_query(query),
            search_depth: &self.config.search_depth,
            max_results,
            include_domains: &self.config.include_domains,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::from_status(PROVIDER, status, error_text));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AssistantError::MalformedResponse(format!("Failed to parse search response: {}", e))
        })?;

        let results: Vec<WebResult> = parsed
            .results
            .into_iter()
            .take(max_results)
            .map(WebResult::from)
            .collect();

        debug!(query, count = results.len(), "web search complete");
        Ok(results)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: String,
    search_depth: &'a str,
    max_results: usize,
    include_domains: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    score: f64,
}

impl From<TavilyResult> for WebResult {
    fn from(result: TavilyResult) -> Self {
        Self {
            title: result.title,
            content: result.content,
            url: result.url,
            score: result.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medical_query_wrapping() {
        let client = TavilyClient::new(WebSearchConfig::default(), "key").unwrap();
        assert_eq!(
            client.medical_query("  asthma  "),
            "medical health asthma symptoms treatment diagnosis"
        );
    }

    #[test]
    fn test_medical_query_without_affixes() {
        let config = WebSearchConfig {
            query_prefix: String::new(),
            query_suffix: String::new(),
            ..Default::default()
        };
        let client = TavilyClient::new(config, "key").unwrap();
        assert_eq!(client.medical_query("asthma"), "asthma");
    }

    #[test]
    fn test_response_missing_fields_default() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"results":[{"title":"Asthma","url":"https://cdc.gov/a"}]}"#)
                .unwrap();
        let result = WebResult::from(parsed.results.into_iter().next().unwrap());
        assert_eq!(result.title, "Asthma");
        assert_eq!(result.content, "");
        assert_eq!(result.score, 0.0);
    }
}
