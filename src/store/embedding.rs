//! Cohere embedding client
//!
//! Documents are embedded in small batches with a pause between batches to
//! stay under the provider's rate limit. A batch that cannot be embedded
//! yields `None` for each of its texts so the caller can leave those chunks
//! out of the store.

use crate::cli::config::EmbeddingConfig;
use crate::errors::{AssistantError, Result};
use crate::services::{Embedder, RetryManager};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER: &str = "cohere";

/// Placeholder sent for blank inputs, the provider rejects empty strings
const EMPTY_TEXT: &str = "empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputType {
    Document,
    Query,
}

impl InputType {
    fn as_str(&self) -> &'static str {
        match self {
            InputType::Document => "search_document",
            InputType::Query => "search_query",
        }
    }
}

/// Embedding client for the Cohere `/v1/embed` endpoint
#[derive(Debug, Clone)]
pub struct CohereEmbedder {
    client: Client,
    api_key: String,
    config: EmbeddingConfig,
    document_retry: RetryManager,
    query_retry: RetryManager,
    show_progress: bool,
}

impl CohereEmbedder {
    pub fn new(config: EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(AssistantError::HttpError)?;

        let document_retry = RetryManager::fixed(
            config.max_attempts,
            Duration::from_secs(config.rate_limit_backoff_secs),
        )
        .with_label("cohere-documents");
        let query_retry = RetryManager::fixed(2, Duration::from_secs(config.query_backoff_secs))
            .with_label("cohere-query");

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
            document_retry,
            query_retry,
            show_progress: false,
        })
    }

    /// Draw a progress bar while embedding documents
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Override the retry policies, mostly useful to keep tests fast
    pub fn with_retry(mut self, document_retry: RetryManager, query_retry: RetryManager) -> Self {
        self.document_retry = document_retry;
        self.query_retry = query_retry;
        self
    }

    /// Trim and cut a text to the provider's input limit
    pub fn prepare_text(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return EMPTY_TEXT.to_string();
        }
        trimmed.chars().take(self.config.max_input_chars).collect()
    }

    async fn embed_batch(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embed", self.config.base_url.trim_end_matches('/'));
        let body = EmbedRequest {
            texts,
            model: &self.config.model,
            input_type: input_type.as_str(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::from_status(PROVIDER, status, error_text));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            AssistantError::MalformedResponse(format!("Failed to parse embeddings: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AssistantError::MalformedResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings)
    }

    fn progress_bar(&self, batches: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(batches as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} Creating embeddings [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>> {
        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Vec<String>> = texts
            .chunks(batch_size)
            .map(|batch| batch.iter().map(|t| self.prepare_text(t)).collect())
            .collect();

        info!(texts = texts.len(), batches = batches.len(), "embedding documents");
        let progress = self.progress_bar(batches.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (index, batch) in batches.iter().enumerate() {
            let result = self
                .document_retry
                .execute_with_retry_when(
                    || self.embed_batch(batch, InputType::Document),
                    AssistantError::is_rate_limit,
                )
                .await;

            match result {
                Ok(vectors) => {
                    embeddings.extend(vectors.into_iter().map(|v| Some(normalize(v))));
                }
                Err(e) => {
                    warn!(batch = index, error = %e, "embedding batch failed, chunks will be skipped");
                    embeddings.extend(std::iter::repeat(None).take(batch.len()));
                }
            }

            if let Some(pb) = &progress {
                pb.inc(1);
            }

            if index + 1 < batches.len() && self.config.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let embedded = embeddings.iter().filter(|e| e.is_some()).count();
        info!(embedded, total = texts.len(), "document embedding finished");
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let input = vec![self.prepare_text(text)];
        let mut vectors = self
            .query_retry
            .execute_with_retry_when(
                || self.embed_batch(&input, InputType::Query),
                AssistantError::is_rate_limit,
            )
            .await?;

        debug!(chars = input[0].len(), "query embedded");
        vectors
            .pop()
            .map(normalize)
            .ok_or_else(|| AssistantError::MalformedResponse("No query embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

/// Scale a vector to unit length; zero vectors are returned unchanged
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
