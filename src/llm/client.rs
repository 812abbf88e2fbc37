//! Groq chat completion client
//!
//! Talks to the OpenAI-compatible endpoint:
//! - Endpoint: POST {base_url}/chat/completions
//! - Bearer authentication
//! - Transient failures (timeouts, 429, 5xx) are retried with exponential backoff

use crate::cli::config::GenerationConfig;
use crate::errors::{AssistantError, Result};
use crate::services::{CompletionRequest, LanguageModel, RetryManager};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default Groq API endpoint
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Request timeout (60 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const PROVIDER: &str = "groq";

/// Groq chat completion client
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryManager,
}

impl GroqClient {
    /// Create client with default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_settings(DEFAULT_GROQ_URL, DEFAULT_MODEL, api_key, REQUEST_TIMEOUT, 2)
    }

    /// Create client from the generation section of the config
    pub fn from_config(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::with_settings(
            &config.base_url,
            &config.model,
            api_key,
            config.timeout(),
            config.max_attempts,
        )
    }

    /// Create client with custom configuration
    pub fn with_settings(
        base_url: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.to_string(),
            retry: RetryManager::exponential(max_attempts, 1000).with_label(PROVIDER),
        })
    }

    /// Same connection, different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryManager) -> Self {
        self.retry = retry.with_label(PROVIDER);
        self
    }

    /// Single chat completion call, no retry
    async fn complete_once(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
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
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::from_status(PROVIDER, status, error_text));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AssistantError::MalformedResponse(format!("Failed to parse completion: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::MalformedResponse("Completion had no choices".to_string()))
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let start = Instant::now();
        let text = self
            .retry
            .execute_with_retry(|| self.complete_once(&request))
            .await?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = text.len(),
            "completion received"
        );
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
