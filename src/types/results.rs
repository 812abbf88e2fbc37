//! Retrieval, critique and query result types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Literature passage returned by vector similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Similarity score, higher is more relevant
    pub score: f32,
    #[serde(default)]
    pub chunk_id: Option<i64>,
}

/// Web page snippet returned by the web search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub score: f64,
}

/// Where a verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictSource {
    /// Parsed from the evaluation model's output
    Model,
    /// Model answered but the output was not a verdict
    ParseFallback,
    /// The evaluation call itself failed
    CallFallback,
}

/// Critic assessment of a generated answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticVerdict {
    /// Nominally 0-10, not range-enforced
    pub score: f64,
    pub reasoning: String,
    pub needs_more_info: bool,
    pub suggestions: String,
    pub source: VerdictSource,
}

impl CriticVerdict {
    /// Verdict used when the model output cannot be parsed
    pub fn parse_fallback() -> Self {
        Self {
            score: 7.0,
            reasoning: "Could not parse evaluation".to_string(),
            needs_more_info: false,
            suggestions: "Response appears adequate".to_string(),
            source: VerdictSource::ParseFallback,
        }
    }

    /// Verdict used when the evaluation call fails
    pub fn call_fallback() -> Self {
        Self {
            score: 5.0,
            reasoning: "Evaluation failed".to_string(),
            needs_more_info: false,
            suggestions: "Unable to evaluate".to_string(),
            source: VerdictSource::CallFallback,
        }
    }

    /// True when the verdict asks for an augmentation pass
    pub fn requests_augmentation(&self, threshold: f64) -> bool {
        self.needs_more_info && self.score < threshold
    }
}

/// Collaborator whose failure was replaced by an empty value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    VectorStore,
    WebSearch,
    AugmentationSearch,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VectorStore => "vector_store",
            Self::WebSearch => "web_search",
            Self::AugmentationSearch => "augmentation_search",
        }
    }
}

/// Record of a failed collaborator call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNotice {
    pub service: Service,
    pub reason: String,
}

/// Terminal value of one query resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub passages: Vec<RetrievedPassage>,
    /// Final web results, extended when an augmentation pass ran
    pub web_results: Vec<WebResult>,
    /// First generated answer
    pub draft_response: String,
    /// Authoritative answer shown to the user
    pub final_response: String,
    /// Score of the verdict on the first draft
    pub critic_score: f64,
    pub verdict: Option<CriticVerdict>,
    pub augmented: bool,
    #[serde(default)]
    pub notices: Vec<ServiceNotice>,
    pub processing_time: Duration,
}

impl QueryResult {
    /// Degraded result returned when the pipeline fails
    pub fn degraded(query: &str, message: &str, processing_time: Duration) -> Self {
        Self {
            query: query.to_string(),
            passages: Vec::new(),
            web_results: Vec::new(),
            draft_response: message.to_string(),
            final_response: message.to_string(),
            critic_score: 0.0,
            verdict: None,
            augmented: false,
            notices: Vec::new(),
            processing_time,
        }
    }

    /// Result for a canned small-talk reply
    pub fn canned(query: &str, reply: &str, processing_time: Duration) -> Self {
        Self::degraded(query, reply, processing_time)
    }

    pub fn processing_secs(&self) -> f64 {
        self.processing_time.as_secs_f64()
    }

    /// True when at least one collaborator call was replaced by an empty value
    pub fn had_service_failures(&self) -> bool {
        !self.notices.is_empty()
    }
}
