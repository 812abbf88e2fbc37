//! Collaborator contracts consumed by the query pipeline and ingestion

use crate::errors::Result;
use crate::types::{Chunk, Document, RetrievedPassage, WebResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Optional system instruction
    pub system: Option<String>,
    /// User instruction
    pub user: String,
    /// Output length bound
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(user: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system: None,
            user: user.into(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Language generation / evaluation endpoint
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt, returning the model text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Model identifier for logs
    fn model_name(&self) -> &str;
}

/// Similarity search over indexed literature
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `limit` passages ordered by descending relevance
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedPassage>>;

    /// Number of indexed records
    async fn count(&self) -> Result<u64>;
}

/// Live web search
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Up to `max_results` results in provider order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>>;
}

/// Text embedding provider
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed documents for indexing; `None` marks an item whose batch failed
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>>;

    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector dimension
    fn dimension(&self) -> usize;
}

/// Outcome of storing a set of chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReport {
    /// Chunks written to the store
    pub stored: usize,
    /// Chunks left out because they had no embedding
    pub skipped: usize,
    /// Chunks in upload batches that failed
    pub failed: usize,
}

impl StoreReport {
    pub fn is_success(&self) -> bool {
        self.stored > 0
    }
}

/// Write side of the vector store, used during ingestion
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn count(&self) -> Result<u64>;

    /// Drop and recreate the collection
    async fn reset(&self) -> Result<()>;

    /// Create the collection when missing
    async fn ensure_collection(&self) -> Result<()>;

    async fn store_chunks(&self, chunks: &[Chunk]) -> Result<StoreReport>;
}

/// Source of reference documents
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>>;
}
