//! Qdrant vector store for the reference corpus
//!
//! Each chunk is stored as one point whose payload carries the chunk text
//! and its provenance (`text`, `source`, `page`, `chunk_id`, `doc_id`).

use crate::cli::config::QdrantConfig;
use crate::errors::{AssistantError, Result};
use crate::services::{ChunkStore, Embedder, StoreReport, VectorStore};
use crate::types::{Chunk, RetrievedPassage};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Vector store backed by a Qdrant collection
pub struct QdrantStore {
    client: Qdrant,
    embedder: Arc<dyn Embedder>,
    config: QdrantConfig,
}

impl QdrantStore {
    /// Connect to Qdrant; no request is made until the first call.
    /// Fails when the embedder's dimension differs from the collection's.
    pub fn connect(
        config: QdrantConfig,
        api_key: Option<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if embedder.dimension() as u64 != config.vector_size {
            return Err(AssistantError::ConfigError(format!(
                "collection {} expects {}-dimensional vectors but the embedder produces {}",
                config.collection,
                config.vector_size,
                embedder.dimension()
            )));
        }

        let client = Qdrant::from_url(&config.url)
            .api_key(api_key)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            embedder,
            config,
        })
    }

    pub fn collection(&self) -> &str {
        &self.config.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.client.collection_exists(&self.config.collection).await?)
    }

    async fn create_collection(&self) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                    VectorParamsBuilder::new(self.config.vector_size, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| {
                AssistantError::VectorStoreError(format!(
                    "Failed to create collection {}: {}",
                    self.config.collection, e
                ))
            })?;

        info!(
            collection = %self.config.collection,
            dimensions = self.config.vector_size,
            "collection created"
        );
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedPassage>> {
        let vector = self.embedder.embed_query(query).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.config.collection, vector, limit as u64)
                    .with_payload(true),
            )
            .await?;

        let passages: Vec<RetrievedPassage> = response
            .result
            .into_iter()
            .map(|point| passage_from_payload(&point.payload, point.score))
            .collect();

        debug!(count = passages.len(), "vector search complete");
        Ok(passages)
    }

    async fn count(&self) -> Result<u64> {
        ChunkStore::count(self).await
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    async fn count(&self) -> Result<u64> {
        if !self.collection_exists().await? {
            return Ok(0);
        }
        let info = self.client.collection_info(&self.config.collection).await?;
        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }

    async fn reset(&self) -> Result<()> {
        if self.collection_exists().await? {
            info!(collection = %self.config.collection, "deleting existing collection");
            self.client.delete_collection(&self.config.collection).await?;
        }
        self.create_collection().await
    }

    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        self.create_collection().await
    }

    async fn store_chunks(&self, chunks: &[Chunk]) -> Result<StoreReport> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        let mut report = StoreReport::default();
        let mut points = Vec::with_capacity(chunks.len());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match embedding {
                Some(vector) => points.push(point_for_chunk(chunk, vector)),
                None => report.skipped += 1,
            }
        }

        let batch_size = self.config.upsert_batch_size.max(1);
        let total_batches = points.len().div_ceil(batch_size);
        let mut batches = Vec::with_capacity(total_batches);
        while !points.is_empty() {
            let rest = points.split_off(batch_size.min(points.len()));
            batches.push(std::mem::replace(&mut points, rest));
        }

        for (index, batch) in batches.into_iter().enumerate() {
            let size = batch.len();
            match self
                .client
                .upsert_points(UpsertPointsBuilder::new(&self.config.collection, batch).wait(true))
                .await
            {
                Ok(_) => {
                    report.stored += size;
                    debug!(
                        batch = index + 1,
                        total_batches,
                        stored = report.stored,
                        "uploaded batch"
                    );
                }
                Err(e) => {
                    warn!(batch = index + 1, error = %e, "batch upload failed");
                    report.failed += size;
                }
            }
        }

        info!(
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed,
            "chunks stored"
        );
        Ok(report)
    }
}

fn point_for_chunk(chunk: &Chunk, vector: Vec<f32>) -> PointStruct {
    let mut payload: HashMap<String, QdrantValue> = chunk
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), json_to_qdrant_value(value.clone())))
        .collect();
    payload.insert("text".to_string(), QdrantValue::from(chunk.text.clone()));
    payload.insert("source".to_string(), QdrantValue::from(chunk.source.clone()));
    payload.insert("page".to_string(), QdrantValue::from(chunk.page as i64));
    payload.insert("chunk_id".to_string(), QdrantValue::from(chunk.chunk_id as i64));
    payload.insert("doc_id".to_string(), QdrantValue::from(chunk.id.clone()));

    PointStruct::new(Uuid::new_v4().to_string(), vector, payload)
}

/// Rebuild a passage from a stored payload; missing fields fall back to defaults
pub fn passage_from_payload(payload: &HashMap<String, QdrantValue>, score: f32) -> RetrievedPassage {
    let text = payload
        .get("text")
        .and_then(qdrant_value_to_string)
        .unwrap_or_default();
    let source = payload
        .get("source")
        .and_then(qdrant_value_to_string)
        .unwrap_or_default();
    let page = payload
        .get("page")
        .and_then(qdrant_value_to_i64)
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(0);
    let chunk_id = payload.get("chunk_id").and_then(qdrant_value_to_i64);

    RetrievedPassage {
        text,
        source,
        page,
        score,
        chunk_id,
    }
}

// Helper functions for type conversions
fn json_to_qdrant_value(json: JsonValue) -> QdrantValue {
    match json {
        JsonValue::String(s) => QdrantValue::from(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                QdrantValue::from(i)
            } else if let Some(f) = n.as_f64() {
                QdrantValue::from(f)
            } else {
                QdrantValue::from(0i64)
            }
        }
        JsonValue::Bool(b) => QdrantValue::from(b),
        other => QdrantValue::from(other.to_string()),
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    match value.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

fn qdrant_value_to_i64(value: &QdrantValue) -> Option<i64> {
    match value.kind.as_ref()? {
        Kind::IntegerValue(i) => Some(*i),
        Kind::DoubleValue(f) => Some(*f as i64),
        _ => None,
    }
}
