//! Document ingestion
//!
//! Loads the reference PDFs, cuts them into chunks and writes the chunks
//! to the vector store. Ingestion only runs when the collection is empty
//! or a reset is requested.

pub mod chunker;
pub mod loader;

pub use chunker::TextChunker;
pub use loader::{clean_text, PdfLoader};

use crate::errors::Result;
use crate::services::{ChunkStore, DocumentLoader, StoreReport};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// What the readiness step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The collection already held points and was left alone
    Reused { documents: u64 },
    /// Documents were loaded, chunked and stored
    Ingested {
        pages: usize,
        chunks: usize,
        report: StoreReport,
    },
    /// Nothing could be loaded from the data directory
    NoDocuments,
}

impl IngestOutcome {
    /// True when the store can serve queries afterwards
    pub fn is_ready(&self) -> bool {
        match self {
            IngestOutcome::Reused { .. } => true,
            IngestOutcome::Ingested { report, .. } => report.is_success(),
            IngestOutcome::NoDocuments => false,
        }
    }
}

pub struct Ingestor {
    loader: Arc<dyn DocumentLoader>,
    chunker: TextChunker,
    store: Arc<dyn ChunkStore>,
}

impl Ingestor {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        chunker: TextChunker,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            loader,
            chunker,
            store,
        }
    }

    /// Make the vector store ready to serve queries.
    ///
    /// With `reset` the collection is dropped and rebuilt; otherwise an
    /// existing non-empty collection is reused as is.
    pub async fn initialize(&self, reset: bool) -> Result<IngestOutcome> {
        if reset {
            info!("resetting collection");
            self.store.reset().await?;
        } else {
            let count = self.store.count().await?;
            if count > 0 {
                info!(documents = count, "collection already populated");
                return Ok(IngestOutcome::Reused { documents: count });
            }
            self.store.ensure_collection().await?;
        }

        self.ingest().await
    }

    /// Load, chunk and store every configured document
    pub async fn ingest(&self) -> Result<IngestOutcome> {
        let documents = self.loader.load().await?;
        if documents.is_empty() {
            warn!("no documents found to ingest");
            return Ok(IngestOutcome::NoDocuments);
        }

        let chunks = self.chunker.chunk_documents(&documents);
        info!(pages = documents.len(), chunks = chunks.len(), "documents chunked");

        let report = self.store.store_chunks(&chunks).await?;
        if !report.is_success() {
            warn!(?report, "no chunks were stored");
        }

        Ok(IngestOutcome::Ingested {
            pages: documents.len(),
            chunks: chunks.len(),
            report,
        })
    }
}
