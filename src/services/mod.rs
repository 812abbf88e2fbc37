//! Service contracts and shared adapter plumbing
//!
//! The pipeline only ever sees these traits; concrete HTTP and Qdrant
//! adapters live in `llm`, `search` and `store`.

pub mod retry;
pub mod traits;

pub use retry::{Backoff, RetryManager};
pub use traits::{
    ChunkStore, CompletionRequest, DocumentLoader, Embedder, LanguageModel, StoreReport,
    VectorStore, WebSearch,
};
