//! Type definitions module
//!
//! Data model shared by ingestion, retrieval and the query pipeline.

pub mod documents;
pub mod results;

// Re-export commonly used types
pub use documents::{Chunk, Document};
pub use results::{
    CriticVerdict, QueryResult, RetrievedPassage, Service, ServiceNotice, VerdictSource,
    WebResult,
};
