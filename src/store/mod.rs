//! Embedding and vector storage for the reference corpus

pub mod embedding;
pub mod vector_db;

pub use embedding::CohereEmbedder;
pub use vector_db::QdrantStore;
