//! MediRAG - Medical question answering
//!
//! Answers medical questions from an indexed reference library and live web
//! search, grades each draft with a critic pass, and regenerates the answer
//! with extra web context when the critic asks for more information.
//!
//! # Architecture
//!
//! - **rag**: query orchestration, generation, critique, context assembly
//! - **services**: collaborator traits and the retry manager
//! - **llm / search / store**: Groq, Tavily, Cohere and Qdrant adapters
//! - **ingest**: PDF loading, chunking and indexing
//! - **repl / session / doctor**: chat surface and diagnostics

pub mod errors;
pub mod types;

pub use errors::{AssistantError, Result};

pub mod cli;
pub mod services;
pub mod telemetry;

// Provider adapters
pub mod llm;
pub mod search;
pub mod store;

pub mod ingest;
pub mod rag;

// Chat surface and diagnostics
pub mod doctor;
pub mod repl;
pub mod session;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
