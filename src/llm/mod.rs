//! Language model client module
//!
//! Provides the Groq chat completion client used for both answer
//! generation and answer evaluation.

pub mod client;

// Re-export commonly used types
pub use client::{GroqClient, DEFAULT_GROQ_URL, DEFAULT_MODEL};
