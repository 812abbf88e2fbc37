// Retrieval-augmented answering
//
// Components:
// - Context Builder: formats passages and web results for the prompt
// - Generator: plain-text answers from the language model
// - Critic: rubric-based evaluation of a draft
// - Pipeline: end-to-end query orchestration

pub mod context;
pub mod critic;
pub mod generator;
pub mod pipeline;

// Re-export key types
pub use context::{AssembledContext, ContextBuilder, ContextConfig};
pub use critic::{parse_verdict, Critic};
pub use generator::{canned_reply, Generator, APOLOGY, GREETING_REPLY, SMALL_TALK_REPLY};
pub use pipeline::{QueryOrchestrator, DEGRADED_RESPONSE};
