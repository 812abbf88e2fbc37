//! Chat session state

pub mod history;

pub use history::{ChatHistory, HistoryEntry};
