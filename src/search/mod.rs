//! Web search module

pub mod tavily;

pub use tavily::TavilyClient;
