//! Error types for MediRAG
//!
//! Every adapter returns these typed errors; the pipeline decides which
//! ones collapse into fallback values.

use thiserror::Error;

/// Main error type for the assistant
#[derive(Error, Debug)]
pub enum AssistantError {
    /// HTTP client errors (connect, timeout, body decode)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success status returned by an external provider
    #[error("{provider} returned HTTP {status}: {body}")]
    ProviderStatus {
        provider: String,
        status: u16,
        body: String,
    },

    /// Provider signalled a rate limit
    #[error("{provider} rate limit reached")]
    RateLimited { provider: String },

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Provider answered with a body we could not interpret
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    /// Document loading errors
    #[error("Document error: {0}")]
    DocumentError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required API key or endpoint is not set
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Query rejected before any work was done
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Assistant error: {0}")]
    Generic(String),
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

impl AssistantError {
    /// Failures worth retrying inside an adapter
    pub fn is_transient(&self) -> bool {
        match self {
            AssistantError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AssistantError::ProviderStatus { status, .. } => *status >= 500,
            AssistantError::RateLimited { .. } => true,
            AssistantError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AssistantError::RateLimited { .. })
    }

    /// Map a non-success HTTP status into the matching variant
    pub fn from_status(provider: &str, status: u16, body: String) -> Self {
        if status == 429 {
            AssistantError::RateLimited {
                provider: provider.to_string(),
            }
        } else {
            AssistantError::ProviderStatus {
                provider: provider.to_string(),
                status,
                body,
            }
        }
    }
}

/// Convert anyhow errors to AssistantError
impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::Generic(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for AssistantError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        AssistantError::VectorStoreError(err.to_string())
    }
}

impl From<lopdf::Error> for AssistantError {
    fn from(err: lopdf::Error) -> Self {
        AssistantError::DocumentError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssistantError::ProviderStatus {
            provider: "groq".to_string(),
            status: 503,
            body: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("groq"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_from_status_rate_limit() {
        let err = AssistantError::from_status("cohere", 429, String::new());
        assert!(err.is_rate_limit());
        assert!(err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(AssistantError::from_status("tavily", 502, String::new()).is_transient());
        assert!(!AssistantError::from_status("tavily", 401, String::new()).is_transient());
        assert!(AssistantError::Timeout { duration_ms: 100 }.is_transient());
        assert!(!AssistantError::MalformedResponse("x".to_string()).is_transient());
        assert!(!AssistantError::ConfigError("x".to_string()).is_transient());
    }
}
