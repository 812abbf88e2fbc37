//! Configuration management for MediRAG
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.medirag/config.toml
//!
//! API keys never live in the file; they are read from the environment
//! into [`Credentials`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::errors::{AssistantError, Result};
use tracing::warn;

/// Complete configuration for MediRAG
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub critic: CriticConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Vector store connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub vector_size: u64,
    pub upsert_batch_size: usize,
    pub timeout_secs: u64,
}

/// Embedding provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub max_input_chars: usize,
    pub max_attempts: u32,
    pub rate_limit_backoff_secs: u64,
    pub query_backoff_secs: u64,
    pub batch_delay_ms: u64,
    pub timeout_secs: u64,
}

/// Answer generation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

/// Evaluation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Web search provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub base_url: String,
    pub search_depth: String,
    pub include_domains: Vec<String>,
    pub query_prefix: String,
    pub query_suffix: String,
    pub timeout_secs: u64,
}

/// Orchestration policy constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub passage_limit: usize,
    pub web_limit: usize,
    pub augmentation_limit: usize,
    pub score_threshold: f64,
    pub augmentation_suffix: String,
    pub context_items: usize,
    pub context_chars: usize,
}

/// Document ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub data_dir: String,
    pub pdf_files: Vec<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Chat history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    pub persist: bool,
}

/// File system paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_dir: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "Medical".to_string(),
            vector_size: 384,
            upsert_batch_size: 100,
            timeout_secs: 30,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cohere.ai".to_string(),
            model: "embed-english-light-v3.0".to_string(),
            dimension: 384,
            batch_size: 10,
            max_input_chars: 1500,
            max_attempts: 3,
            rate_limit_backoff_secs: 60,
            query_backoff_secs: 30,
            batch_delay_ms: 2000,
            timeout_secs: 30,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 1200,
            temperature: 0.3,
            timeout_secs: 60,
            max_attempts: 2,
        }
    }
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            search_depth: "advanced".to_string(),
            include_domains: [
                "mayoclinic.org",
                "webmd.com",
                "medlineplus.gov",
                "healthline.com",
                "who.int",
                "cdc.gov",
                "nih.gov",
                "pubmed.ncbi.nlm.nih.gov",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            query_prefix: "medical health".to_string(),
            query_suffix: "symptoms treatment diagnosis".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passage_limit: 5,
            web_limit: 3,
            augmentation_limit: 2,
            score_threshold: 6.0,
            augmentation_suffix: "detailed medical information treatment".to_string(),
            context_items: 3,
            context_chars: 800,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            pdf_files: vec![
                "Standard_Treatment_Guidelines.pdf".to_string(),
                "The_Gale_Encyclopedia_Of_Medicine.pdf".to_string(),
            ],
            chunk_size: 2000,
            chunk_overlap: 400,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 20,
            persist: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: "~/.medirag".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| AssistantError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".medirag").join("config.toml");
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.qdrant.collection.trim().is_empty() {
            return Err(AssistantError::ConfigError(
                "qdrant.collection must not be empty".to_string(),
            ));
        }

        if self.qdrant.vector_size as usize != self.embedding.dimension {
            return Err(AssistantError::ConfigError(format!(
                "qdrant.vector_size ({}) must match embedding.dimension ({})",
                self.qdrant.vector_size, self.embedding.dimension
            )));
        }

        if self.embedding.batch_size == 0 || self.qdrant.upsert_batch_size == 0 {
            return Err(AssistantError::ConfigError(
                "batch sizes must be greater than 0".to_string(),
            ));
        }

        if self.ingest.chunk_size == 0 {
            return Err(AssistantError::ConfigError(
                "ingest.chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(AssistantError::ConfigError(
                "ingest.chunk_overlap must be less than ingest.chunk_size".to_string(),
            ));
        }

        for (name, temperature) in [
            ("generation.temperature", self.generation.temperature),
            ("critic.temperature", self.critic.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AssistantError::ConfigError(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        if self.pipeline.passage_limit == 0 || self.pipeline.web_limit == 0 {
            return Err(AssistantError::ConfigError(
                "pipeline limits must be greater than 0".to_string(),
            ));
        }

        if self.history.max_entries == 0 {
            return Err(AssistantError::ConfigError(
                "history.max_entries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Overlay environment overrides (`QDRANT_URL`, `QDRANT_COLLECTION_NAME`)
    pub fn apply_env(&mut self, credentials: &Credentials) {
        if let Some(url) = &credentials.qdrant_url {
            self.qdrant.url = url.clone();
            if self.qdrant.uses_rest_port() {
                warn!(
                    url = %self.qdrant.url,
                    "QDRANT_URL points at the REST port 6333, the client speaks gRPC on 6334"
                );
            }
        }
        if let Some(collection) = &credentials.collection_name {
            self.qdrant.collection = collection.clone();
        }
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get state directory path
    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state_dir)
    }

    /// Chat history file
    pub fn history_path(&self) -> PathBuf {
        self.state_dir().join("history.json")
    }

    /// Readline history file
    pub fn readline_history_path(&self) -> PathBuf {
        self.state_dir().join("readline_history")
    }

    /// Directory holding the reference PDFs
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.ingest.data_dir)
    }
}

impl QdrantConfig {
    /// True when the URL targets Qdrant's REST port rather than gRPC
    pub fn uses_rest_port(&self) -> bool {
        self.url.trim_end_matches('/').ends_with(":6333")
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WebSearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Environment variables that must be set before serving queries
pub const REQUIRED_ENV_KEYS: [&str; 5] = [
    "QDRANT_URL",
    "QDRANT_API_KEY",
    "GROQ_API_KEY",
    "TAVILY_API_KEY",
    "COHERE_API_KEY",
];

/// Secrets and endpoint overrides read from the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub cohere_api_key: Option<String>,
    pub collection_name: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            qdrant_url: get("QDRANT_URL"),
            qdrant_api_key: get("QDRANT_API_KEY"),
            groq_api_key: get("GROQ_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            cohere_api_key: get("COHERE_API_KEY"),
            collection_name: get("QDRANT_COLLECTION_NAME"),
        }
    }

    /// Value for one of [`REQUIRED_ENV_KEYS`]
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "QDRANT_URL" => self.qdrant_url.as_deref(),
            "QDRANT_API_KEY" => self.qdrant_api_key.as_deref(),
            "GROQ_API_KEY" => self.groq_api_key.as_deref(),
            "TAVILY_API_KEY" => self.tavily_api_key.as_deref(),
            "COHERE_API_KEY" => self.cohere_api_key.as_deref(),
            "QDRANT_COLLECTION_NAME" => self.collection_name.as_deref(),
            _ => None,
        }
    }

    /// Required keys that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_ENV_KEYS
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect()
    }

    /// Fetch a required key or fail with `MissingCredential`
    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| AssistantError::MissingCredential(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.qdrant.collection, "Medical");
        assert_eq!(config.pipeline.passage_limit, 5);
        assert_eq!(config.pipeline.web_limit, 3);
        assert_eq!(config.pipeline.augmentation_limit, 2);
        assert_eq!(config.pipeline.score_threshold, 6.0);
        assert_eq!(
            config.pipeline.augmentation_suffix,
            "detailed medical information treatment"
        );
        assert_eq!(config.history.max_entries, 20);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_dimension_mismatch() {
        let mut config = Config::default();
        config.qdrant.vector_size = 768;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_overlap() {
        let mut config = Config::default();
        config.ingest.chunk_overlap = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_temperature() {
        let mut config = Config::default();
        config.critic.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            score_threshold = 5.0

            [qdrant]
            collection = "Cardiology"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.score_threshold, 5.0);
        assert_eq!(config.pipeline.passage_limit, 5);
        assert_eq!(config.qdrant.collection, "Cardiology");
        assert_eq!(config.qdrant.vector_size, 384);
        assert_eq!(config.generation.max_tokens, 1200);
    }

    #[test]
    fn test_rendered_config_reloads() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.pipeline.web_limit = 4;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path("~/.medirag");
        assert!(!expanded.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let expanded = Config::expand_path("/absolute/path");
        assert_eq!(expanded.to_string_lossy(), "/absolute/path");
    }

    #[test]
    fn test_credentials_missing_keys() {
        let env: HashMap<&str, &str> = [("QDRANT_URL", "http://q:6334"), ("GROQ_API_KEY", "  ")]
            .into_iter()
            .collect();
        let credentials = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        let missing = credentials.missing();
        assert!(!missing.contains(&"QDRANT_URL"));
        assert!(missing.contains(&"GROQ_API_KEY"));
        assert!(missing.contains(&"COHERE_API_KEY"));
        assert_eq!(missing.len(), 4);
        assert!(credentials.require("TAVILY_API_KEY").is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let credentials = Credentials {
            qdrant_url: Some("https://cloud.qdrant.io:6334".to_string()),
            collection_name: Some("Oncology".to_string()),
            ..Default::default()
        };

        let mut config = Config::default();
        config.apply_env(&credentials);

        assert_eq!(config.qdrant.url, "https://cloud.qdrant.io:6334");
        assert_eq!(config.qdrant.collection, "Oncology");
    }

    #[test]
    fn test_rest_port_detection() {
        let mut config = Config::default();
        assert!(!config.qdrant.uses_rest_port());

        let credentials = Credentials {
            qdrant_url: Some("https://cloud.qdrant.io:6333/".to_string()),
            ..Default::default()
        };
        config.apply_env(&credentials);

        assert_eq!(config.qdrant.url, "https://cloud.qdrant.io:6333/");
        assert!(config.qdrant.uses_rest_port());
    }
}
