//! Doctor command - configuration and service health checks
//!
//! Also builds the `status` report, which only looks at the vector store.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::config::{Config, Credentials, REQUIRED_ENV_KEYS};
use crate::services::VectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &str {
        match self {
            Self::Pass => "✓",
            Self::Warning => "⚠",
            Self::Fail => "✗",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            latency_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn print(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ MediRAG System Health Check                           ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");

        for check in &self.checks {
            let latency = check
                .latency_ms
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default();

            println!(
                "  {} {:<24} {}{}",
                check.status.symbol(),
                format!("{}:", check.name),
                check.message,
                latency
            );
        }

        println!();

        if self.is_healthy() {
            println!("  ✓ All checks passed - System is healthy\n");
        } else {
            println!("  ✗ Some checks failed - Fix the items above and run again\n");
        }
    }
}

pub struct Doctor {
    config: Config,
    credentials: Credentials,
    store: Option<Arc<dyn VectorStore>>,
}

impl Doctor {
    /// `store` is `None` when the store client could not be built
    pub fn new(config: Config, credentials: Credentials, store: Option<Arc<dyn VectorStore>>) -> Self {
        Self {
            config,
            credentials,
            store,
        }
    }

    pub async fn run_checks(&self) -> HealthReport {
        let mut checks = self.check_credentials();
        if self.config.qdrant.uses_rest_port() {
            checks.push(HealthCheck::new(
                "Qdrant URL",
                CheckStatus::Warning,
                format!("{} is the REST port, use the gRPC port 6334", self.config.qdrant.url),
            ));
        }
        checks.push(self.check_vector_store().await);
        checks.extend(self.check_data_files());
        HealthReport { checks }
    }

    fn check_credentials(&self) -> Vec<HealthCheck> {
        REQUIRED_ENV_KEYS
            .iter()
            .map(|key| match self.credentials.get(key) {
                Some(_) => HealthCheck::new(*key, CheckStatus::Pass, "Set"),
                None => HealthCheck::new(*key, CheckStatus::Fail, "Missing - export it or add it to .env"),
            })
            .collect()
    }

    async fn check_vector_store(&self) -> HealthCheck {
        let name = format!("Vector store ({})", self.config.qdrant.collection);
        let Some(store) = &self.store else {
            return HealthCheck::new(name, CheckStatus::Fail, "Not configured");
        };

        let start = Instant::now();
        match store.count().await {
            Ok(0) => HealthCheck {
                latency_ms: Some(start.elapsed().as_millis() as u64),
                ..HealthCheck::new(
                    name,
                    CheckStatus::Warning,
                    "Reachable but empty - run: medirag ingest",
                )
            },
            Ok(count) => HealthCheck {
                latency_ms: Some(start.elapsed().as_millis() as u64),
                ..HealthCheck::new(name, CheckStatus::Pass, format!("{} passages indexed", count))
            },
            Err(e) => HealthCheck::new(name, CheckStatus::Fail, format!("Not reachable - {}", e)),
        }
    }

    fn check_data_files(&self) -> Vec<HealthCheck> {
        let data_dir = self.config.data_dir();
        self.config
            .ingest
            .pdf_files
            .iter()
            .map(|file| {
                if data_dir.join(file).exists() {
                    HealthCheck::new(file.as_str(), CheckStatus::Pass, "Found")
                } else {
                    HealthCheck::new(
                        file.as_str(),
                        CheckStatus::Warning,
                        format!("Not found in {}", data_dir.display()),
                    )
                }
            })
            .collect()
    }
}

/// Body of the `status` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl StatusReport {
    pub async fn collect(store: &dyn VectorStore) -> Self {
        let timestamp = Utc::now().to_rfc3339();
        match store.count().await {
            Ok(documents) => Self {
                status: "healthy".to_string(),
                documents: Some(documents),
                error: None,
                timestamp,
            },
            Err(e) => Self::error(e.to_string()),
        }
    }

    /// Report for a store that could not be reached at all
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            documents: None,
            error: Some(message.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
