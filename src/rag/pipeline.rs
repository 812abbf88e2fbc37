//! Query orchestration
//!
//! One resolution runs: concurrent literature and web retrieval, a first
//! draft, a critique of that draft, and, when the critique asks for it, a
//! second web search and a regenerated answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::cli::config::{Config, PipelineConfig};
use crate::errors::{AssistantError, Result};
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::critic::Critic;
use crate::rag::generator::{canned_reply, Generator};
use crate::services::{LanguageModel, VectorStore, WebSearch};
use crate::telemetry::{PipelineEvent, Stage, TelemetryCollector};
use crate::types::{QueryResult, Service, ServiceNotice};

/// Fixed answer for a resolution that failed outright
pub const DEGRADED_RESPONSE: &str = "I encountered an error while processing your query.";

/// End-to-end query pipeline
#[derive(Clone)]
pub struct QueryOrchestrator {
    vector_store: Arc<dyn VectorStore>,
    web_search: Arc<dyn WebSearch>,
    generator: Generator,
    critic: Critic,
    config: PipelineConfig,
    telemetry: Option<TelemetryCollector>,
}

impl QueryOrchestrator {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        web_search: Arc<dyn WebSearch>,
        generator: Generator,
        critic: Critic,
        config: PipelineConfig,
    ) -> Self {
        Self {
            vector_store,
            web_search,
            generator,
            critic,
            config,
            telemetry: None,
        }
    }

    /// Wire the pipeline from configuration
    pub fn from_config(
        config: &Config,
        vector_store: Arc<dyn VectorStore>,
        web_search: Arc<dyn WebSearch>,
        generation_model: Arc<dyn LanguageModel>,
        critic_model: Arc<dyn LanguageModel>,
    ) -> Self {
        let context = ContextBuilder::with_config(ContextConfig::from(&config.pipeline));
        let generator = Generator::new(generation_model, context)
            .with_limits(config.generation.max_tokens, config.generation.temperature);
        let critic = Critic::new(critic_model)
            .with_limits(config.critic.max_tokens, config.critic.temperature);

        Self::new(
            vector_store,
            web_search,
            generator,
            critic,
            config.pipeline.clone(),
        )
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Answer a query. Never fails: errors and panics inside the pipeline
    /// produce a degraded result.
    pub async fn resolve(&self, query: &str) -> QueryResult {
        let start = Instant::now();
        let pipeline = self.clone();
        let owned_query = query.to_string();

        let outcome = tokio::spawn(async move { pipeline.run(&owned_query, start).await }).await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(error = %e, "query pipeline failed");
                QueryResult::degraded(query.trim(), DEGRADED_RESPONSE, start.elapsed())
            }
            Err(join_error) => {
                error!(error = %join_error, "query pipeline task aborted");
                QueryResult::degraded(query.trim(), DEGRADED_RESPONSE, start.elapsed())
            }
        };

        self.record(PipelineEvent::QueryCompleted {
            duration_ms: result.processing_time.as_millis() as u64,
            score: result.verdict.as_ref().map(|v| v.score),
            degraded: result.final_response == DEGRADED_RESPONSE,
            timestamp: Instant::now(),
        });
        result
    }

    async fn run(&self, query: &str, start: Instant) -> Result<QueryResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidQuery("empty query".to_string()));
        }

        if let Some(reply) = canned_reply(query) {
            debug!("canned reply, skipping retrieval");
            return Ok(QueryResult::canned(query, reply, start.elapsed()));
        }

        let mut notices = Vec::new();

        // Literature and web retrieval run concurrently
        let stage_start = Instant::now();
        let (passages, web_results) = tokio::join!(
            self.vector_store.search(query, self.config.passage_limit),
            self.web_search.search(query, self.config.web_limit),
        );
        let passages = self.or_empty(passages, Service::VectorStore, &mut notices);
        let mut web_results = self.or_empty(web_results, Service::WebSearch, &mut notices);
        self.stage_done(Stage::Retrieval, stage_start.elapsed());
        info!(
            passages = passages.len(),
            web_results = web_results.len(),
            "context retrieved"
        );

        let stage_start = Instant::now();
        let draft = self.generator.generate(query, &passages, &web_results).await;
        self.stage_done(Stage::Generation, stage_start.elapsed());

        let stage_start = Instant::now();
        let verdict = self
            .critic
            .evaluate(query, &draft, &passages, &web_results)
            .await;
        self.stage_done(Stage::Critique, stage_start.elapsed());
        info!(
            score = verdict.score,
            needs_more_info = verdict.needs_more_info,
            "draft evaluated"
        );

        let mut final_response = draft.clone();
        let augmented = verdict.requests_augmentation(self.config.score_threshold);
        if augmented {
            self.record(PipelineEvent::AugmentationTriggered {
                score: verdict.score,
                timestamp: Instant::now(),
            });

            let stage_start = Instant::now();
            let augmentation_query = format!("{} {}", query, self.config.augmentation_suffix);
            let extra = self
                .web_search
                .search(&augmentation_query, self.config.augmentation_limit)
                .await;
            let extra = self.or_empty(extra, Service::AugmentationSearch, &mut notices);
            info!(extra_results = extra.len(), "augmentation search complete");
            web_results.extend(extra);

            final_response = self.generator.generate(query, &passages, &web_results).await;
            self.stage_done(Stage::Augmentation, stage_start.elapsed());
        }

        Ok(QueryResult {
            query: query.to_string(),
            passages,
            web_results,
            draft_response: draft,
            final_response,
            critic_score: verdict.score,
            verdict: Some(verdict),
            augmented,
            notices,
            processing_time: start.elapsed(),
        })
    }

    /// Replace a failed collaborator result with an empty sequence and note it
    fn or_empty<T>(
        &self,
        result: Result<Vec<T>>,
        service: Service,
        notices: &mut Vec<ServiceNotice>,
    ) -> Vec<T> {
        match result {
            Ok(items) => items,
            Err(e) => {
                warn!(service = service.as_str(), error = %e, "service call failed, continuing without it");
                self.record(PipelineEvent::ServiceDegraded {
                    service,
                    reason: e.to_string(),
                    timestamp: Instant::now(),
                });
                notices.push(ServiceNotice {
                    service,
                    reason: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn record(&self, event: PipelineEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }

    fn stage_done(&self, stage: Stage, duration: Duration) {
        debug!(stage = stage.as_str(), elapsed_ms = duration.as_millis() as u64, "stage complete");
        if let Some(telemetry) = &self.telemetry {
            telemetry.stage_completed(stage, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CompletionRequest;
    use crate::types::{RetrievedPassage, WebResult};
    use async_trait::async_trait;

    struct PanickingStore;

    #[async_trait]
    impl VectorStore for PanickingStore {
        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<RetrievedPassage>> {
            panic!("index corrupted");
        }

        async fn count(&self) -> Result<u64> {
            Ok(0)
        }
    }

    struct NoWeb;

    #[async_trait]
    impl WebSearch for NoWeb {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebResult>> {
            Ok(Vec::new())
        }
    }

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Ok(r#"{"score": 9, "needs_more_info": false}"#.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn orchestrator(store: Arc<dyn VectorStore>) -> QueryOrchestrator {
        QueryOrchestrator::from_config(
            &Config::default(),
            store,
            Arc::new(NoWeb),
            Arc::new(Echo),
            Arc::new(Echo),
        )
    }

    #[tokio::test]
    async fn test_panic_becomes_degraded_result() {
        let telemetry = TelemetryCollector::new();
        let result = orchestrator(Arc::new(PanickingStore))
            .with_telemetry(telemetry.clone())
            .resolve("What causes asthma?")
            .await;

        assert_eq!(result.final_response, DEGRADED_RESPONSE);
        assert_eq!(result.draft_response, DEGRADED_RESPONSE);
        assert_eq!(result.critic_score, 0.0);
        assert!(result.passages.is_empty());
        assert_eq!(telemetry.get_stats().failed_queries, 1);
    }

    #[tokio::test]
    async fn test_empty_query_is_degraded() {
        let result = orchestrator(Arc::new(PanickingStore)).resolve("   ").await;
        assert_eq!(result.final_response, DEGRADED_RESPONSE);
        assert!(result.verdict.is_none());
    }

    #[tokio::test]
    async fn test_canned_reply_is_not_scored() {
        let telemetry = TelemetryCollector::new();
        let pipeline = orchestrator(Arc::new(PanickingStore)).with_telemetry(telemetry.clone());
        pipeline.resolve("hello").await;

        let stats = telemetry.get_stats();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.scored_queries, 0);
        assert_eq!(stats.failed_queries, 0);
    }

    #[tokio::test]
    async fn test_canned_reply_short_circuits() {
        let result = orchestrator(Arc::new(PanickingStore)).resolve(" Hello ").await;
        assert_eq!(result.query, "Hello");
        assert_eq!(result.final_response, crate::rag::generator::GREETING_REPLY);
        assert_eq!(result.critic_score, 0.0);
        assert!(!result.augmented);
    }
}
