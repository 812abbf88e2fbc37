//! Integration tests for the query pipeline
//!
//! Every collaborator is a scripted double, so these run without network
//! access and count exactly how often each service is called.

use async_trait::async_trait;
use medirag::{
    cli::Config,
    errors::{AssistantError, Result},
    rag::{QueryOrchestrator, APOLOGY, DEGRADED_RESPONSE, GREETING_REPLY},
    services::{CompletionRequest, LanguageModel, VectorStore, WebSearch},
    telemetry::TelemetryCollector,
    types::{RetrievedPassage, Service, VerdictSource, WebResult},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

const ASTHMA: &str = "What are the symptoms of asthma?";

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct StubStore {
    passages: Option<Vec<RetrievedPassage>>,
    calls: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
}

impl StubStore {
    fn with(passages: Vec<RetrievedPassage>) -> Arc<Self> {
        Arc::new(Self {
            passages: Some(passages),
            calls: AtomicUsize::new(0),
            barrier: None,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            passages: None,
            calls: AtomicUsize::new(0),
            barrier: None,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for StubStore {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<RetrievedPassage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        match &self.passages {
            Some(passages) => Ok(passages.iter().take(limit).cloned().collect()),
            None => Err(AssistantError::VectorStoreError("connection refused".to_string())),
        }
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.passages.as_ref().map(|p| p.len() as u64).unwrap_or(0))
    }
}

/// Web search that answers each call from a script and records the queries
struct ScriptedWeb {
    script: Mutex<VecDeque<Option<Vec<WebResult>>>>,
    queries: Mutex<Vec<(String, usize)>>,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedWeb {
    fn new(script: Vec<Option<Vec<WebResult>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            queries: Mutex::new(Vec::new()),
            barrier: None,
        })
    }

    fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for ScriptedWeb {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let next = self.script.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| AssistantError::Timeout { duration_ms: 30_000 })
    }
}

/// Language model replying from a script; `None` entries fail the call
struct ScriptedModel {
    script: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn new(script: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().map(|s| s.map(String::from)).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front().flatten();
        next.ok_or_else(|| AssistantError::ProviderStatus {
            provider: "groq".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn passage(i: u32, text: &str) -> RetrievedPassage {
    RetrievedPassage {
        text: text.to_string(),
        source: "The_Gale_Encyclopedia_Of_Medicine.pdf".to_string(),
        page: 100 + i,
        score: 0.9 - i as f32 * 0.05,
        chunk_id: Some(i as i64),
    }
}

fn web(i: usize) -> WebResult {
    WebResult {
        title: format!("Asthma overview {}", i),
        content: "Wheezing, shortness of breath, chest tightness and coughing.".to_string(),
        url: format!("https://www.mayoclinic.org/asthma/{}", i),
        score: 0.8,
    }
}

fn webs(n: usize) -> Vec<WebResult> {
    (0..n).map(web).collect()
}

struct Harness {
    store: Arc<StubStore>,
    web: Arc<ScriptedWeb>,
    generator: Arc<ScriptedModel>,
    critic: Arc<ScriptedModel>,
    orchestrator: QueryOrchestrator,
}

fn harness(
    store: Arc<StubStore>,
    web: Arc<ScriptedWeb>,
    generator: Arc<ScriptedModel>,
    critic: Arc<ScriptedModel>,
) -> Harness {
    let orchestrator = QueryOrchestrator::from_config(
        &Config::default(),
        store.clone(),
        web.clone(),
        generator.clone(),
        critic.clone(),
    );
    Harness {
        store,
        web,
        generator,
        critic,
        orchestrator,
    }
}

fn three_passages() -> Vec<RetrievedPassage> {
    (0..3)
        .map(|i| passage(i, "Asthma causes airway inflammation and narrowing."))
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_good_draft_is_final() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![Some("Asthma symptoms include wheezing.")]),
        ScriptedModel::new(vec![Some(
            r#"{"score": 8, "reasoning": "Accurate", "needs_more_info": false, "suggestions": ""}"#,
        )]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;

    assert_eq!(result.final_response, "Asthma symptoms include wheezing.");
    assert_eq!(result.final_response, result.draft_response);
    assert_eq!(result.critic_score, 8.0);
    assert!(!result.augmented);
    assert_eq!(result.passages.len(), 3);
    assert_eq!(result.web_results.len(), 3);
    assert!(result.notices.is_empty());

    assert_eq!(h.generator.calls(), 1);
    assert_eq!(h.critic.calls(), 1);
    assert_eq!(h.store.calls(), 1);
    assert_eq!(h.web.queries(), vec![(ASTHMA.to_string(), 3)]);
}

#[tokio::test]
async fn test_low_score_triggers_augmentation() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3)), Some(webs(2))]),
        ScriptedModel::new(vec![Some("Short draft."), Some("Detailed final answer.")]),
        ScriptedModel::new(vec![Some(
            r#"{"score": 4, "reasoning": "Incomplete", "needs_more_info": true, "suggestions": "Add treatment"}"#,
        )]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;

    assert!(result.augmented);
    assert_eq!(result.draft_response, "Short draft.");
    assert_eq!(result.final_response, "Detailed final answer.");
    assert_eq!(result.critic_score, 4.0);
    assert_eq!(result.web_results.len(), 5);

    let queries = h.web.queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[1],
        (
            format!("{} detailed medical information treatment", ASTHMA),
            2
        )
    );

    assert_eq!(h.generator.calls(), 2);
    // The second answer is not critiqued again
    assert_eq!(h.critic.calls(), 1);
    // The regenerated prompt sees the extended web context
    let second = h.generator.request(1);
    assert!(second.user.contains("CURRENT WEB INFORMATION:"));
}

#[tokio::test]
async fn test_passing_score_ignores_needs_more_info() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![Some("Answer.")]),
        ScriptedModel::new(vec![Some(r#"{"score": 6, "needs_more_info": true}"#)]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;

    assert!(!result.augmented);
    assert_eq!(h.web.queries().len(), 1);
    assert_eq!(h.generator.calls(), 1);
    assert_eq!(result.web_results.len(), 3);
}

#[tokio::test]
async fn test_greeting_short_circuits() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![]),
        ScriptedModel::new(vec![]),
    );

    let result = h.orchestrator.resolve("  HELLO ").await;

    assert_eq!(result.final_response, GREETING_REPLY);
    assert_eq!(result.critic_score, 0.0);
    assert!(result.verdict.is_none());
    assert!(result.passages.is_empty());
    assert!(result.web_results.is_empty());
    assert_eq!(h.store.calls(), 0);
    assert!(h.web.queries().is_empty());
    assert_eq!(h.generator.calls(), 0);
    assert_eq!(h.critic.calls(), 0);
}

#[tokio::test]
async fn test_unparseable_verdict_uses_parse_fallback() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![Some("Answer.")]),
        ScriptedModel::new(vec![Some("I'd rate this an 8 out of 10.")]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;
    let verdict = result.verdict.expect("verdict");

    assert_eq!(verdict.source, VerdictSource::ParseFallback);
    assert_eq!(result.critic_score, 7.0);
    assert_eq!(verdict.reasoning, "Could not parse evaluation");
    assert!(!result.augmented);
}

#[tokio::test]
async fn test_failed_critic_call_uses_call_fallback() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![Some("Answer.")]),
        ScriptedModel::new(vec![None]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;
    let verdict = result.verdict.expect("verdict");

    assert_eq!(verdict.source, VerdictSource::CallFallback);
    assert_eq!(result.critic_score, 5.0);
    assert_eq!(verdict.reasoning, "Evaluation failed");
    assert!(!result.augmented);
}

#[tokio::test]
async fn test_every_service_failing_still_answers() {
    let telemetry = TelemetryCollector::new();
    let h = harness(
        StubStore::failing(),
        ScriptedWeb::new(vec![None]),
        ScriptedModel::new(vec![None]),
        ScriptedModel::new(vec![None]),
    );
    let orchestrator = h.orchestrator.clone().with_telemetry(telemetry.clone());

    let result = orchestrator.resolve(ASTHMA).await;

    assert_eq!(result.query, ASTHMA);
    assert_eq!(result.final_response, APOLOGY);
    assert_eq!(result.draft_response, APOLOGY);
    assert_eq!(result.critic_score, 5.0);
    assert!(result.passages.is_empty());
    assert!(result.web_results.is_empty());
    assert!(result.processing_time >= Duration::ZERO);

    let services: Vec<Service> = result.notices.iter().map(|n| n.service).collect();
    assert_eq!(services, vec![Service::VectorStore, Service::WebSearch]);
    assert!(result.had_service_failures());

    let stats = telemetry.get_stats();
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.service_failures, 2);

    // Without context the prompt says so
    assert!(h
        .generator
        .request(0)
        .user
        .contains("No specific context found. Providing general medical knowledge response."));
}

#[tokio::test]
async fn test_failed_augmentation_search_still_regenerates() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3)), None]),
        ScriptedModel::new(vec![Some("Draft."), Some("Final.")]),
        ScriptedModel::new(vec![Some(r#"{"score": 3, "needs_more_info": true}"#)]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;

    assert!(result.augmented);
    assert_eq!(result.final_response, "Final.");
    assert_eq!(result.web_results.len(), 3);
    assert_eq!(result.notices.len(), 1);
    assert_eq!(result.notices[0].service, Service::AugmentationSearch);
}

#[tokio::test]
async fn test_only_three_passages_reach_the_prompt() {
    let long_text = "Bronchodilators relax airway muscles. ".repeat(40);
    let passages: Vec<_> = (0..5).map(|i| passage(i, &long_text)).collect();
    let h = harness(
        StubStore::with(passages),
        ScriptedWeb::new(vec![Some(webs(3))]),
        ScriptedModel::new(vec![Some("Answer.")]),
        ScriptedModel::new(vec![Some(r#"{"score": 9, "needs_more_info": false}"#)]),
    );

    let result = h.orchestrator.resolve(ASTHMA).await;
    assert_eq!(result.passages.len(), 5);

    let prompt = h.generator.request(0).user;
    assert_eq!(prompt.matches("Medical Document - ").count(), 3);
    assert!(prompt.contains("(Page 102)"));
    assert!(!prompt.contains("(Page 103)"));

    let truncated: String = long_text.chars().take(800).collect();
    assert!(prompt.contains(&format!("{}...", truncated)));
    assert!(!prompt.contains(&long_text[..801]));

    // The critic is told how much context was available
    let critique = h.critic.request(0).user;
    assert!(critique.contains("Vector DB results: 5 medical documents"));
    assert!(critique.contains("Web search results: 3 articles"));
}

#[tokio::test]
async fn test_retrieval_runs_concurrently() {
    // Each side waits for the other; sequential retrieval would never finish
    let barrier = Arc::new(Barrier::new(2));
    let store = Arc::new(StubStore {
        passages: Some(three_passages()),
        calls: AtomicUsize::new(0),
        barrier: Some(barrier.clone()),
    });
    let web = Arc::new(ScriptedWeb {
        script: Mutex::new(vec![Some(webs(3))].into()),
        queries: Mutex::new(Vec::new()),
        barrier: Some(barrier),
    });
    let h = harness(
        store,
        web,
        ScriptedModel::new(vec![Some("Answer.")]),
        ScriptedModel::new(vec![Some(r#"{"score": 9}"#)]),
    );

    let result = tokio::time::timeout(Duration::from_secs(5), h.orchestrator.resolve(ASTHMA))
        .await
        .expect("retrieval deadlocked");
    assert_eq!(result.passages.len(), 3);
    assert_eq!(result.web_results.len(), 3);
}

#[tokio::test]
async fn test_concurrent_resolutions_are_independent() {
    let h = harness(
        StubStore::with(three_passages()),
        ScriptedWeb::new(vec![Some(webs(3)), Some(webs(3))]),
        ScriptedModel::new(vec![Some("A."), Some("B.")]),
        ScriptedModel::new(vec![Some(r#"{"score": 9}"#), Some(r#"{"score": 9}"#)]),
    );

    let (first, second) = tokio::join!(
        h.orchestrator.resolve("What is asthma?"),
        h.orchestrator.resolve("What is diabetes?"),
    );

    assert_eq!(first.query, "What is asthma?");
    assert_eq!(second.query, "What is diabetes?");
    assert_eq!(h.generator.calls(), 2);
    assert_ne!(first.final_response, DEGRADED_RESPONSE);
    assert_ne!(second.final_response, DEGRADED_RESPONSE);
}
