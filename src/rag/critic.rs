//! Answer evaluation
//!
//! Asks the language model to grade a draft answer against a weighted
//! rubric and parses the JSON verdict. Evaluation never fails: an
//! unparseable verdict and a failed call each map to a fixed fallback.

use crate::cli::config::CriticConfig;
use crate::services::{CompletionRequest, LanguageModel};
use crate::types::{CriticVerdict, RetrievedPassage, VerdictSource, WebResult};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Critic {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
    temperature: f32,
}

impl Critic {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        let defaults = CriticConfig::default();
        Self {
            model,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn build_prompt(
        &self,
        query: &str,
        answer: &str,
        passages: &[RetrievedPassage],
        web_results: &[WebResult],
    ) -> String {
        format!(
            r#"You are a medical response critic. Evaluate the quality of this medical response on a scale of 1-10.

USER QUERY: {query}

RESPONSE TO EVALUATE: {answer}

AVAILABLE CONTEXT:
- Vector DB results: {passages} medical documents
- Web search results: {web} articles

Evaluate based on:
1. Medical accuracy (30%)
2. Completeness of answer (25%)
3. Clarity and understandability (20%)
4. Appropriate use of context (15%)
5. Proper medical disclaimers (10%)

Provide your evaluation as a JSON object:
{{
    "score": <score_1_to_10>,
    "reasoning": "<brief_explanation>",
    "needs_more_info": <true/false>,
    "suggestions": "<improvement_suggestions>"
}}
"#,
            query = query,
            answer = answer,
            passages = passages.len(),
            web = web_results.len(),
        )
    }

    pub async fn evaluate(
        &self,
        query: &str,
        answer: &str,
        passages: &[RetrievedPassage],
        web_results: &[WebResult],
    ) -> CriticVerdict {
        let request = CompletionRequest::new(
            self.build_prompt(query, answer, passages, web_results),
            self.max_tokens,
            self.temperature,
        );

        let output = match self.model.complete(request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "evaluation call failed");
                return CriticVerdict::call_fallback();
            }
        };

        match parse_verdict(&output) {
            Some(verdict) => {
                debug!(
                    score = verdict.score,
                    needs_more_info = verdict.needs_more_info,
                    "answer evaluated"
                );
                verdict
            }
            None => {
                warn!(chars = output.len(), "could not parse evaluation");
                CriticVerdict::parse_fallback()
            }
        }
    }
}

/// Parse the model's JSON verdict. Surrounding whitespace and one markdown
/// code fence are accepted; missing fields take zero values.
pub fn parse_verdict(output: &str) -> Option<CriticVerdict> {
    let body = strip_code_fence(output.trim());
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    let score = match object.get("score") {
        Some(JsonValue::Number(n)) => n.as_f64()?,
        Some(JsonValue::String(s)) => s.trim().parse().ok()?,
        Some(JsonValue::Null) | None => 0.0,
        Some(_) => return None,
    };

    let needs_more_info = match object.get("needs_more_info") {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    Some(CriticVerdict {
        score,
        reasoning: text_field(object.get("reasoning")),
        needs_more_info,
        suggestions: text_field(object.get("suggestions")),
        source: VerdictSource::Model,
    })
}

fn text_field(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
