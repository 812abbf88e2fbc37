//! Answer generation
//!
//! Builds the answer prompt from retrieved context and asks the language
//! model for a plain-text reply. Generation never fails: model errors turn
//! into a fixed apology.

use crate::cli::config::GenerationConfig;
use crate::rag::context::ContextBuilder;
use crate::services::{CompletionRequest, LanguageModel};
use crate::types::{RetrievedPassage, WebResult};
use std::sync::Arc;
use tracing::{debug, warn};

pub const GREETING_REPLY: &str =
    "Hello! I'm here to help you with medical questions. How can I assist you today?";

pub const SMALL_TALK_REPLY: &str =
    "I'm ready to help you with medical information. What would you like to know?";

pub const APOLOGY: &str = "I apologize, but I'm unable to generate a response at this time. Please try again later, or consult with a healthcare professional for medical advice.";

const GREETINGS: [&str; 6] = [
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

const SMALL_TALK: [&str; 4] = ["how are you", "how is it going", "what's up", "how do you do"];

const SYSTEM_PROMPT: &str = r#"You are a medical AI assistant that provides accurate, helpful medical information.
You have access to medical literature and current web information.

FORMATTING RULES:
- Do NOT use Markdown (#, *, **, etc.)
- Do NOT use dashes (-) or underlines (---)
- For lists, only use numbering (1., 2., 3.) or letters (a., b., c.)
- For headings, just write them in normal sentence case (e.g., "Understanding Asthma Triggers")
- Keep the output as clean plain text with paragraphs and numbered/lettered lists only

CONTENT RULES:
1. Provide comprehensive, evidence-based medical information
2. Combine medical literature and current web sources where possible
3. Explain medical terms in simple language
4. Always include a medical disclaimer at the end
5. Be empathetic and professional
"#;

/// Fixed reply for greetings and small talk, if `query` is one
pub fn canned_reply(query: &str) -> Option<&'static str> {
    let normalized = query.trim().to_lowercase();
    if GREETINGS.contains(&normalized.as_str()) {
        Some(GREETING_REPLY)
    } else if SMALL_TALK.contains(&normalized.as_str()) {
        Some(SMALL_TALK_REPLY)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct Generator {
    model: Arc<dyn LanguageModel>,
    context: ContextBuilder,
    max_tokens: u32,
    temperature: f32,
}

impl Generator {
    pub fn new(model: Arc<dyn LanguageModel>, context: ContextBuilder) -> Self {
        let defaults = GenerationConfig::default();
        Self {
            model,
            context,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// The user turn sent to the model
    pub fn build_prompt(
        &self,
        query: &str,
        passages: &[RetrievedPassage],
        web_results: &[WebResult],
    ) -> String {
        let context = self.context.build(passages, web_results);
        format!(
            "Medical Query: {}\n\nAVAILABLE CONTEXT:\n{}\n\nPlease provide a comprehensive plain-text response that:\n1. Answers the query directly\n2. Uses numbered or alphabetic lists (1., 2., 3. or a., b., c.)\n3. Avoids markdown, underlines, and dashes\n4. Explains complex terms simply\n5. Includes a disclaimer and suggests consulting a doctor if needed\n\nResponse:",
            query, context.text
        )
    }

    pub async fn generate(
        &self,
        query: &str,
        passages: &[RetrievedPassage],
        web_results: &[WebResult],
    ) -> String {
        if let Some(reply) = canned_reply(query) {
            return reply.to_string();
        }

        let request = CompletionRequest::new(
            self.build_prompt(query, passages, web_results),
            self.max_tokens,
            self.temperature,
        )
        .with_system(SYSTEM_PROMPT);

        match self.model.complete(request).await {
            Ok(text) => {
                debug!(chars = text.len(), "answer generated");
                text.trim().to_string()
            }
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                APOLOGY.to_string()
            }
        }
    }
}
