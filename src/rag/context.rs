//! Context builder for answer prompts
use serde::{Deserialize, Serialize};

use crate::cli::config::PipelineConfig;
use crate::types::{RetrievedPassage, WebResult};

/// Text used when neither source produced anything
pub const NO_CONTEXT: &str =
    "No specific context found. Providing general medical knowledge response.\n\n";

/// Context assembly configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Items taken from each source
    pub max_items: usize,
    /// Characters kept from each item's text
    pub max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_items: 3,
            max_chars: 800,
        }
    }
}

impl From<&PipelineConfig> for ContextConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_items: config.context_items,
            max_chars: config.context_chars,
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context section
    pub text: String,
    /// Passages included
    pub passage_count: usize,
    /// Web results included
    pub web_count: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.passage_count == 0 && self.web_count == 0
    }
}

/// Context builder for assembling the literature and web sections
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build the context section from passages and web results
    pub fn build(&self, passages: &[RetrievedPassage], web_results: &[WebResult]) -> AssembledContext {
        let literature: Vec<String> = passages
            .iter()
            .take(self.config.max_items)
            .map(|p| self.format_passage(p))
            .collect();
        let web: Vec<String> = web_results
            .iter()
            .take(self.config.max_items)
            .map(|w| self.format_web_result(w))
            .collect();

        let mut text = String::new();
        if !literature.is_empty() {
            text.push_str(&format!("MEDICAL LITERATURE:\n{}\n\n", literature.join("\n\n")));
        }
        if !web.is_empty() {
            text.push_str(&format!("CURRENT WEB INFORMATION:\n{}\n\n", web.join("\n\n")));
        }
        if text.is_empty() {
            text.push_str(NO_CONTEXT);
        }

        AssembledContext {
            text,
            passage_count: literature.len(),
            web_count: web.len(),
        }
    }

    fn format_passage(&self, passage: &RetrievedPassage) -> String {
        format!(
            "Medical Document - {} (Page {}):\n{}...",
            passage.source,
            passage.page,
            truncate_chars(&passage.text, self.config.max_chars)
        )
    }

    fn format_web_result(&self, result: &WebResult) -> String {
        format!(
            "Web Source - {}:\n{}...",
            result.title,
            truncate_chars(&result.content, self.config.max_chars)
        )
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

/// First `max` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, page: u32) -> RetrievedPassage {
        RetrievedPassage {
            text: text.to_string(),
            source: "Standard_Treatment_Guidelines.pdf".to_string(),
            page,
            score: 0.9,
            chunk_id: Some(0),
        }
    }

    fn web(title: &str, content: &str) -> WebResult {
        WebResult {
            title: title.to_string(),
            content: content.to_string(),
            url: "https://medlineplus.gov".to_string(),
            score: 0.7,
        }
    }

    #[test]
    fn test_no_context() {
        let context = ContextBuilder::new().build(&[], &[]);
        assert!(context.is_empty());
        assert_eq!(context.text, NO_CONTEXT);
    }

    #[test]
    fn test_literature_only() {
        let context = ContextBuilder::new().build(&[passage("Use a spacer.", 14)], &[]);
        assert_eq!(
            context.text,
            "MEDICAL LITERATURE:\nMedical Document - Standard_Treatment_Guidelines.pdf (Page 14):\nUse a spacer....\n\n"
        );
        assert_eq!(context.passage_count, 1);
        assert_eq!(context.web_count, 0);
    }

    #[test]
    fn test_both_sections_in_order() {
        let context = ContextBuilder::new().build(
            &[passage("A", 1), passage("B", 2)],
            &[web("Asthma - Mayo Clinic", "Wheezing")],
        );
        let literature = context.text.find("MEDICAL LITERATURE:").unwrap();
        let web_section = context.text.find("CURRENT WEB INFORMATION:").unwrap();
        assert!(literature < web_section);
        assert!(context.text.contains("Medical Document - Standard_Treatment_Guidelines.pdf (Page 1):\nA...\n\nMedical Document"));
        assert!(context.text.contains("Web Source - Asthma - Mayo Clinic:\nWheezing..."));
    }

    #[test]
    fn test_item_and_length_caps() {
        let long = "x".repeat(1000);
        let passages: Vec<_> = (1..=5).map(|p| passage(&long, p)).collect();
        let context = ContextBuilder::new().build(&passages, &[]);

        assert_eq!(context.passage_count, 3);
        assert!(context.text.contains("(Page 3)"));
        assert!(!context.text.contains("(Page 4)"));
        assert!(context.text.contains(&format!("{}...", "x".repeat(800))));
        assert!(!context.text.contains(&"x".repeat(801)));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("ééé", 2), "éé");
        assert_eq!(truncate_chars("ab", 5), "ab");
        assert_eq!(truncate_chars("ab", 0), "");
    }
}
