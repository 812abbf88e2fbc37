//! Terminal output for answers, banners and progress

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::rag::context::truncate_chars;
use crate::types::{QueryResult, VerdictSource};

/// Display manager for chat output
pub struct DisplayManager {
    show_progress: bool,
    show_details: bool,
    update_interval: Duration,
}

impl DisplayManager {
    pub fn new(show_progress: bool, show_details: bool) -> Self {
        DisplayManager {
            show_progress,
            show_details,
            update_interval: Duration::from_millis(100),
        }
    }

    /// Show welcome banner
    pub fn show_banner(&self, version: &str, model: &str, documents: Option<u64>) {
        let width = 64;
        let documents = documents
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!("\n{}", "=".repeat(width).cyan());
        println!(
            "{}",
            format!("  MediRAG {} - Medical Question Answering", version)
                .bold()
                .cyan()
        );
        println!(
            "{}",
            format!("  Model: {} | Indexed passages: {}", model, documents).dimmed()
        );
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Ask a medical question (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while a query resolves
    pub fn start_query(&self, query: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Researching... {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(truncate_chars(query, 50).to_string());
        pb.enable_steady_tick(self.update_interval);
        Some(pb)
    }

    pub fn finish_query(&self, progress: Option<ProgressBar>) {
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    }

    /// Render an answer with its score and sources
    pub fn show_answer(&self, result: &QueryResult) {
        println!("\n{}\n", result.final_response);

        let footer = format!(
            "Score: {:.1}/10 | {:.1}s{}",
            result.critic_score,
            result.processing_secs(),
            if result.augmented { " | augmented" } else { "" }
        );
        println!("{}", footer.dimmed());

        for notice in &result.notices {
            self.show_warning(&format!(
                "{} unavailable: {}",
                notice.service.as_str(),
                notice.reason
            ));
        }

        if self.show_details {
            self.show_sources(result);
        }
        println!();
    }

    fn show_sources(&self, result: &QueryResult) {
        if let Some(verdict) = &result.verdict {
            let origin = match verdict.source {
                VerdictSource::Model => "model",
                VerdictSource::ParseFallback => "parse fallback",
                VerdictSource::CallFallback => "call fallback",
            };
            println!(
                "{} {} ({})",
                "Evaluation:".bold(),
                verdict.reasoning,
                origin.dimmed()
            );
            if !verdict.suggestions.is_empty() {
                println!("{} {}", "Suggestions:".bold(), verdict.suggestions);
            }
        }

        if !result.passages.is_empty() {
            println!("{}", "Medical literature:".bold());
            for passage in &result.passages {
                println!(
                    "  {} {} (page {}) {}",
                    "•".cyan(),
                    passage.source,
                    passage.page,
                    format!("[{:.2}]", passage.score).dimmed()
                );
            }
        }

        if !result.web_results.is_empty() {
            println!("{}", "Web sources:".bold());
            for web in &result.web_results {
                println!("  {} {} {}", "•".cyan(), web.title, web.url.dimmed());
            }
        }
    }

    pub fn show_error(&self, error: &str) {
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_info(&self, info: &str) {
        println!("{} {}", "ℹ".blue(), info);
    }

    pub fn show_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(true, false)
    }
}
