//! Interactive chat loop
//!
//! Reads questions with rustyline, resolves them through the query
//! pipeline and keeps a persistent history of the exchanges.

pub mod commands;
pub mod display;
pub mod input;

use anyhow::Result;
use tracing::warn;

use crate::rag::QueryOrchestrator;
use crate::session::ChatHistory;
use crate::telemetry::TelemetryCollector;
use crate::types::QueryResult;

pub use commands::{is_command, Command, Flow};
pub use display::DisplayManager;
pub use input::{InputEvent, InputHandler};

/// Prompt shown for blank input
pub const EMPTY_QUESTION: &str = "Please enter a medical question.";

/// Chat session coordinator
pub struct ChatSession {
    input: InputHandler,
    display: DisplayManager,
    history: ChatHistory,
    orchestrator: QueryOrchestrator,
    telemetry: TelemetryCollector,
}

impl ChatSession {
    pub fn new(
        input: InputHandler,
        display: DisplayManager,
        history: ChatHistory,
        orchestrator: QueryOrchestrator,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            input,
            display,
            history,
            orchestrator,
            telemetry,
        }
    }

    /// Run until `/exit`, Ctrl-D or a second Ctrl-C
    pub async fn run(&mut self, version: &str, model: &str, documents: Option<u64>) -> Result<()> {
        self.display.show_banner(version, model, documents);
        let mut interrupted = false;

        loop {
            match self.input.read_line()? {
                InputEvent::Line(line) => {
                    interrupted = false;
                    if self.handle_line(&line).await? == Flow::Exit {
                        break;
                    }
                }
                InputEvent::Interrupted => {
                    if interrupted {
                        break;
                    }
                    interrupted = true;
                    self.display
                        .show_info("Press Ctrl-C again or type /exit to quit");
                }
                InputEvent::Eof => break,
            }
        }

        self.input.save_history()?;
        self.history.save()?;
        Ok(())
    }

    /// Handle one line of input
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            self.display.show_warning(EMPTY_QUESTION);
            return Ok(Flow::Continue);
        }

        if is_command(line) {
            let command = commands::parse(line);
            return commands::execute(command, &mut self.history, &self.telemetry);
        }

        let result = self.ask(line).await;
        self.display.show_answer(&result);

        self.history.record(&result);
        if let Err(e) = self.history.save() {
            warn!(error = %e, "failed to save chat history");
        }
        Ok(Flow::Continue)
    }

    async fn ask(&self, query: &str) -> QueryResult {
        let progress = self.display.start_query(query);
        let result = self.orchestrator.resolve(query).await;
        self.display.finish_query(progress);
        result
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }
}
