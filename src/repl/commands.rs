//! Built-in chat commands

use anyhow::Result;
use colored::*;

use crate::session::ChatHistory;
use crate::telemetry::TelemetryCollector;

/// REPL command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    History { limit: Option<usize> },
    Clear,
    Stats,
    Exit,
    Unknown { input: String },
}

/// Whether the REPL keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Command::Unknown {
            input: input.to_string(),
        };
    };

    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return Command::Unknown {
            input: input.to_string(),
        };
    };

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "history" => Command::History {
            limit: parts.get(1).and_then(|s| s.parse().ok()),
        },
        "clear" => Command::Clear,
        "stats" => Command::Stats,
        "exit" | "quit" | "q" => Command::Exit,
        _ => Command::Unknown {
            input: input.to_string(),
        },
    }
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim().starts_with('/')
}

/// Execute a command against the session state
pub fn execute(
    command: Command,
    history: &mut ChatHistory,
    telemetry: &TelemetryCollector,
) -> Result<Flow> {
    match command {
        Command::Help => show_help(),
        Command::History { limit } => show_history(history, limit.unwrap_or(10)),
        Command::Clear => {
            history.clear()?;
            println!("{}", "Chat history cleared.".green());
        }
        Command::Stats => show_stats(telemetry),
        Command::Exit => {
            println!("{}", "Goodbye!".green());
            return Ok(Flow::Exit);
        }
        Command::Unknown { input } => {
            println!("{}", format!("Unknown command: {}", input).red());
            println!("Type {} for available commands", "/help".cyan());
        }
    }
    Ok(Flow::Continue)
}

fn show_help() {
    println!("\n{}", "Available Commands:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());

    let commands = [
        ("/help, /h", "Show this help message"),
        ("/history [n]", "Show the last n questions (default: 10)"),
        ("/clear", "Clear chat history"),
        ("/stats", "Show session statistics"),
        ("/exit, /quit, /q", "Exit"),
    ];

    for (cmd, desc) in commands {
        println!("  {:<20} {}", cmd.green(), desc);
    }

    println!("\n{}", "Usage:".bold());
    println!("  Type a medical question directly (no / prefix)");
    println!("  Press {} or type {} to exit", "Ctrl-D".cyan(), "/exit".cyan());
    println!();
}

fn show_history(history: &ChatHistory, limit: usize) {
    let recent = history.recent(limit);
    if recent.is_empty() {
        println!("{}", "No questions in history yet.".yellow());
        return;
    }

    println!(
        "\n{}",
        format!("Chat History (last {}):", recent.len()).bold().cyan()
    );
    println!("{}", "=".repeat(60).cyan());

    for (i, entry) in recent.iter().enumerate() {
        let index = recent.len() - i;
        println!(
            "  {}. [{}] {} {}",
            index.to_string().cyan(),
            entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
            entry.query,
            format!("(score: {:.1})", entry.score).dimmed()
        );
    }
    println!();
}

fn show_stats(telemetry: &TelemetryCollector) {
    let stats = telemetry.get_stats();
    let elapsed = telemetry.elapsed().as_secs();

    println!("\n{}", "Session Statistics:".bold().cyan());
    println!("{}", "=".repeat(60).cyan());
    println!("  Duration:          {}m {}s", elapsed / 60, elapsed % 60);
    println!("  Questions:         {}", stats.queries.to_string().green());
    println!("  Failed:            {}", stats.failed_queries);
    println!(
        "  Average time:      {:.1}s",
        stats.average_query_ms() as f64 / 1000.0
    );
    match stats.average_score() {
        Some(score) => println!("  Average score:     {:.1}/10", score),
        None => println!("  Average score:     n/a"),
    }
    println!(
        "  Augmented:         {} ({:.0}%)",
        stats.augmentations,
        stats.augmentation_rate() * 100.0
    );
    println!("  Service failures:  {}", stats.service_failures);

    for (stage, avg_ms) in telemetry.stage_averages() {
        println!("  {:<18} {}ms avg", format!("{}:", stage.as_str()), avg_ms);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::HistoryEntry;
    use chrono::Utc;

    #[test]
    fn test_is_command() {
        assert!(is_command("/help"));
        assert!(is_command(" /stats"));
        assert!(!is_command("what helps a headache?"));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/h"), Command::Help);
        assert_eq!(parse("/history"), Command::History { limit: None });
        assert_eq!(parse("/history 5"), Command::History { limit: Some(5) });
        assert_eq!(parse("/clear"), Command::Clear);
        assert_eq!(parse("/STATS"), Command::Stats);
        assert_eq!(parse("/quit"), Command::Exit);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(parse("/files"), Command::Unknown { .. }));
        assert!(matches!(parse("/"), Command::Unknown { .. }));
        assert!(matches!(parse("asthma"), Command::Unknown { .. }));
    }

    #[test]
    fn test_execute_exit_and_clear() {
        let mut history = ChatHistory::new(20);
        history.push_entry(HistoryEntry {
            query: "q".to_string(),
            response: "r".to_string(),
            score: 7.0,
            timestamp: Utc::now(),
        });
        let telemetry = TelemetryCollector::new();

        assert_eq!(
            execute(Command::Clear, &mut history, &telemetry).unwrap(),
            Flow::Continue
        );
        assert!(history.is_empty());
        assert_eq!(
            execute(Command::Exit, &mut history, &telemetry).unwrap(),
            Flow::Exit
        );
    }
}
