//! Command-line argument parsing for MediRAG
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MediRAG - Medical question answering over reference literature and the web
#[derive(Parser, Debug)]
#[command(name = "medirag")]
#[command(version)]
#[command(about = "Retrieval-augmented medical assistant with self-critique", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Answer a single medical question
    Ask {
        /// The question
        #[arg(value_name = "QUERY")]
        query: String,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start interactive chat mode
    Start,

    /// Load, chunk and index the reference PDFs
    Ingest {
        /// Delete and recreate the collection first
        #[arg(long)]
        reset: bool,
    },

    /// Report vector store status
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run system diagnostics and health checks
    Doctor,

    /// Show or clear the chat history
    History {
        /// Remove all history entries
        #[arg(long)]
        clear: bool,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Reject arguments clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::Ask { query, .. }) = &self.command {
            if query.trim().is_empty() {
                return Err("Please enter a medical question.".to_string());
            }
        }

        if self.quiet && self.verbose > 0 {
            return Err("Cannot combine --quiet with --verbose.".to_string());
        }

        Ok(())
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default tracing filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "medirag=info,warn",
            Verbosity::VeryVerbose => "medirag=debug,info",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show sources and stage timings
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
