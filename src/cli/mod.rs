//! CLI module for MediRAG
//!
//! Handles command-line argument parsing and configuration management.

pub mod config;
pub mod args;

pub use config::{Config, Credentials, REQUIRED_ENV_KEYS};
pub use args::{Args, Commands, Verbosity};
