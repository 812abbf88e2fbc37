// Chat history with disk persistence
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::QueryResult;

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    pub response: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_result(result: &QueryResult) -> Self {
        Self {
            query: result.query.clone(),
            response: result.final_response.clone(),
            score: result.critic_score,
            timestamp: Utc::now(),
        }
    }
}

/// Most recent exchanges, oldest first, capped at `max_entries`
#[derive(Debug, Clone)]
pub struct ChatHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    path: Option<PathBuf>,
}

impl ChatHistory {
    /// In-memory history
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            path: None,
        }
    }

    /// History backed by a JSON file; a missing file starts empty
    pub fn load(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let path = path.into();
        let mut history = Self {
            entries: VecDeque::new(),
            max_entries,
            path: Some(path.clone()),
        };

        if path.exists() {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read history file {}", path.display()))?;
            let entries: Vec<HistoryEntry> =
                serde_json::from_str(&json).context("Failed to deserialize history")?;
            for entry in entries {
                history.push_entry(entry);
            }
        }

        Ok(history)
    }

    /// Append an entry, dropping the oldest beyond the cap
    pub fn push_entry(&mut self, entry: HistoryEntry) {
        if self.max_entries == 0 {
            return;
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn record(&mut self, result: &QueryResult) {
        self.push_entry(HistoryEntry::from_result(result));
    }

    /// Write to the backing file, if any
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create history directory")?;
        }

        let entries: Vec<&HistoryEntry> = self.entries.iter().collect();
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize history")?;
        fs::write(path, json).context("Failed to write history file")?;
        Ok(())
    }

    /// Forget every entry, including the saved copy
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Up to `n` most recent entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
