//! Execution context shared across agents.
//!
//! The context carries everything agents read and write while a plan runs:
//! the conversation history visible to later tasks, the named artifacts
//! agents produce, and free-form shared state. `fork()` yields a fully
//! independent copy, which is what isolates delegated sub-tasks from their
//! caller; `diff_from`/`apply` let parallel workers hand their changes back
//! to the scheduler instead of mutating shared containers directly.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CoreConfig;

/// A single conversation-history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Agent that produced the entry.
    pub agent: String,
    /// Summary content.
    pub content: String,
    /// When the entry was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            content: content.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Bounded conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    entries: Vec<HistoryEntry>,
    /// Maximum entries to keep.
    max_entries: usize,
}

impl ConversationLog {
    /// Create a new log keeping at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Append an entry, evicting the oldest when the cap is reached.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    /// Get all entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Get the last N entries.
    pub fn last_n(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Get entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(CoreConfig::default().max_history_entries)
    }
}

/// Shared execution state for a plan run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Conversation history visible to later tasks.
    pub history: ConversationLog,
    /// Named artifacts produced by agents.
    pub artifacts: HashMap<String, Value>,
    /// Free-form shared state.
    pub shared_state: HashMap<String, Value>,
    /// Project directory agents operate in.
    pub project_dir: PathBuf,
}

impl ExecutionContext {
    /// Create a new context rooted at the given project directory.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(project_dir, &CoreConfig::default())
    }

    /// Create a new context with an explicit configuration.
    pub fn with_config(project_dir: impl Into<PathBuf>, config: &CoreConfig) -> Self {
        Self {
            history: ConversationLog::new(config.max_history_entries),
            artifacts: HashMap::new(),
            shared_state: HashMap::new(),
            project_dir: project_dir.into(),
        }
    }

    /// Fork into a fully independent copy.
    ///
    /// The fork shares nothing with the original: mutations on either side
    /// are invisible to the other. Delegated sub-tasks always run against a
    /// fork.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Record a history entry.
    pub fn record(&mut self, agent: impl Into<String>, content: impl Into<String>) {
        self.history.push(HistoryEntry::new(agent, content));
    }

    /// Changes made on this context since `baseline` was forked from it.
    pub fn diff_from(&self, baseline: &ExecutionContext) -> ContextDelta {
        let history = self
            .history
            .entries()
            .get(baseline.history.len()..)
            .unwrap_or_default()
            .to_vec();

        let mut artifacts = HashMap::new();
        for (key, value) in &self.artifacts {
            if baseline.artifacts.get(key) != Some(value) {
                artifacts.insert(key.clone(), value.clone());
            }
        }

        let mut shared_state = HashMap::new();
        for (key, value) in &self.shared_state {
            if baseline.shared_state.get(key) != Some(value) {
                shared_state.insert(key.clone(), value.clone());
            }
        }

        ContextDelta {
            history,
            artifacts,
            shared_state,
        }
    }

    /// Replay a delta produced by a forked context onto this one.
    pub fn apply(&mut self, delta: ContextDelta) {
        for entry in delta.history {
            self.history.push(entry);
        }
        self.artifacts.extend(delta.artifacts);
        self.shared_state.extend(delta.shared_state);
    }
}

/// Changes made to a forked context, replayable onto the original.
#[derive(Debug, Clone, Default)]
pub struct ContextDelta {
    /// History entries added on the fork.
    pub history: Vec<HistoryEntry>,
    /// Artifacts added or changed on the fork.
    pub artifacts: HashMap<String, Value>,
    /// Shared-state keys added or changed on the fork.
    pub shared_state: HashMap<String, Value>,
}

impl ContextDelta {
    /// Check if the delta carries no changes.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.artifacts.is_empty() && self.shared_state.is_empty()
    }
}
