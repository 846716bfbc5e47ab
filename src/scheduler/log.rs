//! Append-only execution log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single execution-log record.
///
/// The log lives as long as the scheduler instance and is read by callers
/// for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionLogEntry {
    /// One agent delegated a sub-task to another.
    Delegation {
        id: Uuid,
        from: String,
        to: String,
        task: String,
        recorded_at: DateTime<Utc>,
    },
    /// An agent executed a plan task.
    Execution {
        id: Uuid,
        agent: String,
        task: String,
        recorded_at: DateTime<Utc>,
    },
}

impl ExecutionLogEntry {
    /// Create a delegation record.
    pub fn delegation(
        from: impl Into<String>,
        to: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self::Delegation {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            task: task.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Create an execution record.
    pub fn execution(agent: impl Into<String>, task: impl Into<String>) -> Self {
        Self::Execution {
            id: Uuid::new_v4(),
            agent: agent.into(),
            task: task.into(),
            recorded_at: Utc::now(),
        }
    }

    /// When the entry was recorded.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            Self::Delegation { recorded_at, .. } | Self::Execution { recorded_at, .. } => {
                *recorded_at
            }
        }
    }
}
