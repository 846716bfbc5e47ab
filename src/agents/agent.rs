//! Agent trait, contract, and result types.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::AgentError;

/// Declared input/output artifact names for an agent.
///
/// Contracts drive dependency inference between plan tasks and nothing
/// else; they are not enforced at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContract {
    /// Artifact names this agent consumes.
    pub inputs: HashSet<String>,
    /// Artifact names this agent produces.
    pub outputs: HashSet<String>,
}

impl AgentContract {
    /// Create an empty contract (no dependencies, produces nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a consumed artifact name.
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.insert(name.into());
        self
    }

    /// Add a produced artifact name.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.insert(name.into());
        self
    }

    /// Check whether this contract consumes anything the other produces.
    pub fn depends_on(&self, other: &AgentContract) -> bool {
        !self.inputs.is_disjoint(&other.outputs)
    }
}

/// Result of one agent execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Human-readable output, or the error text when `is_error` is set.
    pub content: String,
    /// Whether this result represents a failure.
    pub is_error: bool,
    /// Structured metadata attached by the agent.
    pub metadata: serde_json::Value,
}

impl AgentResult {
    /// Create a successful result.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: serde_json::Value::Null,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A unit that can execute a natural-language task.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique agent name.
    fn name(&self) -> &str;

    /// Declared input/output artifact names.
    fn contract(&self) -> AgentContract {
        AgentContract::default()
    }

    /// Confidence that this agent can handle the task (0.0 means it cannot).
    fn confidence(&self, task: &str) -> f32;

    /// Execute the task against the given context.
    async fn execute(
        &self,
        task: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<AgentResult, AgentError>;
}
