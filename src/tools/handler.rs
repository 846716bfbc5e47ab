//! Tool handler trait and tool data types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// A tool exposed by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, globally unique once registered with the manager.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema of the tool's input.
    pub input_schema: Value,
    /// Name of the handler that owns the tool.
    pub handler: String,
}

impl ToolDefinition {
    /// Create a new definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: handler.into(),
        }
    }

    /// Project to the function-calling schema consumed by an external
    /// choice-making component.
    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }
}

/// Tool definition in function-calling form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of one tool call.
///
/// Handlers never raise: a failing call comes back with `is_error` set and
/// a message, so callers always have a value to work with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool output, or the error text when `is_error` is set.
    pub content: String,
    /// Whether the call failed.
    pub is_error: bool,
    /// Error detail when the call failed.
    pub error_message: Option<String>,
    /// Structured metadata attached by the handler.
    pub metadata: Value,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            error_message: None,
            metadata: Value::Null,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: message.clone(),
            is_error: true,
            error_message: Some(message),
            metadata: Value::Null,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Adapter to one external tool server.
///
/// Each handler owns its transport, protocol, and authentication; the core
/// only drives this interface.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Unique handler name.
    fn name(&self) -> &str;

    /// Establish the connection. Idempotent on success; must leave
    /// `is_connected` reporting true when it returns `Ok`.
    async fn connect(&self) -> Result<(), HandlerError>;

    /// Whether the handler currently holds a usable connection.
    fn is_connected(&self) -> bool;

    /// Tools currently exposed by the server.
    async fn list_tools(&self) -> Vec<ToolDefinition>;

    /// Invoke a tool. Never fails; errors come back as `is_error` results.
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolResult;

    /// Tear down the connection. Safe to call repeatedly.
    async fn disconnect(&self) -> Result<(), HandlerError>;

    /// Liveness probe; defaults to the connection flag.
    async fn health_check(&self) -> bool {
        self.is_connected()
    }

    /// Whether this handler is available for the given workflow stage and
    /// agent.
    fn matches_scope(&self, stage: &str, agent: &str) -> bool;
}
