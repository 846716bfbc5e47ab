//! Error types for the coordination core.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

/// Lookup errors from the agent and tool directories.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Agent {name} not found")]
    AgentNotFound { name: String },

    #[error("Tool handler {name} not found")]
    HandlerNotFound { name: String },
}

/// Agent execution errors.
///
/// These are contained at the task boundary: the scheduler converts them
/// into a failed task with a synthetic error result and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent {agent} failed to execute task: {reason}")]
    ExecutionFailed { agent: String, reason: String },

    #[error("Agent {agent} cannot handle task: {reason}")]
    Unsupported { agent: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool handler connection errors.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler {name} failed to connect: {reason}")]
    ConnectFailed { name: String, reason: String },

    #[error("Handler {name} failed to disconnect: {reason}")]
    DisconnectFailed { name: String, reason: String },

    #[error("Handler {name} is not connected")]
    NotConnected { name: String },
}

/// Result type alias for the core.
pub type Result<T> = std::result::Result<T, Error>;
