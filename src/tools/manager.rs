//! Tool connection manager — lazy connection, routing, circuit breaking.
//!
//! The manager decouples "which tools exist and are healthy" from "which
//! handler implements a tool". Handlers connect lazily on first use; every
//! discovered tool name is routed through a global name → handler map; a
//! handler that keeps failing is disabled so it stops degrading the rest of
//! the system. Disabled is permanent for the manager's lifetime: recovery
//! means building a fresh manager (see [`ToolConnectionManager::scoped`]).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::CoreConfig;
use crate::tools::directory::ToolDirectory;
use crate::tools::handler::{ToolDefinition, ToolHandler, ToolResult, ToolSchema};

/// Runtime status tracked per handler.
#[derive(Debug, Default, Clone)]
pub struct HandlerStatus {
    /// Whether the handler has been connected.
    pub connected: bool,
    /// Circuit-broken: permanently unavailable for this manager's lifetime.
    pub failed: bool,
    /// Consecutive error results since the last success.
    pub consecutive_errors: u32,
}

#[derive(Default)]
struct ManagerState {
    handlers: HashMap<String, HandlerStatus>,
    /// Global tool name → owning handler name.
    tool_map: HashMap<String, String>,
}

/// Manages connections to tool handlers and routes tool calls.
pub struct ToolConnectionManager {
    directory: Arc<ToolDirectory>,
    failure_threshold: u32,
    state: Mutex<ManagerState>,
}

impl ToolConnectionManager {
    /// Create a new manager with default configuration.
    pub fn new(directory: Arc<ToolDirectory>) -> Self {
        Self::with_config(directory, &CoreConfig::default())
    }

    /// Create a new manager with an explicit configuration.
    pub fn with_config(directory: Arc<ToolDirectory>, config: &CoreConfig) -> Self {
        Self {
            directory,
            failure_threshold: config.handler_failure_threshold.max(1),
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Run `f` against a fresh manager and always shut it down afterwards.
    ///
    /// Shutdown runs on every exit path of the closure, including early
    /// returns, so embedding code gets the same guarantee a scoped resource
    /// gives.
    pub async fn scoped<F, Fut, T>(directory: Arc<ToolDirectory>, config: &CoreConfig, f: F) -> T
    where
        F: FnOnce(Arc<ToolConnectionManager>) -> Fut,
        Fut: Future<Output = T>,
    {
        let manager = Arc::new(Self::with_config(directory, config));
        let output = f(Arc::clone(&manager)).await;
        manager.shutdown_all().await;
        output
    }

    /// Connect a handler if needed. Returns false when the handler is (or
    /// becomes) circuit-broken.
    ///
    /// A failed connection attempt is treated like a runtime failure: the
    /// handler is disabled permanently, with no automatic retry. The whole
    /// check-and-connect runs under the manager mutex so it is idempotent
    /// under concurrent callers.
    async fn ensure_connected(&self, handler: &Arc<dyn ToolHandler>) -> bool {
        let name = handler.name().to_string();
        let mut state = self.state.lock().await;

        {
            let status = state.handlers.entry(name.clone()).or_default();
            if status.failed {
                return false;
            }
            if status.connected {
                return true;
            }
        }

        let connected = match handler.connect().await {
            Ok(()) => handler.is_connected(),
            Err(err) => {
                tracing::warn!(handler = %name, error = %err, "Tool handler connection failed; disabling");
                false
            }
        };

        let status = state.handlers.entry(name.clone()).or_default();
        if connected {
            status.connected = true;
            tracing::info!(handler = %name, "Tool handler connected");
        } else {
            status.failed = true;
            tracing::warn!(handler = %name, "Tool handler unavailable; disabling");
        }
        connected
    }

    /// Tools available for a workflow stage and agent.
    ///
    /// Skips circuit-broken handlers, lazily connects the rest, lists their
    /// tools concurrently, and registers every tool name into the routing
    /// map. A name already owned by a different handler is dropped with a
    /// warning: the first registration wins, ties resolved by discovery
    /// order.
    pub async fn get_tools_for_scope(&self, stage: &str, agent: &str) -> Vec<ToolDefinition> {
        let handlers = self.directory.get_for_scope(stage, agent).await;

        let mut live: Vec<Arc<dyn ToolHandler>> = Vec::new();
        for handler in handlers {
            if self.ensure_connected(&handler).await {
                live.push(handler);
            }
        }

        let listed = join_all(live.iter().map(|handler| handler.list_tools())).await;

        let mut state = self.state.lock().await;
        let mut tools = Vec::new();
        for (handler, handler_tools) in live.iter().zip(listed) {
            for tool in handler_tools {
                match state.tool_map.get(&tool.name) {
                    Some(owner) if owner != handler.name() => {
                        tracing::warn!(
                            tool = %tool.name,
                            owner = %owner,
                            dropped = %handler.name(),
                            "Tool name collision; keeping first registration"
                        );
                    }
                    _ => {
                        state
                            .tool_map
                            .insert(tool.name.clone(), handler.name().to_string());
                        tools.push(tool);
                    }
                }
            }
        }
        tools
    }

    /// Same listing projected to function-calling schemas.
    pub async fn get_tools_as_schema(&self, stage: &str, agent: &str) -> Vec<ToolSchema> {
        self.get_tools_for_scope(stage, agent)
            .await
            .iter()
            .map(ToolDefinition::to_schema)
            .collect()
    }

    /// Invoke a tool by name through its owning handler.
    ///
    /// An unknown tool or a circuit-broken handler yields an immediate
    /// error result without touching the handler. Error results feed the
    /// per-handler consecutive-failure counter; reaching the threshold
    /// disables the handler, and a success resets the counter to zero.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> ToolResult {
        let handler_name = {
            let state = self.state.lock().await;
            match state.tool_map.get(tool_name) {
                Some(owner) => {
                    let broken = state
                        .handlers
                        .get(owner)
                        .map(|status| status.failed)
                        .unwrap_or(false);
                    if broken {
                        return ToolResult::error(format!(
                            "tool handler '{owner}' is unavailable"
                        ));
                    }
                    owner.clone()
                }
                None => return ToolResult::error(format!("unknown tool '{tool_name}'")),
            }
        };

        let Some(handler) = self.directory.get(&handler_name).await else {
            return ToolResult::error(format!("tool handler '{handler_name}' is unavailable"));
        };

        let result = handler.call_tool(tool_name, arguments).await;

        let mut state = self.state.lock().await;
        let status = state.handlers.entry(handler_name.clone()).or_default();
        if result.is_error {
            status.consecutive_errors += 1;
            if status.consecutive_errors >= self.failure_threshold && !status.failed {
                status.failed = true;
                tracing::warn!(
                    handler = %handler_name,
                    errors = status.consecutive_errors,
                    "Tool handler disabled after repeated failures"
                );
            }
        } else {
            status.consecutive_errors = 0;
        }
        result
    }

    /// Disconnect every connected handler and clear all manager state.
    ///
    /// One handler failing to disconnect never blocks the others; errors
    /// are logged and swallowed.
    pub async fn shutdown_all(&self) {
        let connected: Vec<String> = {
            let state = self.state.lock().await;
            state
                .handlers
                .iter()
                .filter(|(_, status)| status.connected)
                .map(|(name, _)| name.clone())
                .collect()
        };

        for name in connected {
            match self.directory.get(&name).await {
                Some(handler) => {
                    if let Err(err) = handler.disconnect().await {
                        tracing::warn!(handler = %name, error = %err, "Error disconnecting tool handler");
                    }
                }
                None => {
                    tracing::warn!(handler = %name, "Connected handler missing from directory at shutdown");
                }
            }
        }

        let mut state = self.state.lock().await;
        state.handlers.clear();
        state.tool_map.clear();
        tracing::info!("All tool handler connections closed");
    }

    /// Runtime status snapshot for a handler, if the manager has seen it.
    pub async fn handler_status(&self, name: &str) -> Option<HandlerStatus> {
        self.state.lock().await.handlers.get(name).cloned()
    }
}
