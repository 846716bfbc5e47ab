//! Layered tool-handler directory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::tools::handler::ToolHandler;

/// Registry of tool handlers with a custom-over-builtin override layer.
///
/// Built-in handlers ship with the system; custom handlers are supplied by
/// the surrounding configuration and shadow built-ins with the same name.
pub struct ToolDirectory {
    builtin: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
    custom: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self {
            builtin: RwLock::new(HashMap::new()),
            custom: RwLock::new(HashMap::new()),
        }
    }

    /// Register a built-in handler.
    pub async fn register_builtin(&self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        self.builtin.write().await.insert(name.clone(), handler);
        tracing::debug!("Registered builtin tool handler: {}", name);
    }

    /// Register a custom handler. Shadows a built-in with the same name.
    pub async fn register_custom(&self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        self.custom.write().await.insert(name.clone(), handler);
        tracing::debug!("Registered custom tool handler: {}", name);
    }

    /// Resolve a handler by name; the custom layer wins.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        if let Some(handler) = self.custom.read().await.get(name) {
            return Some(Arc::clone(handler));
        }
        self.builtin.read().await.get(name).cloned()
    }

    /// Handlers available for the given workflow stage and agent.
    ///
    /// Custom handlers shadow built-ins of the same name; the result is
    /// ordered by handler name so discovery order is deterministic.
    pub async fn get_for_scope(&self, stage: &str, agent: &str) -> Vec<Arc<dyn ToolHandler>> {
        let mut merged: HashMap<String, Arc<dyn ToolHandler>> = self
            .builtin
            .read()
            .await
            .iter()
            .map(|(name, handler)| (name.clone(), Arc::clone(handler)))
            .collect();

        for (name, handler) in self.custom.read().await.iter() {
            merged.insert(name.clone(), Arc::clone(handler));
        }

        let mut handlers: Vec<Arc<dyn ToolHandler>> = merged
            .into_values()
            .filter(|handler| handler.matches_scope(stage, agent))
            .collect();
        handlers.sort_by(|a, b| a.name().cmp(b.name()));
        handlers
    }

    /// List all handler names, custom shadowing builtin.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = {
            let builtin = self.builtin.read().await;
            let custom = self.custom.read().await;
            builtin.keys().chain(custom.keys()).cloned().collect()
        };
        names.sort();
        names.dedup();
        names
    }
}

impl Default for ToolDirectory {
    fn default() -> Self {
        Self::new()
    }
}
