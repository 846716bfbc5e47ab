//! Agent registry keyed by name.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::agents::agent::{Agent, AgentContract};
use crate::error::DirectoryError;

/// Registry of available agents.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register an agent. A later registration replaces an earlier one with
    /// the same name.
    pub async fn register(&self, agent: Arc<dyn Agent>) {
        let name = agent.name().to_string();
        self.agents.write().await.insert(name.clone(), agent);
        tracing::debug!("Registered agent: {}", name);
    }

    /// Get an agent by name.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Agent>, DirectoryError> {
        self.agents
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DirectoryError::AgentNotFound {
                name: name.to_string(),
            })
    }

    /// Check if an agent exists.
    pub async fn has(&self, name: &str) -> bool {
        self.agents.read().await.contains_key(name)
    }

    /// List all agent names.
    pub async fn list(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }

    /// Get the number of registered agents.
    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Agents able to handle the task, ordered by descending confidence.
    ///
    /// Agents reporting a confidence of zero or less are excluded. Ties are
    /// broken by name so the ordering is deterministic.
    pub async fn find_by_capability(&self, task: &str) -> Vec<Arc<dyn Agent>> {
        let mut scored: Vec<(f32, Arc<dyn Agent>)> = self
            .agents
            .read()
            .await
            .values()
            .map(|agent| (agent.confidence(task), Arc::clone(agent)))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.name().cmp(b.1.name()))
        });

        scored.into_iter().map(|(_, agent)| agent).collect()
    }

    /// The single most confident agent for the task, if any.
    pub async fn find_best_match(&self, task: &str) -> Option<Arc<dyn Agent>> {
        self.find_by_capability(task).await.into_iter().next()
    }

    /// Contract for a possibly-assigned agent name.
    ///
    /// An unassigned task, or one whose agent lookup fails, gets an empty
    /// contract: no dependencies, produces nothing.
    pub async fn contract_for(&self, name: Option<&str>) -> AgentContract {
        match name {
            Some(name) => self
                .agents
                .read()
                .await
                .get(name)
                .map(|agent| agent.contract())
                .unwrap_or_default(),
            None => AgentContract::default(),
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
