//! Configuration types.

/// Core configuration.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum tasks executing concurrently in a parallel plan run.
    pub max_parallel_tasks: usize,
    /// Consecutive tool-call failures before a handler is disabled.
    pub handler_failure_threshold: u32,
    /// Maximum conversation-history entries kept per execution context.
    pub max_history_entries: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: 4,
            handler_failure_threshold: 3,
            max_history_entries: 1000,
        }
    }
}
