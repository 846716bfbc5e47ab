//! Plan and task data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::AgentResult;

/// State of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting to be started.
    Pending,
    /// Task is currently executing.
    Running,
    /// Task finished successfully.
    Completed,
    /// Task failed and will not be retried.
    Failed,
}

impl TaskStatus {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed)
        )
    }

    /// Check if this is a terminal state. Terminal states are final: a task
    /// is never re-entered by the scheduler once terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A single unit of work within a plan.
///
/// Tasks are owned by the plan that contains them and mutated only by the
/// scheduler during execution. Sub-tasks form a tree: they execute
/// depth-first after the task itself completes, sequentially, on whichever
/// worker slot ran the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID.
    pub id: Uuid,
    /// What the task asks an agent to do.
    pub description: String,
    /// Agent assigned to this task; auto-selected at execution time when absent.
    pub assigned_agent: Option<String>,
    /// Child tasks, executed depth-first after this task completes.
    pub sub_tasks: Vec<Task>,
    /// Current state.
    pub status: TaskStatus,
    /// Final result, set when the task reaches a terminal state.
    pub result: Option<AgentResult>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            assigned_agent: None,
            sub_tasks: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Assign an agent by name.
    pub fn with_agent(mut self, name: impl Into<String>) -> Self {
        self.assigned_agent = Some(name.into());
        self
    }

    /// Append a sub-task.
    pub fn with_sub_task(mut self, task: Task) -> Self {
        self.sub_tasks.push(task);
        self
    }

    /// Transition to a new status, updating timestamps.
    pub fn transition_to(&mut self, status: TaskStatus) -> Result<(), String> {
        if !self.status.can_transition_to(status) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.status, status
            ));
        }

        self.status = status;
        match status {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed => self.finished_at = Some(Utc::now()),
            TaskStatus::Pending => {}
        }
        Ok(())
    }

    /// Mark the task running.
    pub(crate) fn start(&mut self) {
        if let Err(e) = self.transition_to(TaskStatus::Running) {
            tracing::warn!(task = %self.description, "{e}");
        }
    }

    /// Mark the task completed with its result.
    pub(crate) fn complete(&mut self, result: AgentResult) {
        if let Err(e) = self.transition_to(TaskStatus::Completed) {
            tracing::warn!(task = %self.description, "{e}");
            return;
        }
        self.result = Some(result);
    }

    /// Mark the task failed with a synthetic error result.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if let Err(e) = self.transition_to(TaskStatus::Failed) {
            tracing::warn!(task = %self.description, "{e}");
            return;
        }
        self.result = Some(AgentResult::error(reason));
    }
}

/// An ordered list of tasks working toward one objective.
///
/// Top-level tasks are the unit of dependency analysis; sub-tasks are
/// invisible to the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// What the plan is trying to achieve.
    pub objective: String,
    /// Top-level tasks, in order.
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Get the number of top-level tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Status counts over the top-level tasks.
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }
        summary.total = self.tasks.len();
        summary
    }
}

/// Summary of task states within a plan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_valid() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn status_transitions_invalid() {
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn status_serde_roundtrip() {
        let json = serde_json::to_string(&TaskStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let parsed: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskStatus::Running);
    }

    #[test]
    fn task_lifecycle() {
        let mut task = Task::new("build the schema").with_agent("architect");
        assert_eq!(task.status, TaskStatus::Pending);

        task.start();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.started_at.is_some());

        task.complete(AgentResult::success("done"));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.finished_at.is_some());
        assert_eq!(task.result.as_ref().unwrap().content, "done");
    }

    #[test]
    fn fail_sets_error_result() {
        let mut task = Task::new("doomed");
        task.fail("no agent available");

        assert_eq!(task.status, TaskStatus::Failed);
        let result = task.result.unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "no agent available");
    }

    #[test]
    fn terminal_tasks_are_not_reentered() {
        let mut task = Task::new("done once");
        task.start();
        task.complete(AgentResult::success("first"));

        task.fail("should not overwrite");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.unwrap().content, "first");
    }

    #[test]
    fn sub_task_tree() {
        let task = Task::new("parent")
            .with_sub_task(Task::new("child a"))
            .with_sub_task(Task::new("child b").with_sub_task(Task::new("grandchild")));

        assert_eq!(task.sub_tasks.len(), 2);
        assert_eq!(task.sub_tasks[1].sub_tasks.len(), 1);
    }

    #[test]
    fn plan_summary_counts() {
        let mut plan = Plan::new("ship it")
            .with_task(Task::new("a"))
            .with_task(Task::new("b"))
            .with_task(Task::new("c"));

        plan.tasks[0].start();
        plan.tasks[0].complete(AgentResult::success("ok"));
        plan.tasks[1].fail("nope");

        let summary = plan.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
    }
}
