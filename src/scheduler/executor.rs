//! Plan execution — sequential baseline, bounded parallel scheduling, delegation.

use std::collections::{BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::agents::{AgentRegistry, AgentResult};
use crate::context::{ContextDelta, ExecutionContext};
use crate::scheduler::graph::DependencyGraph;
use crate::scheduler::log::ExecutionLogEntry;
use crate::scheduler::plan::{Plan, Task, TaskStatus};

/// Maximum characters of agent output quoted into the conversation history.
const SUMMARY_LIMIT: usize = 200;

/// Executes plans against a registry of agents.
///
/// Failures at the unit-of-work level are always contained: a task that
/// cannot find an agent, or whose agent errors out, ends up `Failed` with a
/// synthetic error result, and its siblings keep running. Nothing unwinds
/// past the scheduler boundary.
pub struct TaskScheduler {
    registry: Arc<AgentRegistry>,
    context: ExecutionContext,
    log: Vec<ExecutionLogEntry>,
}

/// Outcome of one spawned top-level task, applied on the scheduler's own
/// task so the shared log and history have a single writer.
struct TaskRun {
    index: usize,
    task: Task,
    delta: ContextDelta,
    log: Vec<ExecutionLogEntry>,
}

impl TaskScheduler {
    /// Create a new scheduler.
    pub fn new(registry: Arc<AgentRegistry>, context: ExecutionContext) -> Self {
        Self {
            registry,
            context,
            log: Vec::new(),
        }
    }

    /// Assemble a plan from an objective and a prepared task list.
    pub fn plan(&self, objective: impl Into<String>, tasks: Vec<Task>) -> Plan {
        let mut plan = Plan::new(objective);
        plan.tasks = tasks;
        plan
    }

    /// Get the execution log.
    pub fn execution_log(&self) -> &[ExecutionLogEntry] {
        &self.log
    }

    /// Get the shared execution context.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Execute every top-level task in order, recursing into sub-tasks
    /// depth-first.
    ///
    /// Each task resolves its agent (the assigned one, or the registry's
    /// best match when unassigned), runs it, and on success appends an
    /// execution-log entry plus a summary line to the shared history so
    /// later tasks see prior output. Sub-tasks run only when their parent
    /// completed.
    pub async fn execute_plan(&mut self, plan: &mut Plan) {
        tracing::info!(
            objective = %plan.objective,
            tasks = plan.tasks.len(),
            "Executing plan sequentially"
        );

        for task in plan.tasks.iter_mut() {
            run_task_tree(&self.registry, task, &mut self.context, &mut self.log).await;
        }
    }

    /// Execute top-level tasks with bounded parallelism.
    ///
    /// Dependencies are derived from the assigned agents' declared
    /// contracts. Ready tasks are spawned onto a pool bounded by
    /// `max_workers`; readiness is re-evaluated after every completion, and
    /// each finished task's context changes and log entries are applied
    /// here, on the caller's task. When no task is ready but some remain
    /// and nothing is in flight, the dependency graph contains a cycle (or
    /// an unresolvable wait): the remaining tasks run sequentially in index
    /// order so the plan always finishes.
    pub async fn execute_plan_parallel(&mut self, plan: &mut Plan, max_workers: usize) {
        let mut contracts = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            contracts.push(
                self.registry
                    .contract_for(task.assigned_agent.as_deref())
                    .await,
            );
        }
        let graph = DependencyGraph::from_contracts(&contracts);

        let mut slots: Vec<Option<Task>> = plan.tasks.drain(..).map(Some).collect();
        let mut remaining: BTreeSet<usize> = (0..slots.len()).collect();
        let mut completed: HashSet<usize> = HashSet::new();
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut in_flight: JoinSet<TaskRun> = JoinSet::new();

        tracing::info!(
            objective = %plan.objective,
            tasks = slots.len(),
            max_workers,
            "Executing plan in parallel"
        );

        loop {
            let ready = graph.ready_indices(&remaining, &completed);

            if ready.is_empty() && !remaining.is_empty() && in_flight.is_empty() {
                tracing::warn!(
                    remaining = remaining.len(),
                    "No task is ready; dependency cycle suspected, falling back to sequential execution"
                );
                for index in std::mem::take(&mut remaining) {
                    if let Some(mut task) = slots[index].take() {
                        run_task_tree(&self.registry, &mut task, &mut self.context, &mut self.log)
                            .await;
                        slots[index] = Some(task);
                    }
                    completed.insert(index);
                }
                break;
            }

            for index in ready {
                remaining.remove(&index);
                let Some(task) = slots[index].take() else {
                    continue;
                };
                in_flight.spawn(run_spawned_task(
                    index,
                    task,
                    Arc::clone(&self.registry),
                    Arc::clone(&semaphore),
                    self.context.fork(),
                ));
            }

            match in_flight.join_next().await {
                Some(Ok(run)) => {
                    completed.insert(run.index);
                    self.context.apply(run.delta);
                    self.log.extend(run.log);
                    slots[run.index] = Some(run.task);
                }
                Some(Err(err)) => {
                    // Panics are caught inside the worker, so this only
                    // fires if a worker task is aborted externally.
                    tracing::error!(error = %err, "Worker task join failed");
                }
                None => {
                    if remaining.is_empty() {
                        break;
                    }
                }
            }
        }

        plan.tasks = slots.into_iter().flatten().collect();
    }

    /// Synchronously delegate a one-off sub-task to a named agent.
    ///
    /// The target runs against an independent fork of the scheduler
    /// context, so it can never mutate the caller's state and concurrent
    /// delegations never share mutable containers. A failed lookup comes
    /// back as an error result, not an `Err`.
    pub async fn delegate(&mut self, from: &str, to: &str, task: &str) -> AgentResult {
        let agent = match self.registry.get(to).await {
            Ok(agent) => agent,
            Err(err) => {
                tracing::warn!(from, to, error = %err, "Delegation target not found");
                return AgentResult::error(format!("delegation failed: {err}"));
            }
        };

        self.log.push(ExecutionLogEntry::delegation(from, to, task));
        let mut forked = self.context.fork();

        match agent.execute(task, &mut forked).await {
            Ok(result) => result,
            Err(err) => AgentResult::error(format!("delegation failed: {err}")),
        }
    }
}

/// Run one top-level task on a pool slot.
///
/// The worker operates on a scratch fork of the scheduler context and
/// reports its changes back as a delta; it never touches shared state
/// directly. A panicking agent fails its task without taking down the
/// batch.
async fn run_spawned_task(
    index: usize,
    mut task: Task,
    registry: Arc<AgentRegistry>,
    semaphore: Arc<Semaphore>,
    baseline: ExecutionContext,
) -> TaskRun {
    let mut scratch = baseline.clone();
    let mut log = Vec::new();

    match semaphore.acquire_owned().await {
        Ok(_permit) => {
            let outcome = AssertUnwindSafe(run_task_tree(
                &registry,
                &mut task,
                &mut scratch,
                &mut log,
            ))
            .catch_unwind()
            .await;

            if outcome.is_err() {
                tracing::warn!(task = %task.description, "Agent panicked during execution");
                task.fail("agent panicked during execution");
            }
        }
        Err(_) => task.fail("worker pool is shut down"),
    }

    TaskRun {
        index,
        task,
        delta: scratch.diff_from(&baseline),
        log,
    }
}

/// Execute a task, then its sub-tasks depth-first once it completed.
///
/// Sub-tasks of a failed parent are left pending; they never started.
fn run_task_tree<'a>(
    registry: &'a AgentRegistry,
    task: &'a mut Task,
    ctx: &'a mut ExecutionContext,
    log: &'a mut Vec<ExecutionLogEntry>,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        run_single_task(registry, task, ctx, log).await;

        if task.status == TaskStatus::Completed {
            for sub in task.sub_tasks.iter_mut() {
                run_task_tree(registry, sub, ctx, log).await;
            }
        }
    })
}

/// Execute one task body: resolve the agent, run it, record the outcome.
async fn run_single_task(
    registry: &AgentRegistry,
    task: &mut Task,
    ctx: &mut ExecutionContext,
    log: &mut Vec<ExecutionLogEntry>,
) {
    let agent = match &task.assigned_agent {
        Some(name) => match registry.get(name).await {
            Ok(agent) => agent,
            Err(err) => {
                tracing::warn!(task = %task.description, error = %err, "Assigned agent not found");
                task.fail(format!("no agent available: {err}"));
                return;
            }
        },
        None => match registry.find_best_match(&task.description).await {
            Some(agent) => {
                task.assigned_agent = Some(agent.name().to_string());
                agent
            }
            None => {
                tracing::warn!(task = %task.description, "No agent can handle task");
                task.fail("no agent available for task");
                return;
            }
        },
    };

    task.start();
    tracing::debug!(agent = %agent.name(), task = %task.description, "Task started");

    match agent.execute(&task.description, ctx).await {
        Ok(result) => {
            log.push(ExecutionLogEntry::execution(agent.name(), &task.description));
            let summary: String = result.content.chars().take(SUMMARY_LIMIT).collect();
            ctx.record(agent.name(), summary);
            task.complete(result);
        }
        Err(err) => {
            tracing::warn!(
                agent = %agent.name(),
                task = %task.description,
                error = %err,
                "Task failed"
            );
            task.fail(err.to_string());
        }
    }
}
