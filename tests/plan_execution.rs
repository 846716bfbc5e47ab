//! End-to-end test: agent registry + scheduler + tool directory + manager.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use conductor::agents::{Agent, AgentContract, AgentRegistry, AgentResult};
use conductor::config::CoreConfig;
use conductor::context::ExecutionContext;
use conductor::error::{AgentError, HandlerError};
use conductor::scheduler::{Task, TaskScheduler, TaskStatus};
use conductor::tools::{
    ToolConnectionManager, ToolDefinition, ToolDirectory, ToolHandler, ToolResult,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Pipeline agent: consumes its declared inputs, produces its declared
/// outputs, and records the order it ran in.
struct PipelineAgent {
    name: String,
    contract: AgentContract,
    order: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Agent for PipelineAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> AgentContract {
        self.contract.clone()
    }

    fn confidence(&self, task: &str) -> f32 {
        if task.contains(&self.name) { 0.8 } else { 0.1 }
    }

    async fn execute(
        &self,
        task: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<AgentResult, AgentError> {
        for input in &self.contract.inputs {
            if !ctx.artifacts.contains_key(input) {
                return Err(AgentError::ExecutionFailed {
                    agent: self.name.clone(),
                    reason: format!("missing input artifact '{input}'"),
                });
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        for output in &self.contract.outputs {
            ctx.artifacts.insert(output.clone(), json!({"by": self.name}));
        }
        self.order.lock().unwrap().push(self.name.clone());
        Ok(AgentResult::success(format!("{}: {task} done", self.name)))
    }
}

struct StageHandler {
    name: String,
    stages: Vec<String>,
    tools: Vec<String>,
    calls: AtomicU32,
    fail_all: bool,
}

impl StageHandler {
    fn new(name: &str, stages: &[&str], tools: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            stages: stages.iter().map(|s| s.to_string()).collect(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            calls: AtomicU32::new(0),
            fail_all: false,
        })
    }

    fn flaky(name: &str, stages: &[&str], tools: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            stages: stages.iter().map(|s| s.to_string()).collect(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            calls: AtomicU32::new(0),
            fail_all: true,
        })
    }
}

#[async_trait]
impl ToolHandler for StageHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition::new(tool, "pipeline tool", json!({"type": "object"}), &self.name))
            .collect()
    }

    async fn call_tool(&self, name: &str, _arguments: Value) -> ToolResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            ToolResult::error(format!("{name} is down"))
        } else {
            ToolResult::success(format!("{name} via {}", self.name))
        }
    }

    async fn disconnect(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    fn matches_scope(&self, stage: &str, _agent: &str) -> bool {
        self.stages.is_empty() || self.stages.iter().any(|s| s == stage)
    }
}

#[tokio::test]
async fn pipeline_plan_respects_contracts_end_to_end() -> Result<()> {
    init_tracing();

    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(AgentRegistry::new());

    let stages = vec![
        ("designer", vec![], vec!["design"]),
        ("backend", vec!["design"], vec!["api"]),
        ("frontend", vec!["design"], vec!["ui"]),
        ("verifier", vec!["api", "ui"], vec!["report"]),
    ];
    for (name, inputs, outputs) in stages {
        let mut contract = AgentContract::new();
        for input in inputs {
            contract = contract.with_input(input);
        }
        for output in outputs {
            contract = contract.with_output(output);
        }
        registry
            .register(Arc::new(PipelineAgent {
                name: name.to_string(),
                contract,
                order: Arc::clone(&order),
            }))
            .await;
    }

    let config = CoreConfig::default();
    let mut scheduler = TaskScheduler::new(
        Arc::clone(&registry),
        ExecutionContext::with_config("/tmp/pipeline", &config),
    );

    let mut plan = scheduler.plan(
        "ship the feature",
        vec![
            Task::new("draft the design").with_agent("designer"),
            Task::new("implement the api").with_agent("backend"),
            Task::new("implement the ui").with_agent("frontend"),
            Task::new("verify the result").with_agent("verifier"),
        ],
    );

    scheduler
        .execute_plan_parallel(&mut plan, config.max_parallel_tasks)
        .await;

    assert!(plan.tasks.iter().all(|t| t.status == TaskStatus::Completed));
    assert_eq!(plan.summary().completed, 4);

    let order = order.lock().unwrap().clone();
    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(pos("designer") < pos("backend"));
    assert!(pos("designer") < pos("frontend"));
    assert!(pos("backend") < pos("verifier"));
    assert!(pos("frontend") < pos("verifier"));

    // The final context carries every produced artifact and one history
    // line per executed task.
    let ctx = scheduler.context();
    for artifact in ["design", "api", "ui", "report"] {
        assert!(ctx.artifacts.contains_key(artifact), "missing {artifact}");
    }
    assert_eq!(ctx.history.len(), 4);
    assert_eq!(scheduler.execution_log().len(), 4);

    Ok(())
}

#[tokio::test]
async fn scoped_manager_routes_and_breaks_within_one_session() -> Result<()> {
    init_tracing();

    let directory = Arc::new(ToolDirectory::new());
    let build_tools = StageHandler::new("build-tools", &["build"], &["compile", "lint"]);
    let flaky = StageHandler::flaky("telemetry", &[], &["emit_metric"]);
    directory.register_builtin(Arc::clone(&build_tools) as Arc<dyn ToolHandler>).await;
    directory.register_builtin(Arc::clone(&flaky) as Arc<dyn ToolHandler>).await;

    let config = CoreConfig::default();
    ToolConnectionManager::scoped(Arc::clone(&directory), &config, |manager| async move {
        // Stage scoping: the build handler is invisible to the design stage.
        let design = manager.get_tools_for_scope("design", "architect").await;
        assert_eq!(design.len(), 1);
        assert_eq!(design[0].handler, "telemetry");

        let build = manager.get_tools_for_scope("build", "coder").await;
        assert_eq!(build.len(), 3);

        let compiled = manager.call_tool("compile", json!({"target": "debug"})).await;
        assert!(!compiled.is_error);

        // Three consecutive failures disable the telemetry handler...
        for _ in 0..3 {
            assert!(manager.call_tool("emit_metric", Value::Null).await.is_error);
        }
        // ...after which calls short-circuit without reaching it.
        let frozen = flaky.calls.load(Ordering::SeqCst);
        assert!(manager.call_tool("emit_metric", Value::Null).await.is_error);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), frozen);

        // The healthy handler is unaffected.
        assert!(!manager.call_tool("lint", Value::Null).await.is_error);
    })
    .await;

    // A fresh manager in the same process starts clean: broken is
    // per-manager, not per-directory.
    let fresh = ToolConnectionManager::new(directory);
    fresh.get_tools_for_scope("build", "coder").await;
    assert!(!fresh.handler_status("telemetry").await.unwrap().failed);

    Ok(())
}
