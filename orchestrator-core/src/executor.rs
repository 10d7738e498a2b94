//! Parallel Executor: level-by-level scheduling with bounded batches,
//! retries, timeouts, fail-fast/skip semantics (spec §4.4).

use crate::agent::{AgentError, AgentInputContext, AgentManager, AgentStatus, CreateAgentParams};
use crate::dag::{DagNode, ExecutionDag, ExecutionStatus};
use orchestrator_shared::error::OrchestratorError;
use orchestrator_shared::retry::{RetryOutcome, RetryStrategy};
use orchestrator_shared::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Structured error payload carried by a failed `ExecutionResult` (spec §3).
#[derive(Debug, Clone)]
pub struct ResultError {
    pub message: String,
    pub code: Option<String>,
}

/// Terminal outcome of one task's execution (spec §3 "Execution Result").
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub task_id: String,
    pub description: String,
    pub agent: String,
    pub status: ExecutionStatus,
    pub result: Option<Value>,
    pub error: Option<ResultError>,
    pub duration: Duration,
    pub retry_count: u32,
    pub started_at: Instant,
    pub completed_at: Instant,
    pub artifacts: Vec<String>,
}

/// Per-run configuration and state the executor consults and mutates
/// (spec §3 "Orchestration Context").
pub struct OrchestrationContext {
    pub session_id: String,
    pub request: String,
    pub started_at: Instant,
    pub shared_context: Mutex<HashMap<String, Value>>,
    pub max_parallel_tasks: usize,
    pub task_timeout_ms: u64,
    pub max_retries: u32,
    pub fail_fast: bool,
}

impl OrchestrationContext {
    pub fn new(session_id: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            request: request.into(),
            started_at: Instant::now(),
            shared_context: Mutex::new(HashMap::new()),
            max_parallel_tasks: 5,
            task_timeout_ms: 300_000,
            max_retries: 3,
            fail_fast: false,
        }
    }
}

fn default_retry_classifier(error: &AgentError) -> bool {
    error.retryable
}

pub struct ParallelExecutor {
    agent_manager: Arc<AgentManager>,
}

impl ParallelExecutor {
    pub fn new(agent_manager: Arc<AgentManager>) -> Self {
        Self { agent_manager }
    }

    /// `execute(dag, ctx)` (spec §4.4). Returns a `DagValidation` error
    /// immediately if the DAG itself is invalid; task-level failures never
    /// propagate as `Err` (spec §7 propagation rule).
    pub async fn execute(
        &self,
        mut dag: ExecutionDag,
        ctx: &OrchestrationContext,
    ) -> Result<Vec<ExecutionResult>, OrchestratorError> {
        if !dag.is_valid {
            return Err(OrchestratorError::DagValidation(
                dag.validation_error.unwrap_or_else(|| "DAG is invalid".to_string()),
            ));
        }

        let mut results: HashMap<String, ExecutionResult> = HashMap::new();
        let levels = dag.levels.clone();

        'levels: for level in levels {
            let (runnable, skipped): (Vec<String>, Vec<String>) = level.into_iter().partition(|task_id| {
                let node = dag.node(task_id).expect("leveled id must exist in DAG");
                !node
                    .dependencies
                    .iter()
                    .any(|dep| !matches!(results.get(dep).map(|r| r.status), Some(ExecutionStatus::Success)))
            });

            for task_id in &skipped {
                let node = dag.node(task_id).expect("leveled id must exist in DAG");
                let failed_deps: Vec<&str> = node
                    .dependencies
                    .iter()
                    .filter(|dep| !matches!(results.get(*dep).map(|r| r.status), Some(ExecutionStatus::Success)))
                    .map(|s| s.as_str())
                    .collect();
                let reason = format!("Skipped: dependency failed: {}", failed_deps.join(", "));
                dag.set_status(task_id, ExecutionStatus::Skipped);
                results.insert(task_id.clone(), skipped_result(node, reason));
            }

            for batch in runnable.chunks(ctx.max_parallel_tasks.max(1)) {
                let mut handles = Vec::new();
                for task_id in batch {
                    dag.set_status(task_id, ExecutionStatus::InProgress);
                    let node = dag.node(task_id).expect("leveled id must exist in DAG").clone();
                    let dependency_results = gather_dependency_results(&node, &results);
                    handles.push(self.execute_task_with_retry(&node, ctx, dependency_results));
                }

                let batch_results = futures::future::join_all(handles).await;
                let mut any_failure = false;
                for result in batch_results {
                    if result.status == ExecutionStatus::Success {
                        let mut shared = ctx.shared_context.lock().await;
                        if let Some(value) = &result.result {
                            shared.insert(result.task_id.clone(), value.clone());
                        }
                    } else if result.status == ExecutionStatus::Failure {
                        any_failure = true;
                    }
                    dag.set_status(&result.task_id, result.status);
                    results.insert(result.task_id.clone(), result);
                }

                if any_failure && ctx.fail_fast {
                    skip_remaining(&dag, &mut results);
                    break 'levels;
                }
            }
        }

        let mut ordered: Vec<ExecutionResult> = results.into_values().collect();
        ordered.sort_by_key(|r| dag.node(&r.task_id).map(|n| n.insertion_index).unwrap_or(usize::MAX));
        Ok(ordered)
    }

    async fn execute_task_with_retry(
        &self,
        node: &DagNode,
        ctx: &OrchestrationContext,
        dependency_results: HashMap<String, Value>,
    ) -> ExecutionResult {
        let started_at = Instant::now();
        let strategy = RetryStrategy::new(ctx.max_retries.max(1));

        let shared_snapshot = { ctx.shared_context.lock().await.clone() };
        let input_context = AgentInputContext {
            session_id: ctx.session_id.clone(),
            request: ctx.request.clone(),
            task_id: node.task_id.clone(),
            dependencies: node.dependencies.clone(),
            dependency_results,
            task_context: node.task.context.clone(),
            shared_context: shared_snapshot,
        };

        let role = node.role;
        let task_text = node.task.description.clone();
        let session_id = ctx.session_id.clone();
        let priority = node.task.effective_priority();
        let timeout_ms = ctx.task_timeout_ms;
        let manager = self.agent_manager.clone();
        let task_id = node.task_id.clone();

        let outcome: RetryOutcome<Value, AgentError> = strategy
            .run(&default_retry_classifier, |attempt| {
                let manager = manager.clone();
                let input_context = input_context.clone();
                let task_text = task_text.clone();
                let session_id = session_id.clone();
                let task_id = task_id.clone();
                async move {
                    let agent_id = manager
                        .create_agent(CreateAgentParams {
                            role,
                            task: task_text,
                            input_context,
                            session_id,
                            priority,
                            idempotency_key: None,
                            system_prompt: format!("You are acting as the {role} role."),
                            temperature: 0.3,
                        })
                        .await;

                    tracing::debug!(task_id = %task_id, attempt, "dispatched agent attempt");

                    match manager.wait_for_completion(&agent_id, timeout_ms).await {
                        Ok(AgentStatus::Completed) => {
                            let content = manager
                                .get_result(&agent_id)
                                .await
                                .map(|response| response.content)
                                .unwrap_or_default();
                            Ok(Value::String(content))
                        }
                        Ok(_) => {
                            let error = manager.get_error(&agent_id).await.unwrap_or(AgentError {
                                message: "agent did not complete successfully".to_string(),
                                code: Some("AgentFailed".to_string()),
                                retryable: false,
                            });
                            Err(error)
                        }
                        Err(err) => Err(err),
                    }
                }
            })
            .await;

        let completed_at = Instant::now();
        let duration = completed_at.duration_since(started_at);

        match outcome {
            RetryOutcome::Success { value, attempts } => ExecutionResult {
                task_id: node.task_id.clone(),
                description: node.task.description.clone(),
                agent: node.role.to_string(),
                status: ExecutionStatus::Success,
                result: Some(value),
                error: None,
                duration,
                retry_count: attempts.saturating_sub(1),
                started_at,
                completed_at,
                artifacts: Vec::new(),
            },
            RetryOutcome::Failure { error, attempts } => ExecutionResult {
                task_id: node.task_id.clone(),
                description: node.task.description.clone(),
                agent: node.role.to_string(),
                status: ExecutionStatus::Failure,
                result: None,
                error: Some(ResultError {
                    message: error.message,
                    code: error.code,
                }),
                duration,
                retry_count: attempts.saturating_sub(1),
                started_at,
                completed_at,
                artifacts: Vec::new(),
            },
        }
    }
}

fn gather_dependency_results(node: &DagNode, results: &HashMap<String, ExecutionResult>) -> HashMap<String, Value> {
    node.dependencies
        .iter()
        .filter_map(|dep| results.get(dep).and_then(|r| r.result.clone()).map(|v| (dep.clone(), v)))
        .collect()
}

fn skipped_result(node: &DagNode, reason: String) -> ExecutionResult {
    let now = Instant::now();
    ExecutionResult {
        task_id: node.task_id.clone(),
        description: node.task.description.clone(),
        agent: node.role.to_string(),
        status: ExecutionStatus::Skipped,
        result: None,
        error: Some(ResultError {
            message: reason,
            code: Some("Skipped".to_string()),
        }),
        duration: Duration::ZERO,
        retry_count: 0,
        started_at: now,
        completed_at: now,
        artifacts: Vec::new(),
    }
}

/// Converts every not-yet-terminal node into a fail-fast skip (spec §4.4:
/// "every task not yet in the result set becomes a skipped result with
/// reason 'Skipped due to fail-fast after task failure.'").
fn skip_remaining(dag: &ExecutionDag, results: &mut HashMap<String, ExecutionResult>) {
    for node in dag.nodes.values() {
        if results.contains_key(&node.task_id) {
            continue;
        }
        results.insert(
            node.task_id.clone(),
            skipped_result(node, "Skipped due to fail-fast after task failure.".to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;
    use crate::dag::DagBuilder;
    use crate::provider::health::ProviderHealthManager;
    use crate::provider::router::{ModelRouter, ProviderModelPair, RoleRoute};
    use crate::provider::{ModelApiError, ModelRequest, ModelResponse, ProviderAdapter, TokenUsage};
    use crate::role::AgentRole;
    use crate::task::{Task, TaskType};
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;

    #[derive(Debug)]
    struct ScriptedAdapter {
        fail_for: Option<String>,
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
            if let Some(needle) = &self.fail_for {
                if request.messages.iter().any(|m| m.content.contains(needle.as_str())) {
                    return Err(ModelApiError {
                        provider: "fake".into(),
                        kind: orchestrator_shared::error::ModelApiErrorKind::Unknown,
                        message: "permanent failure".into(),
                        retryable: Some(false),
                    });
                }
            }
            Ok(ModelResponse {
                content: "ok".into(),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                model: request.model,
                tokens_used: TokenUsage::default(),
                fallback_info: None,
            })
        }
    }

    fn executor(fail_for: Option<&str>) -> ParallelExecutor {
        let mut routes = StdHashMap::new();
        for role in AgentRole::all() {
            routes.insert(
                role,
                RoleRoute {
                    primary: ProviderModelPair {
                        provider: "fake".into(),
                        model: "m1".into(),
                    },
                    primary_fallback_model: None,
                    provider_fallbacks: Vec::new(),
                },
            );
        }
        let mut adapters: StdHashMap<String, Arc<dyn ProviderAdapter>> = StdHashMap::new();
        adapters.insert(
            "fake".into(),
            Arc::new(ScriptedAdapter {
                fail_for: fail_for.map(|s| s.to_string()),
            }),
        );
        let router = Arc::new(ModelRouter::new(routes, adapters, Arc::new(ProviderHealthManager::new())));
        let manager = Arc::new(AgentManager::new(router, 10));
        ParallelExecutor::new(manager)
    }

    fn assignment(id: &str, deps: &[&str], description: &str) -> Assignment {
        let task = Task::new(id, description, TaskType::Implement)
            .with_dependencies(deps.iter().map(|s| s.to_string()).collect());
        Assignment::new(task, AgentRole::Architect, 0.8, "test")
    }

    #[tokio::test]
    async fn linear_chain_all_succeed() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[], "research the topic"),
            assignment("t2", &["t1"], "implement the feature"),
            assignment("t3", &["t2"], "document the feature"),
        ]);
        let ctx = OrchestrationContext::new("session-1", "build something");
        let results = executor(None).execute(dag, &ctx).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == ExecutionStatus::Success));
    }

    #[tokio::test]
    async fn dependency_failure_cascades_to_skip() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[], "research"),
            assignment("t2a", &["t1"], "implement fails here"),
            assignment("t2b", &["t1"], "design ui"),
            assignment("t3", &["t2a", "t2b"], "review code"),
        ]);
        let ctx = OrchestrationContext::new("session-1", "build something");
        let results = executor(Some("fails here")).execute(dag, &ctx).await.unwrap();

        let by_id: HashMap<_, _> = results.into_iter().map(|r| (r.task_id.clone(), r)).collect();
        assert_eq!(by_id["t2a"].status, ExecutionStatus::Failure);
        assert_eq!(by_id["t2b"].status, ExecutionStatus::Success);
        assert_eq!(by_id["t3"].status, ExecutionStatus::Skipped);
        assert!(by_id["t3"].error.as_ref().unwrap().message.contains("t2a"));
    }

    #[tokio::test]
    async fn fail_fast_skips_remaining_levels_immediately() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[], "research"),
            assignment("t2a", &["t1"], "implement fails here"),
            assignment("t2b", &["t1"], "design ui"),
            assignment("t3", &["t2a", "t2b"], "review code"),
        ]);
        let mut ctx = OrchestrationContext::new("session-1", "build something");
        ctx.fail_fast = true;
        let results = executor(Some("fails here")).execute(dag, &ctx).await.unwrap();

        let by_id: HashMap<_, _> = results.into_iter().map(|r| (r.task_id.clone(), r)).collect();
        assert_eq!(by_id["t3"].status, ExecutionStatus::Skipped);
        assert_eq!(
            by_id["t3"].error.as_ref().unwrap().message,
            "Skipped due to fail-fast after task failure."
        );
    }

    #[tokio::test]
    async fn invalid_dag_is_refused() {
        let dag = DagBuilder::new().build(vec![assignment("t1", &["t2"], "a"), assignment("t2", &["t1"], "b")]);
        let ctx = OrchestrationContext::new("session-1", "x");
        let result = executor(None).execute(dag, &ctx).await;
        assert!(matches!(result, Err(OrchestratorError::DagValidation(_))));
    }

    #[tokio::test]
    async fn shared_context_receives_only_successful_results() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[], "research fails here"),
            assignment("t2", &["t1"], "will be skipped"),
        ]);
        let ctx = OrchestrationContext::new("session-1", "x");
        let _ = executor(Some("fails here")).execute(dag, &ctx).await.unwrap();
        let shared = ctx.shared_context.lock().await;
        assert!(!shared.contains_key("t1"));
        assert_eq!(shared.len(), 0);
    }
}
