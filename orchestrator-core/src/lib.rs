//! Task decomposition, DAG scheduling, and multi-provider model routing.
//!
//! Data flow (spec §2): `request → Decomposer → [tasks] → Selector (per
//! task) → [assignments] → DagBuilder → [levels] → Executor (uses
//! AgentManager → ModelRouter → ProviderAdapter, guarded by
//! ProviderHealthManager) → [results] → Aggregator → final report`.

pub mod agent;
pub mod aggregator;
pub mod assignment;
pub mod dag;
pub mod decomposer;
pub mod executor;
pub mod provider;
pub mod role;
pub mod selector;
pub mod task;

use agent::AgentManager;
use aggregator::{AggregatedResult, ResultAggregator};
use assignment::Assignment;
use dag::DagBuilder;
use decomposer::TaskDecomposer;
use executor::{ExecutionResult, OrchestrationContext, ParallelExecutor};
use orchestrator_shared::config::OrchestratorConfig;
use orchestrator_shared::error::OrchestratorError;
use provider::health::ProviderHealthManager;
use provider::router::{default_routes, ModelRouter};
use provider::ProviderAdapter;
use selector::AgentSelector;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// End-to-end outcome of one `run()` call: the decomposition metadata the
/// caller may want for diagnostics, plus the aggregated report.
#[derive(Debug, Clone)]
pub struct OrchestrationReport {
    pub session_id: String,
    pub decomposition_reasoning: Option<String>,
    pub results: Vec<ExecutionResult>,
    pub aggregated: AggregatedResult,
}

/// Wires the five components into the single pipeline described in spec §2.
/// One instance is shared across sessions; each `run()` call gets its own
/// `OrchestrationContext`.
pub struct Orchestrator {
    config: OrchestratorConfig,
    decomposer: TaskDecomposer,
    selector: AgentSelector,
    dag_builder: DagBuilder,
    executor: ParallelExecutor,
    aggregator: ResultAggregator,
}

impl Orchestrator {
    pub fn new(adapters: HashMap<String, Arc<dyn ProviderAdapter>>, config: OrchestratorConfig) -> Self {
        let health = Arc::new(ProviderHealthManager::new());
        let router = Arc::new(ModelRouter::new(default_routes(), adapters, health));
        let agent_manager = Arc::new(AgentManager::new(router.clone(), config.max_parallel_agents));

        Self {
            config,
            decomposer: TaskDecomposer::new(router.clone()),
            selector: AgentSelector::new(),
            dag_builder: DagBuilder::new(),
            executor: ParallelExecutor::new(agent_manager),
            aggregator: ResultAggregator::new(router),
        }
    }

    /// Runs the full pipeline for one free-text request (spec §2 data flow).
    /// `fail_fast` is per-run since it's a caller-supplied execution mode,
    /// not process-wide configuration.
    pub async fn run(&self, request: &str, fail_fast: bool) -> Result<OrchestrationReport, OrchestratorError> {
        let session_id = Uuid::new_v4().to_string();

        let decomposition = self.decomposer.decompose(request).await;
        if !decomposition.success {
            return Err(OrchestratorError::Decomposition(
                decomposition.error.unwrap_or_else(|| "decomposition failed".to_string()),
            ));
        }

        let assignments: Vec<Assignment> = decomposition
            .tasks
            .iter()
            .map(|task| self.selector.select(task))
            .collect();

        let dag = self.dag_builder.build(assignments);
        if !dag.is_valid {
            return Err(OrchestratorError::DagValidation(
                dag.validation_error.unwrap_or_else(|| "DAG is invalid".to_string()),
            ));
        }

        let mut ctx = OrchestrationContext::new(session_id.clone(), request.to_string());
        ctx.max_parallel_tasks = self.config.max_parallel_tasks;
        ctx.task_timeout_ms = self.config.task_timeout.as_millis() as u64;
        ctx.max_retries = self.config.max_retries;
        ctx.fail_fast = fail_fast;

        let results = self.executor.execute(dag, &ctx).await?;
        let aggregated = self.aggregator.aggregate(&results, request).await;

        Ok(OrchestrationReport {
            session_id,
            decomposition_reasoning: decomposition.reasoning,
            results,
            aggregated,
        })
    }
}
