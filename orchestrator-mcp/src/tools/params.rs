//! Tool-call parameter and response wire shapes (spec §6).
//!
//! `orchestrator-core` types (`ExecutionResult`, `AggregatedResult`, ...)
//! don't derive `Serialize` — several hold `std::time::Instant`, which
//! can't be serialized — so this module converts them field by field into
//! wire structs that do.

use orchestrator_core::aggregator::{AggregatedResult, FailedTaskSummary, FailureImpact, Statistics, TaskResultSummary};
use orchestrator_core::dag::ExecutionStatus;
use orchestrator_core::executor::ExecutionResult;
use orchestrator_core::OrchestrationReport;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::helpers::value_to_json;

/// `ExecutionStatus` has no wire-id method of its own in `orchestrator-core`
/// since it's an internal DAG-node concept; the mapping lives here instead
/// of widening that crate's public surface for a presentation concern.
pub fn execution_status_wire_id(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Pending => "pending",
        ExecutionStatus::InProgress => "in_progress",
        ExecutionStatus::Success => "success",
        ExecutionStatus::Failure => "failure",
        ExecutionStatus::Skipped => "skipped",
    }
}

fn failure_impact_wire_id(impact: FailureImpact) -> &'static str {
    match impact {
        FailureImpact::Critical => "critical",
        FailureImpact::Minor => "minor",
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    #[schemars(description = "Free-text description of the work to decompose and execute")]
    pub request: String,
    #[schemars(description = "Abort remaining sibling tasks as soon as one task fails (default: false)")]
    #[serde(default)]
    pub fail_fast: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateTaskResponse {
    pub task_id: String,
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskIdParams {
    #[schemars(description = "Id returned by create_task")]
    pub task_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WaitForTaskParams {
    #[schemars(description = "Id returned by create_task")]
    pub task_id: String,
    #[schemars(description = "How long to wait before returning a timeout status, in milliseconds (default: 30000)")]
    #[serde(default = "default_wait_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CancelTaskResponse {
    pub task_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskListEntry {
    pub task_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskListEntry>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ResultErrorWire {
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskResultWire {
    pub task_id: String,
    pub description: String,
    pub agent: String,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<ResultErrorWire>,
    pub duration_ms: u64,
    pub retry_count: u32,
    pub artifacts: Vec<String>,
}

impl From<&ExecutionResult> for TaskResultWire {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            task_id: result.task_id.clone(),
            description: result.description.clone(),
            agent: result.agent.clone(),
            status: execution_status_wire_id(result.status).to_string(),
            result: result.result.as_ref().map(value_to_json),
            error: result.error.as_ref().map(|e| ResultErrorWire {
                message: e.message.clone(),
                code: e.code.clone(),
            }),
            duration_ms: result.duration.as_millis() as u64,
            retry_count: result.retry_count,
            artifacts: result.artifacts.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct StatisticsWire {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub parallelism_achieved: f64,
}

impl From<&Statistics> for StatisticsWire {
    fn from(stats: &Statistics) -> Self {
        Self {
            total: stats.total,
            successful: stats.successful,
            failed: stats.failed,
            skipped: stats.skipped,
            total_duration_ms: stats.total_duration.as_millis() as u64,
            parallelism_achieved: stats.parallelism_achieved,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskSummaryWire {
    pub task_id: String,
    pub status: String,
    pub key_findings: Option<String>,
    pub artifacts: Vec<String>,
}

impl From<&TaskResultSummary> for TaskSummaryWire {
    fn from(summary: &TaskResultSummary) -> Self {
        Self {
            task_id: summary.task_id.clone(),
            status: execution_status_wire_id(summary.status).to_string(),
            key_findings: summary.key_findings.clone(),
            artifacts: summary.artifacts.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FailedTaskWire {
    pub task_id: String,
    pub description: String,
    pub impact: String,
    pub error_message: String,
}

impl From<&FailedTaskSummary> for FailedTaskWire {
    fn from(summary: &FailedTaskSummary) -> Self {
        Self {
            task_id: summary.task_id.clone(),
            description: summary.description.clone(),
            impact: failure_impact_wire_id(summary.impact).to_string(),
            error_message: summary.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct AggregatedReportWire {
    pub statistics: StatisticsWire,
    pub task_results: Vec<TaskSummaryWire>,
    pub failed_tasks: Vec<FailedTaskWire>,
    pub summary: String,
    pub next_steps: Vec<String>,
}

impl From<&AggregatedResult> for AggregatedReportWire {
    fn from(aggregated: &AggregatedResult) -> Self {
        Self {
            statistics: (&aggregated.statistics).into(),
            task_results: aggregated.task_results.iter().map(Into::into).collect(),
            failed_tasks: aggregated.failed_tasks.iter().map(Into::into).collect(),
            summary: aggregated.summary.clone(),
            next_steps: aggregated.next_steps.clone(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct OrchestrationReportWire {
    pub session_id: String,
    pub decomposition_reasoning: Option<String>,
    pub results: Vec<TaskResultWire>,
    pub aggregated: AggregatedReportWire,
}

impl From<&OrchestrationReport> for OrchestrationReportWire {
    fn from(report: &OrchestrationReport) -> Self {
        Self {
            session_id: report.session_id.clone(),
            decomposition_reasoning: report.decomposition_reasoning.clone(),
            results: report.results.iter().map(Into::into).collect(),
            aggregated: (&report.aggregated).into(),
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: String,
    pub report: Option<OrchestrationReportWire>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContextSetParams {
    #[schemars(description = "\"session\" or \"global\"")]
    pub scope: String,
    #[schemars(description = "Required when scope is \"session\"")]
    pub session_id: Option<String>,
    pub key: String,
    #[schemars(description = "Arbitrary JSON value to store under `key`")]
    pub value: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContextGetParams {
    #[schemars(description = "\"session\" or \"global\"")]
    pub scope: String,
    #[schemars(description = "Required when scope is \"session\"")]
    pub session_id: Option<String>,
    pub key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestRoleParams {
    #[schemars(description = "Free-text description of the work to route")]
    pub query: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SuggestRoleResponse {
    pub role: String,
    pub confidence: f64,
    pub reasoning: String,
}
