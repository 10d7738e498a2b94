//! Result Aggregator: statistics, failure impact classification, and a
//! router-generated summary (spec §4.5).

use crate::dag::ExecutionStatus;
use crate::executor::ExecutionResult;
use crate::provider::router::ModelRouter;
use crate::provider::ModelRequest;
use crate::role::AgentRole;
use orchestrator_shared::Value;
use std::sync::Arc;
use std::time::Duration;

const CRITICAL_KEYWORDS: &[&str] = &[
    "architecture",
    "security",
    "auth",
    "database",
    "migration",
    "core",
    "api",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureImpact {
    Critical,
    Minor,
}

#[derive(Debug, Clone)]
pub struct Statistics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration: Duration,
    /// `sum(durations) / totalDuration`, rounded to two decimals; falls
    /// back to 1.0 when `totalDuration` is zero (spec §4.5).
    pub parallelism_achieved: f64,
}

#[derive(Debug, Clone)]
pub struct TaskResultSummary {
    pub task_id: String,
    pub status: ExecutionStatus,
    pub key_findings: Option<String>,
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FailedTaskSummary {
    pub task_id: String,
    pub description: String,
    pub impact: FailureImpact,
    pub error_message: String,
}

#[derive(Debug, Clone)]
pub struct AggregatedResult {
    pub statistics: Statistics,
    pub task_results: Vec<TaskResultSummary>,
    pub failed_tasks: Vec<FailedTaskSummary>,
    pub summary: String,
    pub next_steps: Vec<String>,
}

pub struct ResultAggregator {
    router: Arc<ModelRouter>,
}

impl ResultAggregator {
    pub fn new(router: Arc<ModelRouter>) -> Self {
        Self { router }
    }

    /// `aggregate(results, ctx)` (spec §4.5).
    pub async fn aggregate(&self, results: &[ExecutionResult], request: &str) -> AggregatedResult {
        let statistics = compute_statistics(results);
        let task_results = results.iter().map(task_result_summary).collect();
        let failed_tasks: Vec<FailedTaskSummary> = results
            .iter()
            .filter(|r| r.status == ExecutionStatus::Failure)
            .map(|r| FailedTaskSummary {
                task_id: r.task_id.clone(),
                description: r.description.clone(),
                impact: classify_impact(&r.description),
                error_message: r.error.as_ref().map(|e| e.message.clone()).unwrap_or_default(),
            })
            .collect();

        let (summary, next_steps) = self
            .generate_summary(request, &statistics, &failed_tasks, results)
            .await;

        AggregatedResult {
            statistics,
            task_results,
            failed_tasks,
            summary,
            next_steps,
        }
    }

    async fn generate_summary(
        &self,
        request: &str,
        statistics: &Statistics,
        failed_tasks: &[FailedTaskSummary],
        results: &[ExecutionResult],
    ) -> (String, Vec<String>) {
        let has_critical_failure = failed_tasks.iter().any(|f| f.impact == FailureImpact::Critical);

        let context = build_summary_context(request, statistics, failed_tasks, results);
        let response = self
            .router
            .execute_with_fallback(AgentRole::Architect, |model| {
                ModelRequest::simple(
                    model,
                    "Summarize this orchestration run as a JSON object with `summary` and `nextSteps` fields.",
                    context.clone(),
                )
                .with_temperature(0.3)
            })
            .await;

        match response {
            Ok(response) => match parse_summary_json(&response.content) {
                Some(parsed) => parsed,
                None => (fallback_summary(statistics, has_critical_failure), Vec::new()),
            },
            Err(_) => (fallback_summary(statistics, has_critical_failure), Vec::new()),
        }
    }
}

fn compute_statistics(results: &[ExecutionResult]) -> Statistics {
    let total = results.len();
    let successful = results.iter().filter(|r| r.status == ExecutionStatus::Success).count();
    let failed = results.iter().filter(|r| r.status == ExecutionStatus::Failure).count();
    let skipped = results.iter().filter(|r| r.status == ExecutionStatus::Skipped).count();

    let total_duration = match (
        results.iter().map(|r| r.started_at).min(),
        results.iter().map(|r| r.completed_at).max(),
    ) {
        (Some(start), Some(end)) => end.duration_since(start),
        _ => Duration::ZERO,
    };

    let sum_durations: Duration = results.iter().map(|r| r.duration).sum();
    let parallelism_achieved = if total_duration.is_zero() {
        1.0
    } else {
        round_two_decimals(sum_durations.as_secs_f64() / total_duration.as_secs_f64())
    };

    Statistics {
        total,
        successful,
        failed,
        skipped,
        total_duration,
        parallelism_achieved,
    }
}

fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Extracts `keyFindings` from a result payload (spec §4.5): a string
/// result is truncated to 200 chars; a map result with a `summary` or
/// `keyFindings` string field uses that value truncated to 200 chars;
/// otherwise there is no extraction.
fn task_result_summary(result: &ExecutionResult) -> TaskResultSummary {
    let key_findings = result.result.as_ref().and_then(|value| match value {
        Value::String(_) => Some(value.truncated(200)),
        Value::Map(_) => value
            .get_str_field("summary")
            .or_else(|| value.get_str_field("keyFindings"))
            .map(|s| orchestrator_shared::value::truncate_chars(s, 200)),
        _ => None,
    });

    TaskResultSummary {
        task_id: result.task_id.clone(),
        status: result.status,
        key_findings,
        artifacts: result.artifacts.clone(),
    }
}

fn classify_impact(description: &str) -> FailureImpact {
    let lowered = description.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        FailureImpact::Critical
    } else {
        FailureImpact::Minor
    }
}

fn build_summary_context(
    request: &str,
    statistics: &Statistics,
    failed_tasks: &[FailedTaskSummary],
    results: &[ExecutionResult],
) -> String {
    let result_lines: Vec<String> = results
        .iter()
        .map(|r| {
            let rendered = r
                .result
                .as_ref()
                .map(|v| v.truncated(500))
                .unwrap_or_else(|| r.error.as_ref().map(|e| e.message.clone()).unwrap_or_default());
            format!("- {} [{:?}]: {}", r.task_id, r.status, rendered)
        })
        .collect();

    let failure_lines: Vec<String> = failed_tasks
        .iter()
        .map(|f| format!("- {} ({:?}): {}", f.task_id, f.impact, f.error_message))
        .collect();

    format!(
        "Request: {request}\nStatistics: total={}, successful={}, failed={}, skipped={}\nFailures:\n{}\nResults:\n{}",
        statistics.total,
        statistics.successful,
        statistics.failed,
        statistics.skipped,
        failure_lines.join("\n"),
        result_lines.join("\n"),
    )
}

/// Scans for the first balanced `{...}` object and parses `summary`/`nextSteps`.
fn parse_summary_json(text: &str) -> Option<(String, Vec<String>)> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut end = None;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + offset + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    let candidate = &text[start..end];
    let parsed: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let summary = parsed.get("summary")?.as_str()?.to_string();
    let next_steps = parsed
        .get("nextSteps")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default();
    Some((summary, next_steps))
}

fn fallback_summary(statistics: &Statistics, has_critical_failure: bool) -> String {
    if statistics.failed == 0 && statistics.skipped == 0 {
        format!(
            "All {} tasks completed successfully with a parallelism factor of {:.2}.",
            statistics.total, statistics.parallelism_achieved
        )
    } else if has_critical_failure {
        format!(
            "{} of {} tasks failed, including at least one critical-impact task; {} were skipped as a result.",
            statistics.failed, statistics.total, statistics.skipped
        )
    } else {
        format!(
            "{} of {} tasks failed (non-critical); {} were skipped as a result.",
            statistics.failed, statistics.total, statistics.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::ExecutionStatus;
    use crate::provider::health::ProviderHealthManager;
    use crate::provider::router::{ProviderModelPair, RoleRoute};
    use crate::provider::{ModelApiError, ModelResponse, ProviderAdapter, TokenUsage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Instant;

    #[derive(Debug)]
    struct JsonSummaryAdapter;

    #[async_trait]
    impl ProviderAdapter for JsonSummaryAdapter {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
            Ok(ModelResponse {
                content: r#"{"summary": "done", "nextSteps": ["ship it"]}"#.to_string(),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                model: request.model,
                tokens_used: TokenUsage::default(),
                fallback_info: None,
            })
        }
    }

    fn aggregator() -> ResultAggregator {
        let mut routes = HashMap::new();
        routes.insert(
            AgentRole::Architect,
            RoleRoute {
                primary: ProviderModelPair {
                    provider: "fake".into(),
                    model: "m1".into(),
                },
                primary_fallback_model: None,
                provider_fallbacks: Vec::new(),
            },
        );
        let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert("fake".into(), Arc::new(JsonSummaryAdapter));
        let router = Arc::new(ModelRouter::new(routes, adapters, Arc::new(ProviderHealthManager::new())));
        ResultAggregator::new(router)
    }

    fn result(id: &str, status: ExecutionStatus, description: &str) -> ExecutionResult {
        let now = Instant::now();
        ExecutionResult {
            task_id: id.into(),
            description: description.into(),
            agent: "architect".into(),
            status,
            result: if status == ExecutionStatus::Success {
                Some(Value::String("did it".into()))
            } else {
                None
            },
            error: if status != ExecutionStatus::Success {
                Some(crate::executor::ResultError {
                    message: "boom".into(),
                    code: None,
                })
            } else {
                None
            },
            duration: Duration::from_millis(10),
            retry_count: 0,
            started_at: now,
            completed_at: now + Duration::from_millis(10),
            artifacts: Vec::new(),
        }
    }

    #[test]
    fn statistics_total_equals_sum_of_parts() {
        let results = vec![
            result("t1", ExecutionStatus::Success, "implement"),
            result("t2", ExecutionStatus::Failure, "security audit"),
            result("t3", ExecutionStatus::Skipped, "depends on t2"),
        ];
        let stats = compute_statistics(&results);
        assert_eq!(stats.total, stats.successful + stats.failed + stats.skipped);
    }

    #[test]
    fn critical_keyword_in_description_marks_critical_impact() {
        assert_eq!(classify_impact("run the database migration"), FailureImpact::Critical);
        assert_eq!(classify_impact("fix a typo in the README"), FailureImpact::Minor);
    }

    #[tokio::test]
    async fn aggregate_parses_router_summary_json() {
        let results = vec![result("t1", ExecutionStatus::Success, "implement feature")];
        let aggregated = aggregator().aggregate(&results, "build a thing").await;
        assert_eq!(aggregated.summary, "done");
        assert_eq!(aggregated.next_steps, vec!["ship it".to_string()]);
    }

    #[test]
    fn failed_tasks_only_populated_on_failure() {
        let results = vec![result("t1", ExecutionStatus::Success, "implement")];
        let failed: Vec<_> = results.iter().filter(|r| r.status == ExecutionStatus::Failure).collect();
        assert!(failed.is_empty());
    }
}
