//! Task Decomposer: turns a free-text request into a validated task list
//! (spec §4.1).

use crate::provider::router::ModelRouter;
use crate::provider::ModelRequest;
use crate::role::AgentRole;
use crate::task::{Complexity, Task, TaskType};
use orchestrator_shared::error::OrchestratorError;
use std::collections::HashMap;
use std::sync::Arc;

const DECOMPOSITION_SYSTEM_PROMPT: &str = "You are the architect of a multi-agent system. Break the user's \
request into a JSON object {\"tasks\": [{\"id\", \"description\", \"type\", \"dependencies\", \
\"estimatedComplexity\", \"priority\"}], \"reasoning\": \"...\"}. Valid `type` values: research, implement, \
review, design, document, test, analyze.";

#[derive(Debug, Clone)]
pub struct DecompositionResult {
    pub tasks: Vec<Task>,
    pub reasoning: Option<String>,
    pub original_request: String,
    pub success: bool,
    pub error: Option<String>,
}

pub struct TaskDecomposer {
    router: Arc<ModelRouter>,
}

impl TaskDecomposer {
    pub fn new(router: Arc<ModelRouter>) -> Self {
        Self { router }
    }

    /// `decompose(request)` (spec §4.1). Never returns `Err`: every failure
    /// mode is reported as `{success: false, error}`.
    pub async fn decompose(&self, request: &str) -> DecompositionResult {
        let response = self
            .router
            .execute_with_fallback(AgentRole::Architect, |model| {
                ModelRequest::simple(model, DECOMPOSITION_SYSTEM_PROMPT, request).with_temperature(0.3)
            })
            .await;

        let text = match response {
            Ok(response) => response.content,
            Err(err) => return failure(request, format!("model call failed: {err}")),
        };

        let Some(object) = first_balanced_json_object(&text) else {
            return failure(request, "no JSON object found in model response".to_string());
        };

        let parsed: serde_json::Value = match serde_json::from_str(&object) {
            Ok(value) => value,
            Err(err) => return failure(request, format!("malformed JSON object: {err}")),
        };

        let Some(raw_tasks) = parsed.get("tasks").and_then(|v| v.as_array()) else {
            return failure(request, "response is missing a `tasks` array".to_string());
        };

        if raw_tasks.is_empty() {
            return failure(request, "decomposition produced zero tasks".to_string());
        }

        let reasoning = parsed.get("reasoning").and_then(|v| v.as_str()).map(|s| s.to_string());

        let mut tasks: Vec<Task> = raw_tasks
            .iter()
            .enumerate()
            .map(|(index, raw)| normalize_task(raw, index))
            .collect();

        rewrite_duplicate_ids(&mut tasks);
        drop_dangling_dependencies(&mut tasks);

        if let Some(cycle_path) = detect_cycle(&tasks) {
            return failure(request, format!("decomposition failed: circular dependency detected: {cycle_path}"));
        }

        DecompositionResult {
            tasks,
            reasoning,
            original_request: request.to_string(),
            success: true,
            error: None,
        }
    }
}

fn failure(request: &str, error: String) -> DecompositionResult {
    tracing::warn!(error = %error, "task decomposition failed");
    DecompositionResult {
        tasks: Vec::new(),
        reasoning: None,
        original_request: request.to_string(),
        success: false,
        error: Some(error),
    }
}

/// Scans `text` for the first `{...}` span with balanced braces, ignoring
/// braces that appear inside string literals (spec §4.1: "scanned for the
/// first balanced JSON object").
fn first_balanced_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn normalize_task(raw: &serde_json::Value, index: usize) -> Task {
    let id = raw
        .get("id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("t{}", index + 1));

    let description = raw
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let raw_type = raw.get("type").and_then(|v| v.as_str()).unwrap_or("implement");
    let (task_type, known) = TaskType::parse_or_default(raw_type);
    if !known {
        tracing::warn!(task_id = %id, raw_type, "unknown task type, defaulting to implement");
    }

    let dependencies = raw
        .get("dependencies")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default();

    let complexity = raw
        .get("estimatedComplexity")
        .and_then(|v| v.as_str())
        .map(Complexity::parse_or_default)
        .unwrap_or(Complexity::Medium);

    let priority = raw.get("priority").and_then(|v| v.as_u64()).map(|p| p as u32).unwrap_or(1);

    Task::new(id, description, task_type)
        .with_dependencies(dependencies)
        .with_complexity(complexity)
        .with_priority(priority)
}

/// Rewrites any id collision in place, appending a random 8-char suffix to
/// every occurrence after the first (spec §4.1).
fn rewrite_duplicate_ids(tasks: &mut [Task]) {
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut renames: Vec<(usize, String)> = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let count = seen.entry(task.id.clone()).or_insert(0);
        if *count > 0 {
            let suffix: String = (0..8)
                .map(|_| {
                    let charset = b"abcdefghijklmnopqrstuvwxyz0123456789";
                    let idx = fastrand::usize(..charset.len());
                    charset[idx] as char
                })
                .collect();
            renames.push((index, format!("{}-{}", task.id, suffix)));
        }
        *count += 1;
    }

    for (index, new_id) in renames {
        let old_id = tasks[index].id.clone();
        tracing::warn!(old_id = %old_id, new_id = %new_id, "duplicate task id rewritten");
        tasks[index].id = new_id;
    }
}

/// Drops any dependency id that does not refer to a task in the set,
/// warning for each dropped edge (spec §4.1, §4.3).
fn drop_dangling_dependencies(tasks: &mut [Task]) {
    let known_ids: std::collections::HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    for task in tasks.iter_mut() {
        let before = task.dependencies.len();
        task.dependencies.retain(|dep| known_ids.contains(dep));
        if task.dependencies.len() != before {
            tracing::warn!(task_id = %task.id, "dropped dangling dependency reference");
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Visiting,
    Visited,
}

/// Three-color DFS cycle detection; returns the cycle path rendered as
/// `a -> b -> c` when a back edge is found (spec §4.1, §4.3).
fn detect_cycle(tasks: &[Task]) -> Option<String> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut colors: HashMap<&str, Color> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    for task in tasks {
        if colors.contains_key(task.id.as_str()) {
            continue;
        }
        if let Some(cycle) = visit(task.id.as_str(), &by_id, &mut colors, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    id: &'a str,
    by_id: &HashMap<&'a str, &'a Task>,
    colors: &mut HashMap<&'a str, Color>,
    path: &mut Vec<&'a str>,
) -> Option<String> {
    colors.insert(id, Color::Visiting);
    path.push(id);

    if let Some(task) = by_id.get(id) {
        for dep in &task.dependencies {
            match colors.get(dep.as_str()) {
                Some(Color::Visiting) => {
                    let start = path.iter().position(|p| *p == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[start..].to_vec();
                    cycle.push(dep.as_str());
                    return Some(cycle.join(" -> "));
                }
                Some(Color::Visited) => continue,
                None => {
                    if let Some(cycle) = visit(dep.as_str(), by_id, colors, path) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    path.pop();
    colors.insert(id, Color::Visited);
    None
}

pub fn decomposition_error(message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Decomposition(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::health::ProviderHealthManager;
    use crate::provider::router::{ProviderModelPair, RoleRoute};
    use crate::provider::{ModelApiError, ModelResponse, ProviderAdapter, TokenUsage};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct ScriptedAdapter {
        content: String,
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
            Ok(ModelResponse {
                content: self.content.clone(),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                model: request.model,
                tokens_used: TokenUsage::default(),
                fallback_info: None,
            })
        }
    }

    fn decomposer(content: &str) -> TaskDecomposer {
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
        adapters.insert(
            "fake".into(),
            Arc::new(ScriptedAdapter {
                content: content.to_string(),
            }),
        );
        let router = Arc::new(ModelRouter::new(routes, adapters, Arc::new(ProviderHealthManager::new())));
        TaskDecomposer::new(router)
    }

    #[tokio::test]
    async fn parses_well_formed_task_list() {
        let response = r#"Here you go: {"tasks": [
            {"id": "t1", "description": "research the API", "type": "research", "dependencies": []},
            {"id": "t2", "description": "implement it", "type": "implement", "dependencies": ["t1"]}
        ], "reasoning": "straightforward"}"#;
        let result = decomposer(response).decompose("build an API client").await;
        assert!(result.success);
        assert_eq!(result.tasks.len(), 2);
        assert_eq!(result.reasoning.as_deref(), Some("straightforward"));
    }

    #[tokio::test]
    async fn missing_fields_are_normalized_with_defaults() {
        let response = r#"{"tasks": [{"description": "do something"}]}"#;
        let result = decomposer(response).decompose("x").await;
        assert!(result.success);
        assert_eq!(result.tasks[0].id, "t1");
        assert_eq!(result.tasks[0].task_type, TaskType::Implement);
        assert_eq!(result.tasks[0].complexity, Complexity::Medium);
        assert_eq!(result.tasks[0].priority, Some(1));
    }

    #[tokio::test]
    async fn no_json_object_is_a_reported_failure_not_a_panic() {
        let result = decomposer("I cannot help with that.").decompose("x").await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn empty_tasks_array_is_a_failure() {
        let result = decomposer(r#"{"tasks": []}"#).decompose("x").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("zero tasks"));
    }

    #[tokio::test]
    async fn dangling_dependency_is_dropped_not_fatal() {
        let response = r#"{"tasks": [{"id": "t1", "description": "a", "dependencies": ["ghost"]}]}"#;
        let result = decomposer(response).decompose("x").await;
        assert!(result.success);
        assert!(result.tasks[0].dependencies.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_are_rewritten_not_fatal() {
        let response = r#"{"tasks": [
            {"id": "t1", "description": "a"},
            {"id": "t1", "description": "b"}
        ]}"#;
        let result = decomposer(response).decompose("x").await;
        assert!(result.success);
        assert_ne!(result.tasks[0].id, result.tasks[1].id);
    }

    #[tokio::test]
    async fn cycle_is_reported_as_failure_with_path() {
        let response = r#"{"tasks": [
            {"id": "t1", "description": "a", "dependencies": ["t2"]},
            {"id": "t2", "description": "b", "dependencies": ["t1"]}
        ]}"#;
        let result = decomposer(response).decompose("x").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("circular dependency"));
    }

    #[test]
    fn balanced_object_scan_ignores_braces_inside_strings() {
        let text = r#"prefix {"a": "a { b } c", "b": 1} suffix"#;
        let object = first_balanced_json_object(text).unwrap();
        assert_eq!(object, r#"{"a": "a { b } c", "b": 1}"#);
    }
}
