//! MCP `ServerHandler` implementation exposing the orchestrator as 8
//! tool-call methods (spec §6): create/poll/wait/cancel/list background
//! orchestration runs, set/read shared-context entries, and suggest an
//! agent role for a free-text query.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};

use orchestrator_core::selector::AgentSelector;
use orchestrator_core::task::{Task, TaskType};
use orchestrator_core::Orchestrator;
use orchestrator_shared::Value;

use crate::context_store::{ContextScope, ContextStore};
use crate::task_registry::{TaskRegistry, TaskSnapshot};
use crate::tools::*;

fn snapshot_to_response(task_id: String, snapshot: TaskSnapshot) -> TaskStatusResponse {
    TaskStatusResponse {
        task_id,
        status: snapshot.status.wire_id().to_string(),
        report: snapshot.report.as_ref().map(Into::into),
        error: snapshot.error,
    }
}

/// MCP server handler wrapping the orchestrator's background-task registry,
/// caller-facing context store, and the role selector.
#[derive(Debug, Clone)]
pub struct OrchestratorMcpServer {
    tasks: Arc<TaskRegistry>,
    context: Arc<ContextStore>,
    selector: Arc<AgentSelector>,
    tool_router: ToolRouter<Self>,
}

impl OrchestratorMcpServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tasks: Arc::new(TaskRegistry::new(orchestrator)),
            context: Arc::new(ContextStore::new()),
            selector: Arc::new(AgentSelector::new()),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for OrchestratorMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "orchestrator-mcp".to_string(),
                title: Some("Agent Orchestrator MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some(
                    "MCP server exposing a model-agnostic agent orchestrator: task decomposition, \
                     DAG scheduling, and multi-provider routing, behind a background-task tool API"
                        .to_string(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Describe the work you want done as free text and call create_task. It runs in \
                 the background; poll it with get_task or block on wait_for_task. Use cancel_task \
                 to abandon a run early and list_tasks to see everything currently tracked. \
                 context_set/context_get hold small values across calls, scoped to a session id or \
                 shared globally. suggest_role routes a free-text query to one of the six agent \
                 roles without running a full orchestration."
                    .to_string(),
            ),
        }
    }
}

#[tool_router(router = tool_router)]
impl OrchestratorMcpServer {
    /// Decompose and execute a free-text request in the background.
    #[tool(
        name = "create_task",
        description = "Decompose a free-text request into a task DAG and execute it across agent roles in the background. Returns a task_id immediately; poll with get_task or block with wait_for_task."
    )]
    pub async fn create_task(&self, Parameters(params): Parameters<CreateTaskParams>) -> String {
        let task_id = self.tasks.create_task(params.request, params.fail_fast).await;
        serde_json::to_string(&CreateTaskResponse { task_id }).unwrap_or_else(|e| error_json("serialization_error", &e.to_string()))
    }

    /// Poll a background orchestration run without blocking.
    #[tool(
        name = "get_task",
        description = "Return the current status of a background orchestration run started by create_task, without blocking. Includes the full report once the run is complete."
    )]
    pub async fn get_task(&self, Parameters(params): Parameters<TaskIdParams>) -> String {
        match self.tasks.snapshot(&params.task_id).await {
            Some(snapshot) => serde_json::to_string(&snapshot_to_response(params.task_id, snapshot))
                .unwrap_or_else(|e| error_json("serialization_error", &e.to_string())),
            None => error_json("task_not_found", &format!("task '{}' not found", params.task_id)),
        }
    }

    /// Block until a background orchestration run reaches a terminal status.
    #[tool(
        name = "wait_for_task",
        description = "Block until a background orchestration run reaches a terminal status (completed, failed, cancelled, or timeout), or until timeout_ms elapses."
    )]
    pub async fn wait_for_task(&self, Parameters(params): Parameters<WaitForTaskParams>) -> String {
        match self.tasks.wait(&params.task_id, params.timeout_ms).await {
            Ok(snapshot) => serde_json::to_string(&snapshot_to_response(params.task_id, snapshot))
                .unwrap_or_else(|e| error_json("serialization_error", &e.to_string())),
            Err(message) => error_json("task_not_found", &message),
        }
    }

    /// Cancel a non-terminal background orchestration run.
    #[tool(
        name = "cancel_task",
        description = "Cancel a background orchestration run that hasn't reached a terminal status yet. Returns cancelled=false if the run was already finished or doesn't exist."
    )]
    pub async fn cancel_task(&self, Parameters(params): Parameters<TaskIdParams>) -> String {
        let cancelled = self.tasks.cancel(&params.task_id).await;
        serde_json::to_string(&CancelTaskResponse {
            task_id: params.task_id,
            cancelled,
        })
        .unwrap_or_else(|e| error_json("serialization_error", &e.to_string()))
    }

    /// List every tracked background orchestration run and its status.
    #[tool(
        name = "list_tasks",
        description = "List every background orchestration run this server has tracked since it started, with its current status."
    )]
    pub async fn list_tasks(&self) -> String {
        let tasks = self
            .tasks
            .list()
            .await
            .into_iter()
            .map(|(task_id, status)| TaskListEntry {
                task_id,
                status: status.wire_id().to_string(),
            })
            .collect();
        serde_json::to_string(&TaskListResponse { tasks }).unwrap_or_else(|e| error_json("serialization_error", &e.to_string()))
    }

    /// Store a value in the shared key-value context store.
    #[tool(
        name = "context_set",
        description = "Store a value in the shared key-value context store, scoped to \"session\" (requires session_id) or \"global\"."
    )]
    pub async fn context_set(&self, Parameters(params): Parameters<ContextSetParams>) -> String {
        let Some(scope) = ContextScope::from_wire_id(&params.scope) else {
            return error_json("invalid_scope", &format!("unknown scope '{}'", params.scope));
        };
        let value = Value::from(params.value);
        match self
            .context
            .set(scope, params.session_id.as_deref(), params.key, value)
            .await
        {
            Ok(()) => serde_json::json!({"ok": true}).to_string(),
            Err(message) => error_json("invalid_scope", &message),
        }
    }

    /// Read a value from the shared key-value context store.
    #[tool(
        name = "context_get",
        description = "Read a value from the shared key-value context store, scoped to \"session\" (requires session_id) or \"global\". Returns null if the key was never set."
    )]
    pub async fn context_get(&self, Parameters(params): Parameters<ContextGetParams>) -> String {
        let Some(scope) = ContextScope::from_wire_id(&params.scope) else {
            return error_json("invalid_scope", &format!("unknown scope '{}'", params.scope));
        };
        match self.context.get(scope, params.session_id.as_deref(), &params.key).await {
            Ok(value) => serde_json::json!({
                "key": params.key,
                "value": value.as_ref().map(value_to_json),
            })
            .to_string(),
            Err(message) => error_json("invalid_scope", &message),
        }
    }

    /// Suggest an agent role for a free-text query without running a full orchestration.
    #[tool(
        name = "suggest_role",
        description = "Route a free-text query to one of the six agent roles (arch, canvas, index, quill, lens, scout) using the same selector the orchestrator uses internally, without running a full orchestration."
    )]
    pub async fn suggest_role(&self, Parameters(params): Parameters<SuggestRoleParams>) -> String {
        let task = Task::new(uuid::Uuid::new_v4().to_string(), params.query, TaskType::Implement);
        let assignment = self.selector.select(&task);
        serde_json::to_string(&SuggestRoleResponse {
            role: assignment.role.wire_id().to_string(),
            confidence: assignment.confidence,
            reasoning: assignment.reasoning,
        })
        .unwrap_or_else(|e| error_json("serialization_error", &e.to_string()))
    }
}
