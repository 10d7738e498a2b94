//! Agent Manager: async agent lifecycle, idempotency, wait-for-completion,
//! cancellation (spec §4.6, data model §3 "Agent").

use crate::provider::router::ModelRouter;
use crate::provider::{ModelRequest, ModelResponse};
use crate::role::AgentRole;
use crate::task::TaskPriority;
use orchestrator_shared::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex as AsyncMutex, Semaphore};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Cancelled | AgentStatus::Timeout
        )
    }

    pub fn wire_id(self) -> &'static str {
        match self {
            AgentStatus::Queued => "queued",
            AgentStatus::Running => "running",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::Cancelled => "cancelled",
            AgentStatus::Timeout => "timeout",
        }
    }
}

/// A structured agent-level error carrying the retryability signal the
/// executor's retry classifier reads (spec §4.4 step 2).
#[derive(Debug, Clone)]
pub struct AgentError {
    pub message: String,
    pub code: Option<String>,
    pub retryable: bool,
}

/// Input handed to the agent when it's created; mirrors the context object
/// the executor assembles per task (spec §4.4 step 3).
#[derive(Debug, Clone, Default)]
pub struct AgentInputContext {
    pub session_id: String,
    pub request: String,
    pub task_id: String,
    pub dependencies: Vec<String>,
    pub dependency_results: HashMap<String, Value>,
    pub task_context: HashMap<String, Value>,
    pub shared_context: HashMap<String, Value>,
}

#[derive(Debug)]
pub struct AgentRecord {
    pub id: String,
    pub role: AgentRole,
    pub task: String,
    pub status: AgentStatus,
    pub input_context: AgentInputContext,
    pub result: Option<ModelResponse>,
    pub error: Option<AgentError>,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
    pub duration: Option<Duration>,
    pub model: Option<String>,
    pub session_id: String,
    pub priority: TaskPriority,
}

struct AgentSlot {
    record: AsyncMutex<AgentRecord>,
    status_tx: watch::Sender<AgentStatus>,
}

/// Parameters for `create_agent` (spec §4.6 `createAgent`).
pub struct CreateAgentParams {
    pub role: AgentRole,
    pub task: String,
    pub input_context: AgentInputContext,
    pub session_id: String,
    pub priority: TaskPriority,
    pub idempotency_key: Option<String>,
    pub system_prompt: String,
    pub temperature: f32,
}

/// Lifecycle manager for one orchestration process's agents.
pub struct AgentManager {
    agents: AsyncMutex<HashMap<String, Arc<AgentSlot>>>,
    idempotency: AsyncMutex<HashMap<String, String>>,
    semaphore: Arc<Semaphore>,
    router: Arc<ModelRouter>,
    next_id: AtomicUsize,
}

impl std::fmt::Debug for AgentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentManager").finish_non_exhaustive()
    }
}

impl AgentManager {
    pub fn new(router: Arc<ModelRouter>, max_parallel_agents: usize) -> Self {
        Self {
            agents: AsyncMutex::new(HashMap::new()),
            idempotency: AsyncMutex::new(HashMap::new()),
            semaphore: Arc::new(Semaphore::new(max_parallel_agents)),
            router,
            next_id: AtomicUsize::new(0),
        }
    }

    fn fresh_id(&self) -> String {
        let counter = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("agent-{}-{counter}", Uuid::new_v4())
    }

    /// Creation is non-blocking: the agent is queued immediately and its
    /// execution is spawned in the background (spec §4.6).
    pub async fn create_agent(&self, params: CreateAgentParams) -> String {
        if let Some(key) = &params.idempotency_key {
            let idempotency = self.idempotency.lock().await;
            if let Some(existing_id) = idempotency.get(key) {
                let agents = self.agents.lock().await;
                if agents.contains_key(existing_id) {
                    return existing_id.clone();
                }
            }
        }

        let id = self.fresh_id();
        let (status_tx, _status_rx) = watch::channel(AgentStatus::Queued);
        let record = AgentRecord {
            id: id.clone(),
            role: params.role,
            task: params.task.clone(),
            status: AgentStatus::Queued,
            input_context: params.input_context,
            result: None,
            error: None,
            created_at: Instant::now(),
            started_at: None,
            completed_at: None,
            duration: None,
            model: None,
            session_id: params.session_id.clone(),
            priority: params.priority,
        };
        let slot = Arc::new(AgentSlot {
            record: AsyncMutex::new(record),
            status_tx,
        });

        {
            let mut agents = self.agents.lock().await;
            agents.insert(id.clone(), slot.clone());
        }
        if let Some(key) = params.idempotency_key {
            let mut idempotency = self.idempotency.lock().await;
            idempotency.insert(key, id.clone());
        }

        let router = self.router.clone();
        let semaphore = self.semaphore.clone();
        let agent_id = id.clone();
        let role = params.role;
        let task_text = params.task;
        let system_prompt = params.system_prompt;
        let temperature = params.temperature;

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            {
                let mut record = slot.record.lock().await;
                if record.status.is_terminal() {
                    return;
                }
                record.status = AgentStatus::Running;
                record.started_at = Some(Instant::now());
                let _ = slot.status_tx.send(AgentStatus::Running);
            }
            tracing::info!(agent_id = %agent_id, role = %role, "agent started");

            let user_prompt = task_text.clone();
            let result = router
                .execute_with_fallback(role, |model| {
                    ModelRequest::simple(model, system_prompt.clone(), user_prompt.clone()).with_temperature(temperature)
                })
                .await;

            let mut record = slot.record.lock().await;
            if record.status.is_terminal() {
                // Cancelled (or otherwise finalized) while the call was in flight;
                // the result is discarded per the cooperative-cancellation model.
                return;
            }
            record.completed_at = Some(Instant::now());
            record.duration = record.started_at.map(|s| s.elapsed());

            let final_status = match result {
                Ok(response) => {
                    record.model = Some(response.model.clone());
                    record.result = Some(response);
                    AgentStatus::Completed
                }
                Err(err) => {
                    record.error = Some(AgentError {
                        message: err.message.clone(),
                        code: Some(format!("{:?}", err.kind)),
                        retryable: err.is_retryable(),
                    });
                    AgentStatus::Failed
                }
            };
            record.status = final_status;
            let _ = slot.status_tx.send(final_status);
            tracing::info!(agent_id = %agent_id, status = ?final_status, "agent finished");
        });

        id
    }

    pub async fn get_status(&self, id: &str) -> Option<AgentStatus> {
        let agents = self.agents.lock().await;
        match agents.get(id) {
            Some(slot) => Some(slot.record.lock().await.status),
            None => None,
        }
    }

    pub async fn get_result(&self, id: &str) -> Option<ModelResponse> {
        let agents = self.agents.lock().await;
        match agents.get(id) {
            Some(slot) => slot.record.lock().await.result.clone(),
            None => None,
        }
    }

    pub async fn get_error(&self, id: &str) -> Option<AgentError> {
        let agents = self.agents.lock().await;
        match agents.get(id) {
            Some(slot) => slot.record.lock().await.error.clone(),
            None => None,
        }
    }

    pub async fn list_agents(&self, session_id: Option<&str>) -> Vec<String> {
        let agents = self.agents.lock().await;
        let mut ids = Vec::new();
        for (id, slot) in agents.iter() {
            let record = slot.record.lock().await;
            if session_id.map(|s| s == record.session_id).unwrap_or(true) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Races the agent's completion against `timeout_ms` (spec §4.6
    /// `waitForCompletion`); on timeout the agent transitions to `Timeout`.
    pub async fn wait_for_completion(&self, id: &str, timeout_ms: u64) -> Result<AgentStatus, AgentError> {
        let slot = {
            let agents = self.agents.lock().await;
            agents
                .get(id)
                .cloned()
                .ok_or_else(|| AgentError {
                    message: format!("agent '{id}' not found"),
                    code: Some("NotFound".to_string()),
                    retryable: false,
                })?
        };

        let mut rx = slot.status_tx.subscribe();
        {
            let record = slot.record.lock().await;
            if record.status.is_terminal() {
                return Ok(record.status);
            }
        }

        let wait_result = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            loop {
                if rx.borrow().is_terminal() {
                    return *rx.borrow();
                }
                if rx.changed().await.is_err() {
                    return *rx.borrow();
                }
            }
        })
        .await;

        match wait_result {
            Ok(status) => Ok(status),
            Err(_) => {
                let mut record = slot.record.lock().await;
                if !record.status.is_terminal() {
                    record.status = AgentStatus::Timeout;
                    let _ = slot.status_tx.send(AgentStatus::Timeout);
                }
                Err(AgentError {
                    message: format!("agent '{id}' timed out after {timeout_ms}ms"),
                    code: Some("Timeout".to_string()),
                    retryable: true,
                })
            }
        }
    }

    /// Transitions any non-terminal agent to `Cancelled`; terminal agents
    /// are left untouched (spec §4.6 `cancelAgent`).
    pub async fn cancel_agent(&self, id: &str) -> bool {
        let agents = self.agents.lock().await;
        let Some(slot) = agents.get(id) else {
            tracing::warn!(agent_id = id, "cancel requested for unknown agent");
            return false;
        };
        let mut record = slot.record.lock().await;
        if record.status.is_terminal() {
            tracing::warn!(agent_id = id, status = ?record.status, "cancel requested for terminal agent");
            return false;
        }
        record.status = AgentStatus::Cancelled;
        let _ = slot.status_tx.send(AgentStatus::Cancelled);
        true
    }

    /// Cancels all non-terminal agents for a session, removes them, and
    /// purges idempotency entries pointing at agents no longer present or
    /// belonging to the session (spec §4.6 `cleanupSession`).
    pub async fn cleanup_session(&self, session_id: &str) {
        let ids_to_remove: Vec<String> = {
            let agents = self.agents.lock().await;
            let mut ids = Vec::new();
            for (id, slot) in agents.iter() {
                let mut record = slot.record.lock().await;
                if record.session_id != session_id {
                    continue;
                }
                if !record.status.is_terminal() {
                    record.status = AgentStatus::Cancelled;
                    let _ = slot.status_tx.send(AgentStatus::Cancelled);
                }
                ids.push(id.clone());
            }
            ids
        };

        let mut agents = self.agents.lock().await;
        for id in &ids_to_remove {
            agents.remove(id);
        }
        drop(agents);

        let mut idempotency = self.idempotency.lock().await;
        idempotency.retain(|_, agent_id| !ids_to_remove.contains(agent_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::health::ProviderHealthManager;
    use crate::provider::router::{ProviderModelPair, RoleRoute};
    use crate::provider::{ModelApiError, ProviderAdapter, TokenUsage};
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;

    #[derive(Debug)]
    struct InstantAdapter;

    #[async_trait]
    impl ProviderAdapter for InstantAdapter {
        fn provider_name(&self) -> &str {
            "fake"
        }

        async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
            Ok(ModelResponse {
                content: "done".into(),
                tool_calls: Vec::new(),
                finish_reason: "stop".into(),
                model: request.model,
                tokens_used: TokenUsage::default(),
                fallback_info: None,
            })
        }
    }

    fn router() -> Arc<ModelRouter> {
        let mut routes = StdHashMap::new();
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
        let mut adapters: StdHashMap<String, Arc<dyn ProviderAdapter>> = StdHashMap::new();
        adapters.insert("fake".into(), Arc::new(InstantAdapter));
        Arc::new(ModelRouter::new(routes, adapters, Arc::new(ProviderHealthManager::new())))
    }

    fn params(session: &str) -> CreateAgentParams {
        CreateAgentParams {
            role: AgentRole::Architect,
            task: "do the thing".into(),
            input_context: AgentInputContext::default(),
            session_id: session.into(),
            priority: TaskPriority::Medium,
            idempotency_key: None,
            system_prompt: "you are an architect".into(),
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn create_then_wait_completes() {
        let manager = AgentManager::new(router(), 5);
        let id = manager.create_agent(params("s1")).await;
        let status = manager.wait_for_completion(&id, 2_000).await.unwrap();
        assert_eq!(status, AgentStatus::Completed);
    }

    #[tokio::test]
    async fn idempotent_create_returns_same_id() {
        let manager = AgentManager::new(router(), 5);
        let mut p1 = params("s1");
        p1.idempotency_key = Some("key-1".into());
        let id1 = manager.create_agent(p1).await;

        let mut p2 = params("s1");
        p2.idempotency_key = Some("key-1".into());
        let id2 = manager.create_agent(p2).await;

        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn cancel_agent_transitions_non_terminal_agent() {
        let manager = AgentManager::new(router(), 0);
        let id = manager.create_agent(params("s1")).await;
        assert!(manager.cancel_agent(&id).await);
        assert_eq!(manager.get_status(&id).await, Some(AgentStatus::Cancelled));
    }

    #[tokio::test]
    async fn cancel_terminal_agent_is_rejected() {
        let manager = AgentManager::new(router(), 5);
        let id = manager.create_agent(params("s1")).await;
        manager.wait_for_completion(&id, 2_000).await.unwrap();
        assert!(!manager.cancel_agent(&id).await);
    }

    #[tokio::test]
    async fn wait_for_completion_on_missing_agent_errors() {
        let manager = AgentManager::new(router(), 5);
        let result = manager.wait_for_completion("missing", 100).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cleanup_session_cancels_and_removes_agents() {
        let manager = AgentManager::new(router(), 0);
        let id = manager.create_agent(params("s1")).await;
        manager.cleanup_session("s1").await;
        assert_eq!(manager.get_status(&id).await, None);
    }
}
