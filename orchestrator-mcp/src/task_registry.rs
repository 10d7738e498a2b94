//! Tracks background orchestration runs for the tool-call layer: one
//! `create_task` call spawns one `Orchestrator::run`, trackable by id
//! through the same queued/running/completed/failed/cancelled/timeout
//! states the Agent Manager uses for individual agents (spec §6).
//!
//! This mirrors `orchestrator_core::agent::AgentManager`'s
//! create/wait/cancel pattern one layer up, over whole orchestration runs
//! instead of single model calls.

use orchestrator_core::agent::AgentStatus;
use orchestrator_core::{Orchestrator, OrchestrationReport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex as AsyncMutex};
use uuid::Uuid;

struct TaskRecord {
    status: AgentStatus,
    report: Option<OrchestrationReport>,
    error: Option<String>,
    #[allow(dead_code)]
    created_at: Instant,
    handle: Option<tokio::task::JoinHandle<()>>,
}

struct TaskSlot {
    record: AsyncMutex<TaskRecord>,
    status_tx: watch::Sender<AgentStatus>,
}

/// A point-in-time view of one tracked run; cheap to clone, unlike the
/// record itself (which owns the `JoinHandle`).
pub struct TaskSnapshot {
    pub status: AgentStatus,
    pub report: Option<OrchestrationReport>,
    pub error: Option<String>,
}

pub struct TaskRegistry {
    orchestrator: Arc<Orchestrator>,
    tasks: AsyncMutex<HashMap<String, Arc<TaskSlot>>>,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry").finish_non_exhaustive()
    }
}

impl TaskRegistry {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tasks: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Spawns the orchestration run in the background and returns its id
    /// immediately; the caller polls, waits, or cancels separately.
    pub async fn create_task(&self, request: String, fail_fast: bool) -> String {
        let id = format!("run-{}", Uuid::new_v4());
        let (status_tx, _rx) = watch::channel(AgentStatus::Queued);
        let record = TaskRecord {
            status: AgentStatus::Queued,
            report: None,
            error: None,
            created_at: Instant::now(),
            handle: None,
        };
        let slot = Arc::new(TaskSlot {
            record: AsyncMutex::new(record),
            status_tx,
        });

        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(id.clone(), slot.clone());
        }

        let orchestrator = self.orchestrator.clone();
        let task_id = id.clone();
        let spawn_slot = slot.clone();
        let handle = tokio::spawn(async move {
            {
                let mut record = spawn_slot.record.lock().await;
                if record.status.is_terminal() {
                    return;
                }
                record.status = AgentStatus::Running;
                let _ = spawn_slot.status_tx.send(AgentStatus::Running);
            }
            tracing::info!(task_id = %task_id, "orchestration run started");

            let outcome = orchestrator.run(&request, fail_fast).await;

            let mut record = spawn_slot.record.lock().await;
            if record.status.is_terminal() {
                return;
            }
            record.status = match outcome {
                Ok(report) => {
                    record.report = Some(report);
                    AgentStatus::Completed
                }
                Err(err) => {
                    record.error = Some(err.to_string());
                    AgentStatus::Failed
                }
            };
            let _ = spawn_slot.status_tx.send(record.status);
            tracing::info!(task_id = %task_id, status = record.status.wire_id(), "orchestration run finished");
        });

        slot.record.lock().await.handle = Some(handle);
        id
    }

    pub async fn snapshot(&self, id: &str) -> Option<TaskSnapshot> {
        let tasks = self.tasks.lock().await;
        let slot = tasks.get(id)?;
        let record = slot.record.lock().await;
        Some(TaskSnapshot {
            status: record.status,
            report: record.report.clone(),
            error: record.error.clone(),
        })
    }

    pub async fn list(&self) -> Vec<(String, AgentStatus)> {
        let tasks = self.tasks.lock().await;
        let mut out = Vec::with_capacity(tasks.len());
        for (id, slot) in tasks.iter() {
            out.push((id.clone(), slot.record.lock().await.status));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Transitions a non-terminal run to `cancelled` and aborts the
    /// in-flight future; terminal runs are left untouched (spec §4.6
    /// `cancelAgent`, applied one layer up).
    pub async fn cancel(&self, id: &str) -> bool {
        let tasks = self.tasks.lock().await;
        let Some(slot) = tasks.get(id) else {
            return false;
        };
        let mut record = slot.record.lock().await;
        if record.status.is_terminal() {
            return false;
        }
        record.status = AgentStatus::Cancelled;
        let _ = slot.status_tx.send(AgentStatus::Cancelled);
        if let Some(handle) = record.handle.take() {
            handle.abort();
        }
        true
    }

    /// Races the run's completion against `timeout_ms`. Unlike
    /// `AgentManager::wait_for_completion`, timing out here does not
    /// return an error — it returns the `timeout` status, matching the
    /// other terminal statuses this tool surface reports.
    pub async fn wait(&self, id: &str, timeout_ms: u64) -> Result<TaskSnapshot, String> {
        let slot = {
            let tasks = self.tasks.lock().await;
            tasks.get(id).cloned().ok_or_else(|| format!("task '{id}' not found"))?
        };

        let mut rx = slot.status_tx.subscribe();
        {
            let record = slot.record.lock().await;
            if record.status.is_terminal() {
                return Ok(TaskSnapshot {
                    status: record.status,
                    report: record.report.clone(),
                    error: record.error.clone(),
                });
            }
        }

        let wait_result = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            loop {
                if rx.borrow().is_terminal() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;

        if wait_result.is_err() {
            let mut record = slot.record.lock().await;
            if !record.status.is_terminal() {
                record.status = AgentStatus::Timeout;
                let _ = slot.status_tx.send(AgentStatus::Timeout);
                if let Some(handle) = record.handle.take() {
                    handle.abort();
                }
            }
        }

        let record = slot.record.lock().await;
        Ok(TaskSnapshot {
            status: record.status,
            report: record.report.clone(),
            error: record.error.clone(),
        })
    }
}
