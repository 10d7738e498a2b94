//! Assignment of a task to an agent role (spec §3 "Assignment").

use crate::role::AgentRole;
use crate::task::Task;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub task: Task,
    pub role: AgentRole,
    pub confidence: f64,
    pub reasoning: String,
}

impl Assignment {
    pub fn new(task: Task, role: AgentRole, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            task,
            role,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }
}
