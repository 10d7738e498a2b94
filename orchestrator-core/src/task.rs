//! Decomposed task type and supporting enums (spec §3 "Task").

use orchestrator_shared::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Research,
    Implement,
    Review,
    Design,
    Document,
    Test,
    Analyze,
}

impl TaskType {
    /// Parse a free-form type string from an LLM response, degrading
    /// unknown values to `Implement` (spec §4.1: "unknown `type` → warn,
    /// default to `implement`").
    pub fn parse_or_default(raw: &str) -> (Self, bool) {
        match raw.to_lowercase().as_str() {
            "research" => (TaskType::Research, true),
            "implement" => (TaskType::Implement, true),
            "review" => (TaskType::Review, true),
            "design" => (TaskType::Design, true),
            "document" => (TaskType::Document, true),
            "test" => (TaskType::Test, true),
            "analyze" => (TaskType::Analyze, true),
            _ => (TaskType::Implement, false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "low" => Complexity::Low,
            "high" => Complexity::High,
            _ => Complexity::Medium,
        }
    }
}

/// One unit of decomposed work (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub dependencies: Vec<String>,
    #[serde(rename = "estimatedComplexity")]
    pub complexity: Complexity,
    pub priority: Option<u32>,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, description: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            task_type,
            dependencies: Vec::new(),
            complexity: Complexity::Medium,
            priority: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Effective scheduling priority: explicit priority wins (§4.4: "≥3
    /// high, 2 medium, else low"); absent that, falls back to complexity.
    pub fn effective_priority(&self) -> TaskPriority {
        if let Some(priority) = self.priority {
            return if priority >= 3 {
                TaskPriority::High
            } else if priority == 2 {
                TaskPriority::Medium
            } else {
                TaskPriority::Low
            };
        }
        match self.complexity {
            Complexity::High => TaskPriority::High,
            Complexity::Low => TaskPriority::Low,
            Complexity::Medium => TaskPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_degrades_to_implement_with_warning_flag() {
        let (task_type, known) = TaskType::parse_or_default("refactor");
        assert_eq!(task_type, TaskType::Implement);
        assert!(!known);
    }

    #[test]
    fn explicit_priority_overrides_complexity() {
        let task = Task::new("t1", "do a thing", TaskType::Implement)
            .with_complexity(Complexity::Low)
            .with_priority(3);
        assert_eq!(task.effective_priority(), TaskPriority::High);
    }

    #[test]
    fn complexity_fallback_when_no_explicit_priority() {
        let task = Task::new("t1", "do a thing", TaskType::Implement).with_complexity(Complexity::High);
        assert_eq!(task.effective_priority(), TaskPriority::High);
    }
}
