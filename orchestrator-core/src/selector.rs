//! Agent Selector: heuristic keyword classification of a task to a role
//! (spec §4.2, keyword sets in §8).

use crate::assignment::Assignment;
use crate::role::AgentRole;
use crate::task::{Task, TaskType};
use orchestrator_shared::Value;

const EXTERNAL_RESEARCH_KEYWORDS: &[&str] = &["web", "external", "docs", "documentation", "api", "article"];
const CODEBASE_RESEARCH_KEYWORDS: &[&str] = &[
    "codebase",
    "repository",
    "repo",
    "existing code",
    "find file",
    "locate",
    "search",
    "grep",
];
const FRONTEND_KEYWORDS: &[&str] = &[
    "frontend", "ui", "ux", "component", "react", "vue", "svelte", "css", "layout", "style",
];
const ARCHITECTURE_KEYWORDS: &[&str] = &[
    "architecture",
    "backend",
    "database",
    "schema",
    "service",
    "api design",
    "domain",
];
const UI_REVIEW_KEYWORDS: &[&str] = &["ui", "ux", "design review", "layout", "visual", "accessibility"];
const UI_DESIGN_KEYWORDS: &[&str] = &["wireframe", "component"];
const UI_TEST_KEYWORDS: &[&str] = &["screenshot"];
const CODE_REVIEW_KEYWORDS: &[&str] = &["code", "logic", "security", "performance"];
const CODE_TEST_KEYWORDS: &[&str] = &["unit test", "integration test", "e2e"];

fn any_keyword(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack.contains(kw))
}

/// Selects an agent role for one task using a switch over `task.type` plus
/// keyword heuristics over the lowercased description + stringified context.
#[derive(Debug, Default)]
pub struct AgentSelector;

impl AgentSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select(&self, task: &Task) -> Assignment {
        let haystack = self.haystack(task);
        let (role, confidence, reasoning) = match task.task_type {
            TaskType::Research => {
                if any_keyword(&haystack, EXTERNAL_RESEARCH_KEYWORDS) {
                    (
                        AgentRole::DocumentationLibrarian,
                        0.85,
                        "external research keywords matched",
                    )
                } else if any_keyword(&haystack, CODEBASE_RESEARCH_KEYWORDS) {
                    (AgentRole::CodeExplorer, 0.85, "codebase research keywords matched")
                } else {
                    (
                        AgentRole::DocumentationLibrarian,
                        0.75,
                        "research task, no specific keyword match",
                    )
                }
            }
            TaskType::Implement => {
                if any_keyword(&haystack, FRONTEND_KEYWORDS) {
                    (AgentRole::Frontend, 0.9, "frontend keywords matched")
                } else if any_keyword(&haystack, ARCHITECTURE_KEYWORDS) {
                    (AgentRole::Architect, 0.85, "architecture/backend keywords matched")
                } else {
                    (
                        AgentRole::Architect,
                        0.75,
                        "implementation task, no specific keyword match",
                    )
                }
            }
            TaskType::Review => {
                if any_keyword(&haystack, UI_REVIEW_KEYWORDS) {
                    (AgentRole::Frontend, 0.9, "UI review keywords matched")
                } else if any_keyword(&haystack, CODE_REVIEW_KEYWORDS) {
                    (
                        AgentRole::Architect,
                        0.85,
                        "code/logic/security/performance keywords matched",
                    )
                } else {
                    (
                        AgentRole::Architect,
                        0.75,
                        "review task, no specific keyword match",
                    )
                }
            }
            TaskType::Design => {
                if any_keyword(&haystack, UI_REVIEW_KEYWORDS) || any_keyword(&haystack, UI_DESIGN_KEYWORDS) {
                    (AgentRole::Frontend, 0.9, "UI design keywords matched")
                } else if any_keyword(&haystack, ARCHITECTURE_KEYWORDS) {
                    (AgentRole::Architect, 0.85, "architecture keywords matched")
                } else {
                    (
                        AgentRole::Architect,
                        0.75,
                        "design task, no specific keyword match",
                    )
                }
            }
            TaskType::Document => (
                AgentRole::TechnicalWriter,
                0.95,
                "document tasks always route to technical-writer",
            ),
            TaskType::Test => {
                if any_keyword(&haystack, UI_TEST_KEYWORDS) || any_keyword(&haystack, FRONTEND_KEYWORDS) {
                    (AgentRole::Frontend, 0.8, "UI test keywords matched")
                } else if any_keyword(&haystack, CODE_REVIEW_KEYWORDS) || any_keyword(&haystack, CODE_TEST_KEYWORDS) {
                    (AgentRole::Architect, 0.8, "logic/test keywords matched")
                } else {
                    (AgentRole::Architect, 0.7, "test task, no specific keyword match")
                }
            }
            TaskType::Analyze => (
                AgentRole::MultimodalAnalyzer,
                0.9,
                "analyze tasks always route to multimodal-analyzer",
            ),
        };

        Assignment::new(task.clone(), role, confidence, reasoning)
    }

    fn haystack(&self, task: &Task) -> String {
        let mut combined = task.description.to_lowercase();
        if !task.context.is_empty() {
            combined.push(' ');
            for (key, value) in &task.context {
                combined.push_str(key);
                combined.push(' ');
                combined.push_str(&value_to_lowercase_string(value));
                combined.push(' ');
            }
        }
        combined
    }
}

fn value_to_lowercase_string(value: &Value) -> String {
    value.truncated(usize::MAX).to_lowercase()
}
