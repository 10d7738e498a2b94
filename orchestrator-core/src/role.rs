//! The canonical agent role enumeration.
//!
//! The two role-identifier sets that appear in different parts of the
//! source this system was distilled from are unified here into one enum.
//! The wire identifiers (`arch`, `canvas`, ...) are the serde representation
//! used by the tool-call protocol; `Display` renders the human-readable
//! selector label used in reasoning strings and logs.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    #[serde(rename = "arch")]
    Architect,
    #[serde(rename = "canvas")]
    Frontend,
    #[serde(rename = "index")]
    CodeExplorer,
    #[serde(rename = "quill")]
    TechnicalWriter,
    #[serde(rename = "lens")]
    MultimodalAnalyzer,
    #[serde(rename = "scout")]
    DocumentationLibrarian,
}

impl AgentRole {
    /// The wire identifier used on the tool-call protocol and as the serde
    /// representation.
    pub fn wire_id(self) -> &'static str {
        match self {
            AgentRole::Architect => "arch",
            AgentRole::Frontend => "canvas",
            AgentRole::CodeExplorer => "index",
            AgentRole::TechnicalWriter => "quill",
            AgentRole::MultimodalAnalyzer => "lens",
            AgentRole::DocumentationLibrarian => "scout",
        }
    }

    /// Parse a wire identifier back into a role. Returns `None` for
    /// anything outside the six canonical ids.
    pub fn from_wire_id(id: &str) -> Option<Self> {
        match id {
            "arch" => Some(AgentRole::Architect),
            "canvas" => Some(AgentRole::Frontend),
            "index" => Some(AgentRole::CodeExplorer),
            "quill" => Some(AgentRole::TechnicalWriter),
            "lens" => Some(AgentRole::MultimodalAnalyzer),
            "scout" => Some(AgentRole::DocumentationLibrarian),
            _ => None,
        }
    }

    /// All six roles, in table order.
    pub fn all() -> [AgentRole; 6] {
        [
            AgentRole::Architect,
            AgentRole::Frontend,
            AgentRole::CodeExplorer,
            AgentRole::TechnicalWriter,
            AgentRole::MultimodalAnalyzer,
            AgentRole::DocumentationLibrarian,
        ]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentRole::Architect => "architect",
            AgentRole::Frontend => "frontend",
            AgentRole::CodeExplorer => "code-explorer",
            AgentRole::TechnicalWriter => "technical-writer",
            AgentRole::MultimodalAnalyzer => "multimodal-analyzer",
            AgentRole::DocumentationLibrarian => "documentation-library",
        };
        f.write_str(label)
    }
}
