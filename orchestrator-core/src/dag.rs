//! DAG Builder: level partitioning via Kahn's algorithm, cycle detection
//! (spec §4.3). Nodes live in a vector; edges are index pairs so neither
//! dependencies nor dependents own the other (spec §9 design note on
//! cyclic references).

use crate::assignment::Assignment;
use crate::role::AgentRole;
use crate::task::Task;
use std::collections::{HashMap, HashSet};

/// Mutable execution status of a DAG node (spec §3). A terminal status is
/// immutable; transitions out of it are forbidden by `ExecutionDag::set_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Success,
    Failure,
    Skipped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failure | ExecutionStatus::Skipped
        )
    }
}

#[derive(Debug, Clone)]
pub struct DagNode {
    pub task_id: String,
    pub task: Task,
    pub role: AgentRole,
    /// Dependency ids resolved to nodes in this DAG only; dangling ids are
    /// dropped (with a warning) before this is populated.
    pub dependencies: Vec<String>,
    /// Inverse edges: ids of nodes that depend on this one.
    pub dependents: Vec<String>,
    pub level: usize,
    pub status: ExecutionStatus,
    /// Original insertion index, used as the leveling tie-break.
    pub(crate) insertion_index: usize,
}

#[derive(Debug, Clone)]
pub struct ExecutionDag {
    pub nodes: HashMap<String, DagNode>,
    pub levels: Vec<Vec<String>>,
    pub total_levels: usize,
    pub is_valid: bool,
    pub validation_error: Option<String>,
}

impl ExecutionDag {
    pub fn node(&self, task_id: &str) -> Option<&DagNode> {
        self.nodes.get(task_id)
    }

    pub fn node_mut(&mut self, task_id: &str) -> Option<&mut DagNode> {
        self.nodes.get_mut(task_id)
    }

    /// Set a node's status, refusing to leave a terminal status (spec §3
    /// invariant: "a terminal agent status is immutable").
    pub fn set_status(&mut self, task_id: &str, status: ExecutionStatus) -> bool {
        match self.nodes.get_mut(task_id) {
            Some(node) if !node.status.is_terminal() => {
                node.status = status;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct DagBuilder;

impl DagBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the execution DAG from a list of assignments. Assignments
    /// with duplicate task ids are expected to already have been
    /// deduplicated by the decomposer; this builder trusts task ids as given.
    pub fn build(&self, assignments: Vec<Assignment>) -> ExecutionDag {
        if assignments.is_empty() {
            return ExecutionDag {
                nodes: HashMap::new(),
                levels: Vec::new(),
                total_levels: 0,
                is_valid: true,
                validation_error: None,
            };
        }

        let known_ids: HashSet<String> = assignments.iter().map(|a| a.task.id.clone()).collect();
        let mut nodes: HashMap<String, DagNode> = HashMap::new();

        for (index, assignment) in assignments.into_iter().enumerate() {
            let Assignment { task, role, .. } = assignment;
            let resolved_deps: Vec<String> = task
                .dependencies
                .iter()
                .filter(|dep| {
                    let ok = known_ids.contains(*dep);
                    if !ok {
                        tracing::warn!(task_id = %task.id, dependency = %dep, "dropping dangling dependency");
                    }
                    ok
                })
                .cloned()
                .collect();

            nodes.insert(
                task.id.clone(),
                DagNode {
                    task_id: task.id.clone(),
                    task,
                    role,
                    dependencies: resolved_deps,
                    dependents: Vec::new(),
                    level: 0,
                    status: ExecutionStatus::Pending,
                    insertion_index: index,
                },
            );
        }

        // Invert dependencies into dependents.
        let edges: Vec<(String, String)> = nodes
            .values()
            .flat_map(|n| n.dependencies.iter().map(move |d| (d.clone(), n.task_id.clone())))
            .collect();
        for (dep_id, dependent_id) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep_id) {
                dep_node.dependents.push(dependent_id);
            }
        }

        if let Some(cycle_path) = detect_cycle(&nodes) {
            return ExecutionDag {
                nodes,
                levels: Vec::new(),
                total_levels: 0,
                is_valid: false,
                validation_error: Some(format!("Circular dependency detected: {}", cycle_path.join(" -> "))),
            };
        }

        let levels = level_via_kahn(&mut nodes);
        let total_levels = levels.len();

        ExecutionDag {
            nodes,
            levels,
            total_levels,
            is_valid: true,
            validation_error: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS cycle detection. Returns the cycle path (task ids) if found.
fn detect_cycle(nodes: &HashMap<String, DagNode>) -> Option<Vec<String>> {
    let mut colors: HashMap<&str, Color> = nodes.keys().map(|id| (id.as_str(), Color::White)).collect();
    let mut ordered_ids: Vec<&str> = nodes.keys().map(|s| s.as_str()).collect();
    ordered_ids.sort_by_key(|id| nodes[*id].insertion_index);

    for start in &ordered_ids {
        if colors[start] == Color::White {
            let mut stack = Vec::new();
            if let Some(path) = visit(start, nodes, &mut colors, &mut stack) {
                return Some(path);
            }
        }
    }
    None
}

fn visit<'a>(
    id: &'a str,
    nodes: &'a HashMap<String, DagNode>,
    colors: &mut HashMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colors.insert(id, Color::Gray);
    stack.push(id);

    let mut deps: Vec<&str> = nodes[id].dependencies.iter().map(|s| s.as_str()).collect();
    deps.sort_by_key(|d| nodes[*d].insertion_index);

    for dep in deps {
        match colors.get(dep).copied().unwrap_or(Color::White) {
            Color::White => {
                if let Some(path) = visit(dep, nodes, colors, stack) {
                    return Some(path);
                }
            }
            Color::Gray => {
                let start_pos = stack.iter().position(|n| *n == dep).unwrap_or(0);
                let mut path: Vec<String> = stack[start_pos..].iter().map(|s| s.to_string()).collect();
                path.push(dep.to_string());
                return Some(path);
            }
            Color::Black => {}
        }
    }

    stack.pop();
    colors.insert(id, Color::Black);
    None
}

/// Kahn's algorithm, sorting each level by insertion index for deterministic
/// ordering (spec §4.3 step 4).
fn level_via_kahn(nodes: &mut HashMap<String, DagNode>) -> Vec<Vec<String>> {
    let mut in_degree: HashMap<String, usize> =
        nodes.iter().map(|(id, n)| (id.clone(), n.dependencies.len())).collect();

    let mut current: Vec<String> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(id, _)| id.clone())
        .collect();

    let mut levels = Vec::new();
    let mut level_index = 0usize;

    while !current.is_empty() {
        current.sort_by_key(|id| nodes[id].insertion_index);

        for id in &current {
            if let Some(node) = nodes.get_mut(id) {
                node.level = level_index;
            }
        }

        let mut next = Vec::new();
        for id in &current {
            let dependents = nodes[id].dependents.clone();
            for dependent in dependents {
                if let Some(deg) = in_degree.get_mut(&dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        next.push(dependent);
                    }
                }
            }
        }

        levels.push(current);
        current = next;
        level_index += 1;
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;

    fn assignment(id: &str, deps: &[&str]) -> Assignment {
        let task = Task::new(id, format!("task {id}"), TaskType::Implement)
            .with_dependencies(deps.iter().map(|s| s.to_string()).collect());
        Assignment::new(task, AgentRole::Architect, 0.8, "test")
    }

    #[test]
    fn empty_assignments_produce_valid_empty_dag() {
        let dag = DagBuilder::new().build(Vec::new());
        assert!(dag.is_valid);
        assert_eq!(dag.total_levels, 0);
        assert!(dag.levels.is_empty());
    }

    #[test]
    fn linear_chain_produces_three_levels_of_size_one() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[]),
            assignment("t2", &["t1"]),
            assignment("t3", &["t2"]),
        ]);
        assert!(dag.is_valid);
        assert_eq!(dag.total_levels, 3);
        assert_eq!(dag.levels, vec![vec!["t1"], vec!["t2"], vec!["t3"]]);
    }

    #[test]
    fn diamond_level_two_preserves_insertion_order() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[]),
            assignment("t2a", &["t1"]),
            assignment("t2b", &["t1"]),
            assignment("t3", &["t2a", "t2b"]),
        ]);
        assert!(dag.is_valid);
        assert_eq!(dag.levels[1], vec!["t2a", "t2b"]);
        assert_eq!(dag.levels[2], vec!["t3"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let dag = DagBuilder::new().build(vec![assignment("t1", &["t2"]), assignment("t2", &["t1"])]);
        assert!(!dag.is_valid);
        assert!(dag
            .validation_error
            .as_ref()
            .unwrap()
            .contains("Circular dependency"));
    }

    #[test]
    fn dangling_dependency_is_dropped_and_node_becomes_root() {
        let dag = DagBuilder::new().build(vec![assignment("t1", &["ghost"])]);
        assert!(dag.is_valid);
        assert_eq!(dag.levels, vec![vec!["t1"]]);
        assert!(dag.node("t1").unwrap().dependencies.is_empty());
    }

    #[test]
    fn dependency_level_is_strictly_less_than_dependent_level() {
        let dag = DagBuilder::new().build(vec![
            assignment("t1", &[]),
            assignment("t2", &["t1"]),
            assignment("t3", &["t2"]),
        ]);
        for node in dag.nodes.values() {
            for dep in &node.dependencies {
                assert!(dag.node(dep).unwrap().level < node.level);
            }
        }
    }

    #[test]
    fn terminal_status_transition_is_rejected() {
        let mut dag = DagBuilder::new().build(vec![assignment("t1", &[])]);
        assert!(dag.set_status("t1", ExecutionStatus::Success));
        assert!(!dag.set_status("t1", ExecutionStatus::Failure));
        assert_eq!(dag.node("t1").unwrap().status, ExecutionStatus::Success);
    }
}
