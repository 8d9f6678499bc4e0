//! # Plan Graph
//!
//! The directed acyclic graph of agent invocations produced by the planner
//! and executed by the [`DagExecutor`](super::executor::DagExecutor).
//!
//! Dependency semantics live in [`Node::dependencies`]. Edges are a
//! denormalized copy kept only for visualization; the executor never reads
//! them.

use serde::{Deserialize, Serialize};

use crate::skills::AgentId;

/// Lifecycle of a single node: `pending → running → {completed | error}`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl NodeStatus {
    /// Terminal states. Both unblock dependents.
    pub fn is_resolved(self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Error => "error",
        }
    }
}

/// One unit of work in a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub agent_id: AgentId,
    #[serde(default)]
    pub status: NodeStatus,
    /// Free text handed to the agent as its task
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Elapsed milliseconds, set on completion or error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        agent_id: AgentId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            agent_id,
            status: NodeStatus::Pending,
            description: description.into(),
            result: None,
            duration: None,
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies on other node ids
    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Visualization edge between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A full execution plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: String,
    pub title: String,
    /// Insertion order is display order, not execution order
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Plan {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Append a node
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Replace the edge list with one edge per dependency
    pub fn derive_edges(mut self) -> Self {
        let mut edges = Vec::new();
        for node in &self.nodes {
            for dep in &node.dependencies {
                edges.push(Edge {
                    id: format!("e-{}-{}", dep, node.id),
                    source: dep.clone(),
                    target: node.id.clone(),
                    label: None,
                });
            }
        }
        self.edges = edges;
        self
    }

    /// Reset every node to `pending` and drop edges that point at unknown nodes.
    ///
    /// Called on every plan before it is published or executed.
    pub fn prepare(mut self) -> Self {
        for node in &mut self.nodes {
            node.status = NodeStatus::Pending;
            node.result = None;
            node.duration = None;
        }
        let edges = std::mem::take(&mut self.edges);
        self.edges = edges
            .into_iter()
            .filter(|e| self.contains(&e.source) && self.contains(&e.target))
            .collect();
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Number of nodes assigned to an agent
    pub fn count_by_agent(&self, agent: AgentId) -> usize {
        self.nodes.iter().filter(|n| n.agent_id == agent).count()
    }

    /// Whether every node reached a terminal state
    pub fn is_settled(&self) -> bool {
        self.nodes.iter().all(|n| n.status.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> Plan {
        Plan::new("p", "diamond")
            .with_node(Node::new("a", "A", AgentId::Legal, "first"))
            .with_node(Node::new("b", "B", AgentId::Document, "left").after(["a"]))
            .with_node(Node::new("c", "C", AgentId::Api, "right").after(["a"]))
            .with_node(Node::new("d", "D", AgentId::Validator, "join").after(["b", "c"]))
            .derive_edges()
    }

    #[test]
    fn test_derive_edges() {
        let plan = diamond();
        assert_eq!(plan.edges.len(), 4);
        assert!(plan
            .edges
            .iter()
            .any(|e| e.source == "b" && e.target == "d"));
    }

    #[test]
    fn test_prepare_resets_and_drops_dangling_edges() {
        let mut plan = diamond();
        plan.nodes[0].status = NodeStatus::Completed;
        plan.nodes[0].result = Some("done".into());
        plan.edges.push(Edge {
            id: "ghost".into(),
            source: "a".into(),
            target: "zzz".into(),
            label: None,
        });

        let plan = plan.prepare();
        assert!(plan.nodes.iter().all(|n| n.status == NodeStatus::Pending));
        assert!(plan.nodes[0].result.is_none());
        assert_eq!(plan.edges.len(), 4);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let plan = diamond();
        let json = serde_json::to_value(&plan).unwrap();
        let node = &json["nodes"][1];
        assert_eq!(node["agentId"], "document");
        assert_eq!(node["status"], "pending");
        assert_eq!(node["dependencies"][0], "a");
        assert!(node.get("result").is_none());
    }

    #[test]
    fn test_resolved_states() {
        assert!(NodeStatus::Completed.is_resolved());
        assert!(NodeStatus::Error.is_resolved());
        assert!(!NodeStatus::Running.is_resolved());
        assert!(!NodeStatus::Pending.is_resolved());
    }
}
