use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution-ready workflow graph, in the shape the workflow engine accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    pub name: String,
    pub description: String,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    pub trigger_node_id: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_public: bool,
}

impl WorkflowSpec {
    pub fn trigger_node(&self) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| node.id == self.trigger_node_id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut WorkflowNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub description: String,
    pub config: Map<String, Value>,
    /// Canvas layout hint only; execution order comes from the edges.
    pub position: Position,
    pub metadata: NodeMetadata,
}

/// Engine-facing node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    ManualTrigger,
    ScheduleTrigger,
    PriceOracle,
    Condition,
    Swap,
    Notification,
}

impl NodeKind {
    pub fn is_trigger(self) -> bool {
        matches!(self, Self::ManualTrigger | Self::ScheduleTrigger)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Traceability back to the planner-facing block a node came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub block_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Branch selectors; unused while edge synthesis is purely linear.
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    /// Opaque pass-through maps the engine may attach semantics to.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub condition: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub data_mapping: Map<String, Value>,
}

impl WorkflowEdge {
    /// Plain linear edge; the id is deterministic so re-compiling the same
    /// plan produces recognizable diffs.
    pub fn linear(source: &str, target: &str) -> Self {
        Self {
            id: format!("{source}->{target}"),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
            condition: Map::new(),
            data_mapping: Map::new(),
        }
    }
}
