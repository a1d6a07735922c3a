use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative flow definition as authored by the visual editor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

impl FlowDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeDefinition) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    pub fn connect(
        &mut self,
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) {
        self.edges.push(EdgeDefinition {
            source: source.into(),
            source_handle: source_handle.into(),
            target: target.into(),
            target_handle: target_handle.into(),
            data_type: None,
        });
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node ids in original authoring order
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }
}

/// A single node in a flow definition; immutable after parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl NodeDefinition {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// A declared wire between two node handles
///
/// Handles default to `"output"` / `"input"` when the editor omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub source: String,
    #[serde(default = "default_source_handle")]
    pub source_handle: String,
    pub target: String,
    #[serde(default = "default_target_handle")]
    pub target_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

fn default_source_handle() -> String {
    "output".to_string()
}

fn default_target_handle() -> String {
    "input".to_string()
}

/// Resolved form of an edge, as held in the connection map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_node_id: String,
    pub source_handle: String,
    pub target_node_id: String,
    pub target_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl From<&EdgeDefinition> for Connection {
    fn from(edge: &EdgeDefinition) -> Self {
        Self {
            source_node_id: edge.source.clone(),
            source_handle: edge.source_handle.clone(),
            target_node_id: edge.target.clone(),
            target_handle: edge.target_handle.clone(),
            data_type: edge.data_type.clone(),
        }
    }
}
