use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cached node result; one live entry per node id per run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub node_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl CacheEntry {
    pub fn new(node_id: impl Into<String>, data: Value) -> Self {
        Self {
            node_id: node_id.into(),
            data,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Mutable, session-scoped state threaded through every node invocation
///
/// Created fresh per execution unless a prior session is resumed from a
/// checkpoint. Never shared across sessions; callers must keep a single
/// writer at a time per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub node_outputs: HashMap<String, CacheEntry>,
    #[serde(default)]
    pub executed_nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_output: Option<Value>,
}

impl FlowState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: None,
            workflow_id: None,
            variables: HashMap::new(),
            node_outputs: HashMap::new(),
            executed_nodes: Vec::new(),
            last_output: None,
        }
    }

    pub fn for_session(
        session_id: impl Into<String>,
        user_id: Option<String>,
        workflow_id: Option<String>,
    ) -> Self {
        Self {
            user_id,
            workflow_id,
            ..Self::new(session_id)
        }
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Merge a batch of variables, later values overriding earlier ones
    pub fn merge_variables(&mut self, values: HashMap<String, Value>) {
        if !values.is_empty() {
            tracing::trace!(session_id = %self.session_id, count = values.len(), "merging variables");
            self.variables.extend(values);
        }
    }

    /// Raw cached output for a node, if it has run
    pub fn output_of(&self, node_id: &str) -> Option<&Value> {
        self.node_outputs.get(node_id).map(|entry| &entry.data)
    }

    /// Record a completed node invocation
    pub fn mark_executed(&mut self, node_id: impl Into<String>) {
        self.executed_nodes.push(node_id.into());
    }
}
