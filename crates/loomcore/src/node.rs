use crate::{events::EventEmitter, NodeError, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Core trait that all executable nodes implement
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique type identifier (e.g., "text.template", "memory.buffer")
    fn node_type(&self) -> &str;

    /// Execute the node with given context, returning its output value
    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError>;

    /// Optional: Validate configuration at build time
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Execution context passed to each node invocation
#[derive(Clone)]
pub struct NodeContext {
    /// Node instance id within the flow
    pub node_id: String,

    /// Input values resolved from upstream connections
    pub inputs: HashMap<String, Value>,

    /// Static configuration from the node definition
    pub config: HashMap<String, Value>,

    /// Snapshot of session variables at invocation time
    pub variables: HashMap<String, Value>,

    /// This node's own cached output from an earlier run of the session,
    /// if any; how session-aware nodes accumulate across continuations
    pub previous_output: Option<Value>,

    /// Session this invocation belongs to
    pub session_id: String,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Cancellation token for cooperative shutdown
    pub cancellation: tokio_util::sync::CancellationToken,
}

impl NodeContext {
    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Get an input, falling back to a session variable of the same name
    pub fn input_or_variable(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name).or_else(|| self.variables.get(name))
    }

    /// Get config value or return error
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config
            .get(name)
            .ok_or_else(|| NodeError::Configuration(format!("Missing config: {}", name)))
    }

    /// Get config with default
    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }
}
