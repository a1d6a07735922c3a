use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Session-scoped message buffer
///
/// Appends the incoming message to the history carried in this node's own
/// previous output, so the buffer grows across `continue_execution` calls
/// within one session. `max_messages` (config) caps the buffer; oldest
/// entries are dropped first.
pub struct BufferMemoryNode;

#[async_trait]
impl Node for BufferMemoryNode {
    fn node_type(&self) -> &str {
        "memory.buffer"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let mut history: Vec<Value> = ctx
            .previous_output
            .as_ref()
            .and_then(|prev| prev.as_object())
            .and_then(|map| map.get("history"))
            .and_then(|h| h.as_array())
            .map(|items| items.to_vec())
            .unwrap_or_default();

        if let Some(message) = ctx
            .inputs
            .get("message")
            .or_else(|| ctx.inputs.get("input"))
        {
            history.push(message.clone());
        }

        let max_messages = ctx
            .get_config_or("max_messages", Value::Number(50.0))
            .as_f64()
            .unwrap_or(50.0) as usize;
        if history.len() > max_messages {
            let excess = history.len() - max_messages;
            history.drain(..excess);
        }

        let latest = history.last().cloned().unwrap_or(Value::Null);
        let mut output = HashMap::new();
        output.insert("history".to_string(), Value::Array(history));
        output.insert("content".to_string(), latest);
        Ok(Value::Object(output))
    }
}

pub struct BufferMemoryNodeFactory;

impl NodeFactory for BufferMemoryNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(BufferMemoryNode))
    }

    fn node_type(&self) -> &str {
        "memory.buffer"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Buffer of messages accumulated over a session".to_string(),
            category: "memory".to_string(),
            tags: vec!["session".to_string(), "history".to_string()],
            inputs: vec![PortDefinition::new("message", "Message to append", false)],
            outputs: vec![
                PortDefinition::new("history", "Accumulated messages", true),
                PortDefinition::new("content", "Most recent message", false),
            ],
        }
    }
}
