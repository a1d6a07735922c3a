use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata};
use std::collections::HashMap;

/// Simple debug node that logs what flows through it
pub struct DebugNode;

#[async_trait]
impl Node for DebugNode {
    fn node_type(&self) -> &str {
        "debug.log"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let message = ctx
            .inputs
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");

        ctx.events.info(format!("DEBUG: {}", message));

        for (key, value) in &ctx.inputs {
            ctx.events.info(format!("  {}: {:?}", key, value));
        }

        let mut output = HashMap::new();
        output.insert("message".to_string(), Value::String(message.to_string()));
        Ok(Value::Object(output))
    }
}

pub struct DebugNodeFactory;

impl NodeFactory for DebugNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DebugNode))
    }

    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Logs values for troubleshooting".to_string(),
            category: "debug".to_string(),
            tags: vec!["diagnostics".to_string()],
            inputs: vec![],
            outputs: vec![],
        }
    }
}
