use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

/// Delay execution for a specified duration, passing inputs through
pub struct DelayNode;

#[async_trait]
impl Node for DelayNode {
    fn node_type(&self) -> &str {
        "time.delay"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let delay_ms = ctx
            .config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0) as u64;

        ctx.events.info(format!("Delaying for {}ms", delay_ms));

        tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
            _ = sleep(Duration::from_millis(delay_ms)) => {}
        }

        Ok(Value::Object(ctx.inputs.clone()))
    }
}

pub struct DelayNodeFactory;

impl NodeFactory for DelayNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(DelayNode))
    }

    fn node_type(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
            tags: vec![],
            inputs: vec![],
            outputs: vec![],
        }
    }
}
