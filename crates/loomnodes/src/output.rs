use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Terminal collector
///
/// Gathers every resolved input into one mapping; a lone `input` wire
/// passes through unwrapped so simple linear flows end with their payload
/// rather than a single-key object.
pub struct CollectOutputNode;

#[async_trait]
impl Node for CollectOutputNode {
    fn node_type(&self) -> &str {
        "output.collect"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        if ctx.inputs.len() == 1 {
            if let Some(value) = ctx.inputs.get("input") {
                ctx.events.data("output", value.clone());
                return Ok(value.clone());
            }
        }

        let collected: HashMap<String, Value> = ctx
            .inputs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let output = Value::Object(collected);
        ctx.events.data("output", output.clone());
        Ok(output)
    }
}

pub struct CollectOutputNodeFactory;

impl NodeFactory for CollectOutputNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(CollectOutputNode))
    }

    fn node_type(&self) -> &str {
        "output.collect"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Collect final results at the end of a flow".to_string(),
            category: "output".to_string(),
            tags: vec!["sink".to_string()],
            inputs: vec![PortDefinition::new("input", "Values to collect", false)],
            outputs: vec![],
        }
    }
}
