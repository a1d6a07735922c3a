use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Entry point for caller-supplied text
///
/// Reads `text` from resolved inputs, then its own config, then session
/// variables, so it works both as a wired node and as a flow entry point
/// fed by execution inputs. Own config outranks session variables: two
/// input nodes with different configured texts must not shadow each other.
pub struct TextInputNode;

#[async_trait]
impl Node for TextInputNode {
    fn node_type(&self) -> &str {
        "input.text"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let text = ctx
            .inputs
            .get("text")
            .or_else(|| ctx.config.get("text"))
            .or_else(|| ctx.variables.get("text"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| NodeError::MissingInput("text".to_string()))?
            .to_string();

        let mut output = HashMap::new();
        output.insert("text".to_string(), Value::String(text));
        Ok(Value::Object(output))
    }
}

pub struct TextInputNodeFactory;

impl NodeFactory for TextInputNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(TextInputNode))
    }

    fn node_type(&self) -> &str {
        "input.text"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Text input supplied by the caller".to_string(),
            category: "input".to_string(),
            tags: vec!["text".to_string(), "source".to_string()],
            inputs: vec![PortDefinition::new("text", "Text to emit", false)],
            outputs: vec![PortDefinition::new("text", "The supplied text", true)],
        }
    }
}
