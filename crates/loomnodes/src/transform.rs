use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata};
use std::collections::HashMap;

/// Parse a JSON string into a structured value
pub struct JsonParseNode;

#[async_trait]
impl Node for JsonParseNode {
    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let raw = ctx
            .require_input("json")?
            .as_str()
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "json".to_string(),
                expected: "string".to_string(),
                actual: "other".to_string(),
            })?;

        let parsed: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        let mut output = HashMap::new();
        output.insert("parsed".to_string(), Value::from_json(parsed));
        Ok(Value::Object(output))
    }
}

pub struct JsonParseNodeFactory;

impl NodeFactory for JsonParseNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JsonParseNode))
    }

    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Parse a JSON string".to_string(),
            category: "transform".to_string(),
            tags: vec!["json".to_string()],
            inputs: vec![],
            outputs: vec![],
        }
    }
}

/// Serialize a value to a JSON string
pub struct JsonStringifyNode;

#[async_trait]
impl Node for JsonStringifyNode {
    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let value = ctx.require_input("value")?;

        let json_str = serde_json::to_string_pretty(&value.to_json())
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        let mut output = HashMap::new();
        output.insert("json".to_string(), Value::String(json_str));
        Ok(Value::Object(output))
    }
}

pub struct JsonStringifyNodeFactory;

impl NodeFactory for JsonStringifyNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(JsonStringifyNode))
    }

    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Convert a value to a JSON string".to_string(),
            category: "transform".to_string(),
            tags: vec!["json".to_string()],
            inputs: vec![],
            outputs: vec![],
        }
    }
}
