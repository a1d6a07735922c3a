use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Conditional router
///
/// Compares the incoming value against the configured `equals` (exact) or
/// `contains` (substring) condition and reports the branch taken alongside
/// the value, so downstream nodes can key off `route`.
pub struct RouterNode;

#[async_trait]
impl Node for RouterNode {
    fn node_type(&self) -> &str {
        "control.router"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let value = ctx.require_input("value")?.clone();

        let matched = if let Some(expected) = ctx.config.get("equals") {
            *expected == value
        } else if let Some(needle) = ctx.config.get("contains").and_then(|v| v.as_str()) {
            value.as_str().is_some_and(|s| s.contains(needle))
        } else {
            return Err(NodeError::Configuration(
                "router requires an 'equals' or 'contains' condition".to_string(),
            ));
        };

        let route = if matched { "match" } else { "default" };
        ctx.events.info(format!("routing to '{}'", route));

        let mut output = HashMap::new();
        output.insert("route".to_string(), Value::String(route.to_string()));
        output.insert("value".to_string(), value);
        Ok(Value::Object(output))
    }
}

pub struct RouterNodeFactory;

impl NodeFactory for RouterNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(RouterNode))
    }

    fn node_type(&self) -> &str {
        "control.router"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Route a value by a conditional check".to_string(),
            category: "control".to_string(),
            tags: vec!["conditional".to_string(), "router".to_string()],
            inputs: vec![PortDefinition::new("value", "Value to test", true)],
            outputs: vec![
                PortDefinition::new("route", "Branch taken", true),
                PortDefinition::new("value", "The tested value", true),
            ],
        }
    }
}
