use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata, PortDefinition};
use std::collections::HashMap;

/// Render a template string, substituting `{name}` placeholders from
/// resolved inputs first and session variables second
pub struct TemplateNode;

fn placeholder_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(&other.to_json()).unwrap_or_default(),
    }
}

#[async_trait]
impl Node for TemplateNode {
    fn node_type(&self) -> &str {
        "text.template"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let template = ctx
            .config
            .get("template")
            .or_else(|| ctx.variables.get("template"))
            .ok_or_else(|| NodeError::Configuration("Missing config: template".to_string()))?
            .as_str()
            .ok_or_else(|| NodeError::InvalidInputType {
                field: "template".to_string(),
                expected: "string".to_string(),
                actual: "other".to_string(),
            })?
            .to_string();

        let mut rendered = template;
        for (key, value) in ctx.inputs.iter().chain(ctx.variables.iter()) {
            let placeholder = format!("{{{}}}", key);
            if rendered.contains(&placeholder) {
                rendered = rendered.replace(&placeholder, &placeholder_value(value));
            }
        }

        let mut output = HashMap::new();
        output.insert("text".to_string(), Value::String(rendered));
        Ok(Value::Object(output))
    }
}

pub struct TemplateNodeFactory;

impl NodeFactory for TemplateNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(TemplateNode))
    }

    fn node_type(&self) -> &str {
        "text.template"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Render a template with placeholder substitution".to_string(),
            category: "text".to_string(),
            tags: vec!["template".to_string()],
            inputs: vec![PortDefinition::new(
                "input",
                "Values substituted into the template",
                false,
            )],
            outputs: vec![PortDefinition::new("text", "Rendered text", true)],
        }
    }
}
