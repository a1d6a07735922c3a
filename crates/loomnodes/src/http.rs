use async_trait::async_trait;
use loomcore::{Node, NodeContext, NodeError, Value};
use loomruntime::{NodeFactory, NodeTypeMetadata};
use std::collections::HashMap;

/// HTTP request node
pub struct HttpRequestNode {
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn node_type(&self) -> &str {
        "http.request"
    }

    async fn execute(&self, ctx: NodeContext) -> Result<Value, NodeError> {
        let url = ctx
            .input_or_variable("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| NodeError::MissingInput("url".to_string()))?
            .to_string();
        let method_value = ctx.get_config_or("method", Value::String("GET".to_string()));
        let method = method_value.as_str().unwrap_or("GET");

        ctx.events.info(format!("{} {}", method, url));

        let request = match method.to_uppercase().as_str() {
            "GET" => self.client.get(&url),
            "POST" => {
                let mut req = self.client.post(&url);
                if let Some(body) = ctx.inputs.get("body") {
                    if let Some(text) = body.as_str() {
                        req = req.body(text.to_string());
                    } else {
                        req = req.json(&body.to_json());
                    }
                }
                req
            }
            "PUT" => {
                let mut req = self.client.put(&url);
                if let Some(body) = ctx.inputs.get("body") {
                    req = req.json(&body.to_json());
                }
                req
            }
            "DELETE" => self.client.delete(&url),
            _ => {
                return Err(NodeError::Configuration(format!(
                    "Unsupported method: {}",
                    method
                )))
            }
        };

        // Add headers if provided
        let request = if let Some(Value::Object(headers)) = ctx.config.get("headers") {
            let mut req = request;
            for (key, value) in headers {
                if let Some(val_str) = value.as_str() {
                    req = req.header(key, val_str);
                }
            }
            req
        } else {
            request
        };

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
            response = request.send() => response
                .map_err(|e| NodeError::ExecutionFailed(format!("HTTP request failed: {}", e)))?,
        };

        let status = response.status().as_u16();
        let headers_map: HashMap<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Value::String(v.to_str().unwrap_or("").to_string()),
                )
            })
            .collect();

        let body_text = response
            .text()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        ctx.events.info(format!("Response status: {}", status));

        let mut output = HashMap::new();
        output.insert("status".to_string(), Value::Number(status as f64));
        output.insert("body".to_string(), Value::String(body_text));
        output.insert("headers".to_string(), Value::Object(headers_map));
        Ok(Value::Object(output))
    }
}

pub struct HttpRequestNodeFactory;

impl NodeFactory for HttpRequestNodeFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(HttpRequestNode::new()))
    }

    fn node_type(&self) -> &str {
        "http.request"
    }

    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata {
            description: "Make HTTP requests".to_string(),
            category: "http".to_string(),
            tags: vec!["network".to_string()],
            inputs: vec![],
            outputs: vec![],
        }
    }
}
