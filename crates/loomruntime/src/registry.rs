use loomcore::{EngineError, Node, NodeError, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating node instances
pub trait NodeFactory: Send + Sync {
    /// Create a new instance of the node with given configuration
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Node>, NodeError>;

    /// Get node type identifier
    fn node_type(&self) -> &str;

    /// Declared metadata (description, category, tags, ports)
    fn metadata(&self) -> NodeTypeMetadata {
        NodeTypeMetadata::default()
    }
}

/// Metadata declared by a node type
///
/// Category, tags, and description also feed the dynamic type classifier,
/// so node authors should describe what the node *is* rather than how it
/// is implemented.
#[derive(Debug, Clone)]
pub struct NodeTypeMetadata {
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
}

impl Default for NodeTypeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            tags: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PortDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
        }
    }
}

/// Registry of available node types
///
/// Registration order is preserved: derived queries over the registry must
/// be deterministic for a fixed registry state.
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
    order: Vec<String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a node factory
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type().to_string();
        tracing::info!("Registering node type: {}", node_type);
        if self.factories.insert(node_type.clone(), factory).is_none() {
            self.order.push(node_type);
        }
    }

    /// Look up a factory by type name
    pub fn lookup(&self, node_type: &str) -> Option<&Arc<dyn NodeFactory>> {
        self.factories.get(node_type)
    }

    /// Create a node instance from a node type and config
    pub fn create_node(
        &self,
        node_type: &str,
        config: &HashMap<String, Value>,
    ) -> loomcore::Result<Box<dyn Node>> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| EngineError::Execution(format!("unknown node type '{}'", node_type)))?;

        factory.create(config).map_err(EngineError::Node)
    }

    /// All registered node types, in registration order
    pub fn list_node_types(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeTypeMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
