use crate::cache::NodeOutputCache;
use crate::classify::{NodeRole, TypeClassifier};
use crate::connections::InputBinding;
use loomcore::{Connection, FlowState, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Role-aware extraction of one connection's value from the source node's
/// cached output
///
/// One implementation per classified role, selected via an explicit
/// role -> implementation map.
pub trait ConnectionExtractor: Send + Sync {
    fn extract(
        &self,
        conn: &Connection,
        input_name: &str,
        state: &FlowState,
        cache: &NodeOutputCache,
    ) -> Option<Value>;
}

/// Providers declare named output ports (text, message, embedding); the
/// source handle names the port to pull.
struct ProviderExtractor;

impl ConnectionExtractor for ProviderExtractor {
    fn extract(
        &self,
        conn: &Connection,
        _input_name: &str,
        state: &FlowState,
        cache: &NodeOutputCache,
    ) -> Option<Value> {
        cache.get(state, &conn.source_node_id, &conn.source_handle)
    }
}

/// Processors are asked for the target input name so the fallback-key
/// chain can bridge mismatched port vocabularies.
struct ProcessorExtractor;

impl ConnectionExtractor for ProcessorExtractor {
    fn extract(
        &self,
        conn: &Connection,
        input_name: &str,
        state: &FlowState,
        cache: &NodeOutputCache,
    ) -> Option<Value> {
        cache.get(state, &conn.source_node_id, input_name)
    }
}

/// Memory nodes expose their accumulated history regardless of the wire's
/// handle names.
struct MemoryExtractor;

impl ConnectionExtractor for MemoryExtractor {
    fn extract(
        &self,
        conn: &Connection,
        _input_name: &str,
        state: &FlowState,
        cache: &NodeOutputCache,
    ) -> Option<Value> {
        cache.get(state, &conn.source_node_id, "history")
    }
}

/// Terminators pass their whole result through.
struct TerminatorExtractor;

impl ConnectionExtractor for TerminatorExtractor {
    fn extract(
        &self,
        conn: &Connection,
        _input_name: &str,
        state: &FlowState,
        _cache: &NodeOutputCache,
    ) -> Option<Value> {
        state.output_of(&conn.source_node_id).cloned()
    }
}

/// Resolves a node's input (single or fan-in) into one value, applying
/// role-aware extraction and type-aware aggregation
pub struct ConnectionResolver {
    classifier: Arc<TypeClassifier>,
    cache: Arc<NodeOutputCache>,
    /// node id -> type name, bound once per compiled flow
    node_types: HashMap<String, String>,
    extractors: HashMap<NodeRole, Box<dyn ConnectionExtractor>>,
}

impl ConnectionResolver {
    pub fn new(
        classifier: Arc<TypeClassifier>,
        cache: Arc<NodeOutputCache>,
        node_types: HashMap<String, String>,
    ) -> Self {
        let mut extractors: HashMap<NodeRole, Box<dyn ConnectionExtractor>> = HashMap::new();
        extractors.insert(NodeRole::Provider, Box::new(ProviderExtractor));
        extractors.insert(NodeRole::Processor, Box::new(ProcessorExtractor));
        extractors.insert(NodeRole::Memory, Box::new(MemoryExtractor));
        extractors.insert(NodeRole::Terminator, Box::new(TerminatorExtractor));
        // Control-flow sources carry processor-shaped outputs.
        extractors.insert(NodeRole::ControlFlow, Box::new(ProcessorExtractor));

        Self {
            classifier,
            cache,
            node_types,
            extractors,
        }
    }

    /// Resolve an input binding into a value; `None` means every upstream
    /// connection failed to produce one
    pub fn resolve(
        &self,
        input_name: &str,
        binding: &InputBinding,
        state: &FlowState,
    ) -> Option<Value> {
        match binding {
            InputBinding::Single(conn) => self.resolve_single(input_name, conn, state),
            InputBinding::FanIn(conns) => self.resolve_multi(input_name, conns, state),
        }
    }

    fn resolve_single(
        &self,
        input_name: &str,
        conn: &Connection,
        state: &FlowState,
    ) -> Option<Value> {
        let role = self.source_role(conn);
        let extractor = self.extractors.get(&role)?;

        match extractor.extract(conn, input_name, state, &self.cache) {
            Some(value) => Some(value),
            None => {
                self.cache.record_error(&conn.source_node_id, input_name);
                tracing::warn!(
                    source = %conn.source_node_id,
                    input = input_name,
                    role = ?role,
                    "connection produced no value"
                );
                None
            }
        }
    }

    /// Fan-in: extract each upstream connection independently, then
    /// aggregate by input-name semantics
    fn resolve_multi(
        &self,
        input_name: &str,
        conns: &[Connection],
        state: &FlowState,
    ) -> Option<Value> {
        let mut values = Vec::new();
        for conn in conns {
            if let Some(value) = self.resolve_single(input_name, conn, state) {
                values.push(value);
            }
        }

        if values.is_empty() {
            return None;
        }
        if values.len() == 1 {
            return values.pop();
        }
        Some(aggregate(input_name, values))
    }

    fn source_role(&self, conn: &Connection) -> NodeRole {
        self.node_types
            .get(&conn.source_node_id)
            .map(|node_type| self.classifier.classify(node_type).role)
            .unwrap_or(NodeRole::Processor)
    }
}

/// Combine fan-in values into one, in priority order of the input name's
/// semantics
fn aggregate(input_name: &str, values: Vec<Value>) -> Value {
    if matches!(input_name, "tools" | "tool" | "tool_list") {
        return aggregate_tools(values);
    }

    if matches!(input_name, "documents" | "document" | "content" | "data") {
        return flatten_to_list(values);
    }

    if values.iter().all(|v| matches!(v, Value::Array(_))) {
        return flatten_to_list(values);
    }

    if values.iter().all(|v| matches!(v, Value::String(_))) {
        let joined = values
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        return Value::String(joined);
    }

    if values.iter().all(|v| matches!(v, Value::Object(_))) {
        let mut merged = HashMap::new();
        for value in values {
            if let Value::Object(map) = value {
                merged.extend(map);
            }
        }
        return Value::Object(merged);
    }

    // Heterogeneous passthrough: legacy semantics return the raw values
    // rather than failing, but this usually signals an upstream mismatch.
    tracing::warn!(
        input = input_name,
        count = values.len(),
        "no aggregation strategy matched; passing heterogeneous values through"
    );
    Value::Array(values)
}

/// Tool lists flatten; a mapping carrying a `tools`/`tool` key contributes
/// that sub-value instead of the mapping itself
fn aggregate_tools(values: Vec<Value>) -> Value {
    let mut tools = Vec::new();
    for value in values {
        let unwrapped = match &value {
            Value::Object(map) => map
                .get("tools")
                .or_else(|| map.get("tool"))
                .cloned()
                .unwrap_or(value),
            _ => value,
        };
        match unwrapped {
            Value::Array(items) => tools.extend(items),
            other => tools.push(other),
        }
    }
    Value::Array(tools)
}

/// Extend on list values, append on scalars, preserving connection order
fn flatten_to_list(values: Vec<Value>) -> Value {
    let mut items = Vec::new();
    for value in values {
        match value {
            Value::Array(list) => items.extend(list),
            other => items.push(other),
        }
    }
    Value::Array(items)
}
