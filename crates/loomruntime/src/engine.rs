use crate::cache::{CacheStats, NodeOutputCache};
use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use crate::classify::TypeClassifier;
use crate::connections::{ConnectionMap, ConnectionMapper};
use crate::graph::{
    CompiledGraph, GraphRuntime, GraphSpec, InvokeConfig, NodeRunner, TopoRuntime, END_NODE,
    START_NODE,
};
use crate::registry::NodeRegistry;
use crate::resolve::ConnectionResolver;
use async_trait::async_trait;
use chrono::Utc;
use loomcore::{
    EngineError, EventBus, ExecutionEvent, ExecutionId, FlowDefinition, FlowState, IssueKind,
    Node, NodeContext, NodeError, ValidationIssue, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A flow compiled against a graph runtime, reusable across executions
pub struct CompiledFlow {
    graph: Arc<dyn CompiledGraph>,
    pub node_count: usize,
    pub edge_count: usize,
    pub start_nodes: Vec<String>,
    pub end_nodes: Vec<String>,
}

/// Caller-facing options for one execution
#[derive(Default, Clone)]
pub struct ExecuteOptions {
    pub inputs: HashMap<String, Value>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub workflow_id: Option<String>,
    pub cancellation: Option<CancellationToken>,
}

impl ExecuteOptions {
    pub fn with_inputs(inputs: HashMap<String, Value>) -> Self {
        Self {
            inputs,
            ..Self::default()
        }
    }
}

/// Normalized outcome envelope; no error ever crosses this boundary raw
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FlowState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executed_nodes: Vec<String>,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ExecutionReport {
    fn succeeded(state: FlowState) -> Self {
        Self {
            success: true,
            result: state.last_output.clone(),
            executed_nodes: state.executed_nodes.clone(),
            session_id: state.session_id.clone(),
            state: Some(state),
            error: None,
            error_type: None,
        }
    }

    fn failed(session_id: String, error: &EngineError) -> Self {
        Self {
            success: false,
            result: None,
            state: None,
            executed_nodes: Vec::new(),
            session_id,
            error: Some(error.to_string()),
            error_type: Some(error.error_type().to_string()),
        }
    }
}

/// Outcome of definition-only validation; no nodes are instantiated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub node_count: usize,
    pub edge_count: usize,
}

/// The service facade: compiles flow definitions into executable pipelines
/// and drives them with session-scoped state
///
/// All collaborators (registry, classifier, output cache, graph runtime,
/// checkpoint store, event bus) are explicit instances injected at
/// construction; there are no process-wide globals.
pub struct FlowEngine {
    registry: Arc<NodeRegistry>,
    classifier: Arc<TypeClassifier>,
    cache: Arc<NodeOutputCache>,
    runtime: Arc<dyn GraphRuntime>,
    checkpoints: Arc<dyn CheckpointStore>,
    event_bus: Arc<EventBus>,
    validation_cache: RwLock<HashMap<u64, ValidationReport>>,
}

impl FlowEngine {
    /// Engine with the default topological runtime and in-memory checkpoints
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self::with_components(
            registry,
            Arc::new(TopoRuntime),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(EventBus::new(1024)),
        )
    }

    pub fn with_components(
        registry: Arc<NodeRegistry>,
        runtime: Arc<dyn GraphRuntime>,
        checkpoints: Arc<dyn CheckpointStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let classifier = Arc::new(TypeClassifier::new(registry.clone()));
        Self {
            registry,
            classifier,
            cache: Arc::new(NodeOutputCache::new()),
            runtime,
            checkpoints,
            event_bus,
            validation_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn classifier(&self) -> &Arc<TypeClassifier> {
        &self.classifier
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Compile a flow definition into an executable pipeline
    ///
    /// Unknown node types, duplicate ids, and dangling edge endpoints fail
    /// fast with the full issue list; a cyclic graph refuses to compile.
    pub fn build(&self, definition: &FlowDefinition) -> loomcore::Result<CompiledFlow> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for node in &definition.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(ValidationIssue::for_node(
                    IssueKind::DuplicateNodeId,
                    node.id.clone(),
                    format!("duplicate node id '{}'", node.id),
                ));
            }
            if self.registry.lookup(&node.node_type).is_none() {
                issues.push(ValidationIssue::for_node(
                    IssueKind::UnknownNodeType,
                    node.id.clone(),
                    format!("unknown node type '{}' for node '{}'", node.node_type, node.id),
                ));
            }
        }

        let node_order = definition.node_ids();
        let mapper = ConnectionMapper::build(&definition.edges, node_order.clone());
        issues.extend(mapper.issues().iter().cloned());

        if !issues.is_empty() {
            return Err(EngineError::Definition(issues));
        }

        if mapper.detect_cycle() {
            return Err(EngineError::CycleDetected);
        }

        let start_nodes = mapper.find_start_nodes();
        let end_nodes = mapper.find_end_nodes();

        let mut node_types = HashMap::new();
        for node in &definition.nodes {
            node_types.insert(node.id.clone(), node.node_type.clone());
        }

        let resolver = Arc::new(ConnectionResolver::new(
            self.classifier.clone(),
            self.cache.clone(),
            node_types,
        ));
        let connections = Arc::new(mapper.into_map());

        // Each runner is bound by value to its own id/config/instance so
        // wrapping many nodes in a loop cannot alias shared captures.
        let mut runners: HashMap<String, Arc<dyn NodeRunner>> = HashMap::new();
        for node in &definition.nodes {
            let instance = self
                .registry
                .create_node(&node.node_type, &node.data)?;
            instance
                .validate_config(&node.data)
                .map_err(EngineError::Node)?;

            let runner = NodeExecUnit {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
                config: node.data.clone(),
                instance: Arc::from(instance),
                resolver: resolver.clone(),
                connections: connections.clone(),
                cache: self.cache.clone(),
                events: self.event_bus.clone(),
            };
            runners.insert(node.id.clone(), Arc::new(runner));
        }

        let edges: Vec<(String, String)> = definition
            .edges
            .iter()
            .map(|edge| (edge.source.clone(), edge.target.clone()))
            .collect();
        let start_edges = start_nodes
            .iter()
            .map(|id| (START_NODE.to_string(), id.clone()))
            .collect();
        let end_edges = end_nodes
            .iter()
            .map(|id| (id.clone(), END_NODE.to_string()))
            .collect();

        let graph = self.runtime.compile(GraphSpec {
            nodes: runners,
            node_order,
            edges,
            start_edges,
            end_edges,
        })?;

        tracing::info!(
            nodes = definition.nodes.len(),
            edges = definition.edges.len(),
            "compiled flow"
        );

        Ok(CompiledFlow {
            graph,
            node_count: definition.nodes.len(),
            edge_count: definition.edges.len(),
            start_nodes,
            end_nodes,
        })
    }

    /// Execute a compiled flow with fresh (or checkpoint-restored) state
    pub async fn execute(&self, flow: &CompiledFlow, options: ExecuteOptions) -> ExecutionReport {
        let mut state = match &options.session_id {
            Some(session_id) => match self.checkpoints.get_state(session_id).await {
                Some(prior) => {
                    tracing::debug!(session_id = %session_id, "restored state from checkpoint");
                    prior
                }
                None => FlowState::for_session(
                    session_id.clone(),
                    options.user_id.clone(),
                    options.workflow_id.clone(),
                ),
            },
            None => FlowState::for_session(
                Uuid::new_v4().to_string(),
                options.user_id.clone(),
                options.workflow_id.clone(),
            ),
        };

        state.merge_variables(options.inputs);

        let cancellation = options.cancellation.unwrap_or_default();
        self.run(flow, state, cancellation).await
    }

    /// Resume a prior session; absent sessions are an error, never a
    /// silent fresh start
    pub async fn continue_execution(
        &self,
        flow: &CompiledFlow,
        session_id: &str,
        additional_inputs: HashMap<String, Value>,
    ) -> ExecutionReport {
        match self.checkpoints.get_state(session_id).await {
            Some(mut state) => {
                tracing::info!(session_id, "continuing execution");
                state.merge_variables(additional_inputs);
                self.run(flow, state, CancellationToken::new()).await
            }
            None => {
                let error = EngineError::SessionNotFound(session_id.to_string());
                tracing::warn!(session_id, "continue requested for unknown session");
                ExecutionReport::failed(session_id.to_string(), &error)
            }
        }
    }

    /// Topology-only validation: no nodes are instantiated, nothing runs
    pub fn validate(&self, definition: &FlowDefinition) -> ValidationReport {
        let key = definition_hash(definition);
        if let Ok(cache) = self.validation_cache.read() {
            if let Some(report) = cache.get(&key) {
                tracing::debug!("validation cache hit");
                return report.clone();
            }
        }

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for node in &definition.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("duplicate node id '{}'", node.id));
            }
            if self.registry.lookup(&node.node_type).is_none() {
                errors.push(format!(
                    "unknown node type '{}' for node '{}'",
                    node.node_type, node.id
                ));
            }
        }

        let mapper = ConnectionMapper::build(&definition.edges, definition.node_ids());
        errors.extend(mapper.issues().iter().map(|issue| issue.message.clone()));

        if mapper.detect_cycle() {
            errors.push("cycle detected in flow graph".to_string());
        }

        for orphan in mapper.orphaned_nodes() {
            warnings.push(format!("node '{}' has no connections", orphan));
        }

        let report = ValidationReport {
            valid: errors.is_empty(),
            errors,
            warnings,
            node_count: definition.nodes.len(),
            edge_count: definition.edges.len(),
        };

        if let Ok(mut cache) = self.validation_cache.write() {
            cache.insert(key, report.clone());
        }
        report
    }

    async fn run(
        &self,
        flow: &CompiledFlow,
        mut state: FlowState,
        cancellation: CancellationToken,
    ) -> ExecutionReport {
        let execution_id = ExecutionId::new_v4();
        let session_id = state.session_id.clone();
        let started = Instant::now();

        self.event_bus.emit(ExecutionEvent::FlowStarted {
            execution_id,
            session_id: session_id.clone(),
            workflow_id: state.workflow_id.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(session_id = %session_id, "starting flow execution");

        let outcome = flow
            .graph
            .invoke(
                &mut state,
                InvokeConfig {
                    execution_id,
                    cancellation,
                },
            )
            .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        self.event_bus.emit(ExecutionEvent::FlowCompleted {
            execution_id,
            session_id: session_id.clone(),
            success: outcome.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        // Checkpoint on both paths so the session survives a failed run
        // and can be retried or continued.
        self.checkpoints.save_state(&state).await;

        match outcome {
            Ok(()) => {
                tracing::info!(session_id = %session_id, duration_ms, "flow completed");
                ExecutionReport::succeeded(state)
            }
            Err(error) => {
                let error = match error {
                    EngineError::Node(NodeError::Cancelled) => EngineError::Cancelled,
                    other => other,
                };
                tracing::error!(session_id = %session_id, error = %error, "flow failed");
                ExecutionReport::failed(session_id, &error)
            }
        }
    }
}

/// One node's execution unit: resolves inputs, invokes the node, caches
/// the output, and updates session bookkeeping
struct NodeExecUnit {
    node_id: String,
    node_type: String,
    config: HashMap<String, Value>,
    instance: Arc<dyn Node>,
    resolver: Arc<ConnectionResolver>,
    connections: Arc<ConnectionMap>,
    cache: Arc<NodeOutputCache>,
    events: Arc<EventBus>,
}

#[async_trait]
impl NodeRunner for NodeExecUnit {
    async fn run(&self, state: &mut FlowState, config: InvokeConfig) -> loomcore::Result<()> {
        let started = Instant::now();
        self.events.emit(ExecutionEvent::NodeStarted {
            execution_id: config.execution_id,
            node_id: self.node_id.clone(),
            node_type: self.node_type.clone(),
            timestamp: Utc::now(),
        });

        // Static config becomes visible to downstream nodes as session
        // variables before this node runs.
        state.merge_variables(self.config.clone());

        let mut inputs = HashMap::new();
        if let Some(bindings) = self.connections.inputs_for(&self.node_id) {
            for (input_name, binding) in bindings {
                if let Some(value) = self.resolver.resolve(input_name, binding, state) {
                    inputs.insert(input_name.clone(), value);
                }
            }
        }

        let ctx = NodeContext {
            node_id: self.node_id.clone(),
            inputs,
            config: self.config.clone(),
            variables: state.variables.clone(),
            previous_output: state.output_of(&self.node_id).cloned(),
            session_id: state.session_id.clone(),
            events: self
                .events
                .create_emitter(config.execution_id, self.node_id.clone()),
            cancellation: config.cancellation.clone(),
        };

        match self.instance.execute(ctx).await {
            Ok(output) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::info!(node_id = %self.node_id, duration_ms, "node completed");
                self.events.emit(ExecutionEvent::NodeCompleted {
                    execution_id: config.execution_id,
                    node_id: self.node_id.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                let mut metadata = HashMap::new();
                metadata.insert(
                    "node_type".to_string(),
                    Value::String(self.node_type.clone()),
                );
                metadata.insert("duration_ms".to_string(), Value::Number(duration_ms as f64));
                self.cache
                    .store(state, &self.node_id, output.clone(), metadata);

                state.last_output = Some(output);
                state.mark_executed(&self.node_id);
                Ok(())
            }
            Err(error) => {
                tracing::error!(node_id = %self.node_id, error = %error, "node failed");
                self.events.emit(ExecutionEvent::NodeFailed {
                    execution_id: config.execution_id,
                    node_id: self.node_id.clone(),
                    error: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(EngineError::Node(error))
            }
        }
    }
}

fn definition_hash(definition: &FlowDefinition) -> u64 {
    let mut hasher = DefaultHasher::new();
    if let Ok(json) = serde_json::to_string(definition) {
        json.hash(&mut hasher);
    }
    hasher.finish()
}
