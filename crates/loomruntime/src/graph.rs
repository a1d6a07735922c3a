use async_trait::async_trait;
use loomcore::{EngineError, ExecutionId, FlowState};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Synthetic entry pseudo-node bracketing every compiled graph
pub const START_NODE: &str = "__start__";
/// Synthetic exit pseudo-node bracketing every compiled graph
pub const END_NODE: &str = "__end__";

/// A node's state-aware execution unit, bound by value to its own id and
/// config at build time
#[async_trait]
pub trait NodeRunner: Send + Sync {
    async fn run(&self, state: &mut FlowState, config: InvokeConfig) -> loomcore::Result<()>;
}

/// Per-run invocation parameters threaded to every runner
#[derive(Clone)]
pub struct InvokeConfig {
    pub execution_id: ExecutionId,
    pub cancellation: CancellationToken,
}

/// Node/edge description handed to a graph runtime for compilation
pub struct GraphSpec {
    pub nodes: HashMap<String, Arc<dyn NodeRunner>>,
    /// Original definition order; runtimes use it as a deterministic
    /// tie-break between independent nodes
    pub node_order: Vec<String>,
    pub edges: Vec<(String, String)>,
    /// Synthetic edges from [`START_NODE`] to each discovered start node
    pub start_edges: Vec<(String, String)>,
    /// Synthetic edges from each discovered end node to [`END_NODE`]
    pub end_edges: Vec<(String, String)>,
}

/// External graph runtime boundary: compiles a node/edge description into
/// an invokable pipeline
pub trait GraphRuntime: Send + Sync {
    fn compile(&self, spec: GraphSpec) -> loomcore::Result<Arc<dyn CompiledGraph>>;
}

#[async_trait]
pub trait CompiledGraph: Send + Sync {
    /// Drive the pipeline to completion, mutating `state` in place
    async fn invoke(&self, state: &mut FlowState, config: InvokeConfig) -> loomcore::Result<()>;
}

/// Default runtime: a sequential walk in topological order
///
/// Single-writer-at-a-time state discipline holds by construction; the
/// cancellation token is checked before every node.
pub struct TopoRuntime;

impl GraphRuntime for TopoRuntime {
    fn compile(&self, spec: GraphSpec) -> loomcore::Result<Arc<dyn CompiledGraph>> {
        let mut graph = DiGraph::<String, ()>::new();
        let mut indices: HashMap<String, NodeIndex> = HashMap::new();

        // Seed in definition order so toposort ties break deterministically.
        for node_id in &spec.node_order {
            let idx = graph.add_node(node_id.clone());
            indices.insert(node_id.clone(), idx);
        }

        let all_edges = spec
            .start_edges
            .iter()
            .chain(spec.edges.iter())
            .chain(spec.end_edges.iter());

        for (from, to) in all_edges {
            let from_idx = *indices
                .entry(from.clone())
                .or_insert_with(|| graph.add_node(from.clone()));
            let to_idx = *indices
                .entry(to.clone())
                .or_insert_with(|| graph.add_node(to.clone()));
            graph.add_edge(from_idx, to_idx, ());
        }

        let sorted = toposort(&graph, None).map_err(|_| EngineError::CycleDetected)?;
        let order: Vec<String> = sorted
            .into_iter()
            .map(|idx| graph[idx].clone())
            .filter(|id| spec.nodes.contains_key(id))
            .collect();

        tracing::debug!(nodes = order.len(), "compiled topological execution plan");

        Ok(Arc::new(TopoCompiled {
            order,
            nodes: spec.nodes,
        }))
    }
}

struct TopoCompiled {
    order: Vec<String>,
    nodes: HashMap<String, Arc<dyn NodeRunner>>,
}

#[async_trait]
impl CompiledGraph for TopoCompiled {
    async fn invoke(&self, state: &mut FlowState, config: InvokeConfig) -> loomcore::Result<()> {
        for node_id in &self.order {
            if config.cancellation.is_cancelled() {
                tracing::info!(node_id = %node_id, "run cancelled before node start");
                return Err(EngineError::Cancelled);
            }

            if let Some(runner) = self.nodes.get(node_id) {
                runner.run(state, config.clone()).await?;
            }
        }
        Ok(())
    }
}
