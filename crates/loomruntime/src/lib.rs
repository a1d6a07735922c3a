//! Flow compilation and execution runtime
//!
//! This crate turns a declarative flow definition into an executable
//! pipeline: it validates topology, classifies node types, resolves
//! fan-in connections against cached node outputs, and drives execution
//! through a pluggable graph runtime while threading session state
//! through every node.

mod cache;
mod checkpoint;
mod classify;
mod connections;
mod engine;
mod graph;
mod registry;
mod resolve;

pub use cache::{AccessCounters, CacheStats, LatencySummary, NodeOutputCache};
pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use classify::{ClassificationResult, DetectionSource, NodeRole, TypeClassifier};
pub use connections::{ConnectionMap, ConnectionMapper, InputBinding};
pub use engine::{CompiledFlow, ExecuteOptions, ExecutionReport, FlowEngine, ValidationReport};
pub use graph::{
    CompiledGraph, GraphRuntime, GraphSpec, InvokeConfig, NodeRunner, TopoRuntime, END_NODE,
    START_NODE,
};
pub use registry::{NodeFactory, NodeRegistry, NodeTypeMetadata, PortDefinition};
pub use resolve::{ConnectionExtractor, ConnectionResolver};
