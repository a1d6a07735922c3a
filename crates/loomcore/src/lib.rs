//! Core abstractions for the loom flow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: the dynamic `Value` type, the flow definition wire
//! format, the session-scoped `FlowState`, the `Node` contract, and the
//! error taxonomy. It contains no execution logic.

mod error;
pub mod events;
mod flow;
mod node;
mod state;
mod value;

pub use error::{EngineError, IssueKind, NodeError, ValidationIssue};
pub use flow::{Connection, EdgeDefinition, FlowDefinition, NodeDefinition};
pub use node::{Node, NodeContext};
pub use state::{CacheEntry, FlowState};
pub use value::Value;
pub use events::*;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, EngineError>;
