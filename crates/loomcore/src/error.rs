use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error for the engine service boundary
///
/// Runtime variants are always caught at the `execute` boundary and converted
/// into the structured failure envelope; `error_type` supplies the envelope's
/// machine-readable class.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid flow definition ({} issue(s))", .0.len())]
    Definition(Vec<ValidationIssue>),

    #[error("cycle detected in flow graph")]
    CycleDetected,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("node error: {0}")]
    Node(#[from] NodeError),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("execution cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Machine-readable class for the failure envelope
    pub fn error_type(&self) -> &'static str {
        match self {
            EngineError::Definition(_) => "definition",
            EngineError::CycleDetected => "cycle_detected",
            EngineError::SessionNotFound(_) => "session_not_found",
            EngineError::Node(_) => "node_execution",
            EngineError::Execution(_) => "execution",
            EngineError::Cancelled => "cancelled",
            EngineError::Io(_) => "io",
            EngineError::Serialization(_) => "serialization",
        }
    }
}

/// Errors raised by individual node implementations
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Cancelled")]
    Cancelled,
}

/// A single problem found while mapping or validating a flow definition
///
/// Issues are collected, never thrown: endpoint violations are recorded and
/// the rest of the definition is still mapped best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn for_node(kind: IssueKind, node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: Some(node_id.into()),
        }
    }

    /// Orphaned nodes are warnings; everything else blocks a build.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind, IssueKind::OrphanedNode)
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateNodeId,
    UnknownNodeType,
    MissingSourceNode,
    MissingTargetNode,
    OrphanedNode,
    Cycle,
}
