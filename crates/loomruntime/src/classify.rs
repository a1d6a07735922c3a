use crate::registry::{NodeRegistry, NodeTypeMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Functional role of a node type within a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Provider,
    Processor,
    Memory,
    Terminator,
    ControlFlow,
}

/// Which classification level produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Cache,
    Dynamic,
    Fallback,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub role: NodeRole,
    pub category: String,
    pub is_control_flow: bool,
    pub session_aware: bool,
    pub detection_source: DetectionSource,
    pub timestamp: DateTime<Utc>,
}

/// Transitional name->role table for node types registered before
/// metadata-driven detection existed.
const LEGACY_ROLES: &[(&str, NodeRole)] = &[
    ("llm", NodeRole::Provider),
    ("prompt", NodeRole::Provider),
    ("embeddings", NodeRole::Provider),
    ("agent", NodeRole::Processor),
    ("chain", NodeRole::Processor),
    ("chat_memory", NodeRole::Memory),
    ("vector_store", NodeRole::Memory),
    ("conditional_router", NodeRole::ControlFlow),
    ("loop", NodeRole::ControlFlow),
    ("chat_output", NodeRole::Terminator),
    ("text_output", NodeRole::Terminator),
];

const CONTROL_FLOW_KEYWORDS: &[&str] = &[
    "conditional",
    "router",
    "loop",
    "branch",
    "switch",
    "control",
];

const PROVIDER_KEYWORDS: &[&str] = &[
    "llm",
    "model",
    "provider",
    "embedding",
    "embeddings",
    "prompt",
    "input",
    "source",
    "http",
];

const MEMORY_KEYWORDS: &[&str] = &["memory", "history", "buffer", "session", "store"];

const TERMINATOR_KEYWORDS: &[&str] = &["output", "terminator", "sink", "collect", "end"];

/// Determines a node type's functional role from declared metadata, with a
/// per-type-name cache and layered fallback
///
/// Classification is shared across all instances of the same type. The
/// cache is read-mostly; a race on first classification recomputes the
/// same result, which is harmless.
pub struct TypeClassifier {
    registry: Arc<NodeRegistry>,
    cache: RwLock<HashMap<String, ClassificationResult>>,
}

impl TypeClassifier {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Classify a node type name; never fails
    ///
    /// Levels, each tried only if the previous misses:
    /// cache -> metadata keywords -> legacy table -> conservative default.
    pub fn classify(&self, node_type: &str) -> ClassificationResult {
        if let Ok(cache) = self.cache.read() {
            if let Some(cached) = cache.get(node_type) {
                let mut result = cached.clone();
                result.detection_source = DetectionSource::Cache;
                return result;
            }
        }

        if let Some(metadata) = self.registry.get_metadata(node_type) {
            let result = Self::detect_from_metadata(&metadata);
            tracing::debug!(
                node_type,
                role = ?result.role,
                "classified node type from metadata"
            );
            self.cache_result(node_type, &result);
            return result;
        }

        if let Some((_, role)) = LEGACY_ROLES.iter().find(|(name, _)| *name == node_type) {
            tracing::debug!(node_type, role = ?role, "classified node type via legacy table");
            let result = ClassificationResult {
                role: *role,
                category: "legacy".to_string(),
                is_control_flow: *role == NodeRole::ControlFlow,
                session_aware: *role == NodeRole::Memory,
                detection_source: DetectionSource::Fallback,
                timestamp: Utc::now(),
            };
            self.cache_result(node_type, &result);
            return result;
        }

        // Unknown types get a conservative default; not cached so a later
        // registration of the type can still be picked up.
        tracing::warn!(node_type, "could not classify node type; defaulting to processor");
        ClassificationResult {
            role: NodeRole::Processor,
            category: "unknown".to_string(),
            is_control_flow: false,
            session_aware: false,
            detection_source: DetectionSource::Error,
            timestamp: Utc::now(),
        }
    }

    /// Registered type names with the given role, in registration order
    pub fn nodes_by_role(&self, role: NodeRole) -> Vec<String> {
        self.registry
            .list_node_types()
            .into_iter()
            .filter(|node_type| self.classify(node_type).role == role)
            .collect()
    }

    /// Registered type names flagged as control flow, in registration order
    pub fn control_flow_node_types(&self) -> Vec<String> {
        self.registry
            .list_node_types()
            .into_iter()
            .filter(|node_type| self.classify(node_type).is_control_flow)
            .collect()
    }

    fn detect_from_metadata(metadata: &NodeTypeMetadata) -> ClassificationResult {
        let haystack = format!(
            "{} {} {}",
            metadata.category.to_lowercase(),
            metadata.tags.join(" ").to_lowercase(),
            metadata.description.to_lowercase()
        );
        // Whole-token comparison; substring matching misfires on words
        // like "rendered" (contains "end").
        let tokens: HashSet<&str> = haystack
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| tokens.contains(k));

        let role = if contains_any(CONTROL_FLOW_KEYWORDS) {
            NodeRole::ControlFlow
        } else if contains_any(MEMORY_KEYWORDS) {
            NodeRole::Memory
        } else if contains_any(TERMINATOR_KEYWORDS) {
            NodeRole::Terminator
        } else if contains_any(PROVIDER_KEYWORDS) {
            NodeRole::Provider
        } else {
            NodeRole::Processor
        };

        let session_aware = role == NodeRole::Memory
            || metadata.tags.iter().any(|t| {
                let tag = t.to_lowercase();
                tag == "session" || tag == "chat"
            });

        ClassificationResult {
            role,
            category: metadata.category.clone(),
            is_control_flow: role == NodeRole::ControlFlow,
            session_aware,
            detection_source: DetectionSource::Dynamic,
            timestamp: Utc::now(),
        }
    }

    fn cache_result(&self, node_type: &str, result: &ClassificationResult) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(node_type.to_string(), result.clone());
        }
    }
}
