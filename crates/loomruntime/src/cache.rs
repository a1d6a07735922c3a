use loomcore::{CacheEntry, FlowState, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Ordered fallback keys for the canonical input names. The first present
/// key wins.
const FALLBACK_KEYS: &[(&str, &[&str])] = &[
    ("documents", &["documents", "document", "content", "output"]),
    ("content", &["content", "text", "documents", "output"]),
    ("output", &["output", "result", "content", "text"]),
    ("input", &["input", "text", "content", "output"]),
];

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct AccessCounters {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct LatencySummary {
    pub accesses: u64,
    pub total_micros: u64,
}

impl LatencySummary {
    pub fn avg_micros(&self) -> u64 {
        if self.accesses == 0 {
            0
        } else {
            self.total_micros / self.accesses
        }
    }
}

/// Diagnostics snapshot of cache activity
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    /// Counters keyed `node_id:input_name`
    pub accesses: HashMap<String, AccessCounters>,
    /// Access latency keyed by node id
    pub latency: HashMap<String, LatencySummary>,
}

/// Stores each executed node's result in flow state and retrieves it with
/// direct-key, fallback-key, and whole-result strategies
///
/// The outputs themselves live in `FlowState` (one live entry per node id
/// per run); the cache owns only the access statistics, which span runs.
#[derive(Default)]
pub struct NodeOutputCache {
    counters: Mutex<HashMap<String, AccessCounters>>,
    latency: Mutex<HashMap<String, LatencySummary>>,
}

impl NodeOutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a node's output into `state.node_outputs`
    pub fn store(
        &self,
        state: &mut FlowState,
        node_id: &str,
        output: Value,
        metadata: HashMap<String, Value>,
    ) {
        tracing::debug!(node_id, "caching node output");
        state.node_outputs.insert(
            node_id.to_string(),
            CacheEntry::new(node_id, output).with_metadata(metadata),
        );
    }

    /// Retrieve a value for `input_name` from a node's cached output
    ///
    /// Three tiers: direct key match on mapping outputs, the fallback-key
    /// table for canonical names, then the whole stored result unmodified.
    /// `None` only when the node has not produced an output.
    pub fn get(&self, state: &FlowState, node_id: &str, input_name: &str) -> Option<Value> {
        let started = Instant::now();
        let result = Self::lookup(state, node_id, input_name);
        self.record_access(node_id, input_name, result.is_some(), started.elapsed());
        result
    }

    fn lookup(state: &FlowState, node_id: &str, input_name: &str) -> Option<Value> {
        let entry = state.node_outputs.get(node_id)?;

        if let Value::Object(map) = &entry.data {
            if let Some(value) = map.get(input_name) {
                return Some(value.clone());
            }

            if let Some((_, alternates)) =
                FALLBACK_KEYS.iter().find(|(name, _)| *name == input_name)
            {
                for alternate in *alternates {
                    if let Some(value) = map.get(*alternate) {
                        tracing::trace!(
                            node_id,
                            input_name,
                            alternate,
                            "resolved input via fallback key"
                        );
                        return Some(value.clone());
                    }
                }
            }
        }

        // Whole-result fallback
        Some(entry.data.clone())
    }

    /// Remove a node's cached output; returns whether an entry existed
    pub fn clear(&self, state: &mut FlowState, node_id: &str) -> bool {
        state.node_outputs.remove(node_id).is_some()
    }

    /// Record an extraction error against `node_id:input_name`
    pub fn record_error(&self, node_id: &str, input_name: &str) {
        if let Ok(mut counters) = self.counters.lock() {
            counters
                .entry(format!("{}:{}", node_id, input_name))
                .or_default()
                .errors += 1;
        }
    }

    /// Snapshot of access statistics for diagnostics
    pub fn stats(&self) -> CacheStats {
        let accesses = self
            .counters
            .lock()
            .map(|counters| counters.clone())
            .unwrap_or_default();
        let latency = self
            .latency
            .lock()
            .map(|latency| latency.clone())
            .unwrap_or_default();
        CacheStats { accesses, latency }
    }

    fn record_access(&self, node_id: &str, input_name: &str, hit: bool, elapsed: Duration) {
        if let Ok(mut counters) = self.counters.lock() {
            let entry = counters
                .entry(format!("{}:{}", node_id, input_name))
                .or_default();
            if hit {
                entry.hits += 1;
            } else {
                entry.misses += 1;
            }
        }

        if let Ok(mut latency) = self.latency.lock() {
            let entry = latency.entry(node_id.to_string()).or_default();
            entry.accesses += 1;
            entry.total_micros += elapsed.as_micros() as u64;
        }
    }
}
