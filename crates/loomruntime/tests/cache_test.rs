// crates/loomruntime/tests/cache_test.rs

use loomcore::{FlowState, Value};
use loomruntime::NodeOutputCache;
use std::collections::HashMap;

fn object(entries: &[(&str, Value)]) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

#[test]
fn test_direct_key_match() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    let output = object(&[("text", Value::String("hello".into()))]);
    cache.store(&mut state, "n1", output, HashMap::new());

    assert_eq!(
        cache.get(&state, "n1", "text"),
        Some(Value::String("hello".into()))
    );
}

#[test]
fn test_fallback_key_chain_bridges_content_to_documents() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    let docs = Value::Array(vec![Value::String("doc1".into())]);
    cache.store(
        &mut state,
        "retriever",
        object(&[("documents", docs.clone())]),
        HashMap::new(),
    );

    // "content" is absent; the fallback chain reaches "documents".
    assert_eq!(cache.get(&state, "retriever", "content"), Some(docs));
}

#[test]
fn test_fallback_key_order_is_respected() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    cache.store(
        &mut state,
        "n1",
        object(&[
            ("text", Value::String("from text".into())),
            ("result", Value::String("from result".into())),
        ]),
        HashMap::new(),
    );

    // For "output" the chain is output -> result -> content -> text.
    assert_eq!(
        cache.get(&state, "n1", "output"),
        Some(Value::String("from result".into()))
    );
}

#[test]
fn test_whole_result_fallback_for_unknown_key() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    let output = object(&[("weird_key", Value::Number(7.0))]);
    cache.store(&mut state, "n1", output.clone(), HashMap::new());

    assert_eq!(cache.get(&state, "n1", "no_such_key"), Some(output));
}

#[test]
fn test_whole_result_fallback_for_scalar_output() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    cache.store(&mut state, "n1", Value::String("plain".into()), HashMap::new());

    assert_eq!(
        cache.get(&state, "n1", "anything"),
        Some(Value::String("plain".into()))
    );
}

#[test]
fn test_miss_when_node_never_ran() {
    let cache = NodeOutputCache::new();
    let state = FlowState::new("s");

    assert_eq!(cache.get(&state, "never_ran", "input"), None);
}

#[test]
fn test_clear_removes_entry() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    cache.store(&mut state, "n1", Value::Bool(true), HashMap::new());
    assert!(cache.clear(&mut state, "n1"));
    assert!(!cache.clear(&mut state, "n1"));
    assert_eq!(cache.get(&state, "n1", "input"), None);
}

#[test]
fn test_store_overwrites_previous_entry() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    cache.store(&mut state, "n1", Value::Number(1.0), HashMap::new());
    cache.store(&mut state, "n1", Value::Number(2.0), HashMap::new());

    assert_eq!(state.node_outputs.len(), 1);
    assert_eq!(cache.get(&state, "n1", "x"), Some(Value::Number(2.0)));
}

#[test]
fn test_access_statistics_are_recorded() {
    let cache = NodeOutputCache::new();
    let mut state = FlowState::new("s");

    cache.store(&mut state, "n1", Value::Bool(true), HashMap::new());
    cache.get(&state, "n1", "input");
    cache.get(&state, "n1", "input");
    cache.get(&state, "missing", "input");

    let stats = cache.stats();
    let hit_entry = stats.accesses.get("n1:input").expect("n1:input counters");
    assert_eq!(hit_entry.hits, 2);
    assert_eq!(hit_entry.misses, 0);

    let miss_entry = stats
        .accesses
        .get("missing:input")
        .expect("missing:input counters");
    assert_eq!(miss_entry.misses, 1);

    let latency = stats.latency.get("n1").expect("latency for n1");
    assert_eq!(latency.accesses, 2);
}
