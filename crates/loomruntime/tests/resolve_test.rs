// crates/loomruntime/tests/resolve_test.rs

use loomcore::{Connection, FlowState, Value};
use loomruntime::{ConnectionResolver, InputBinding, NodeOutputCache, NodeRegistry, TypeClassifier};
use std::collections::HashMap;
use std::sync::Arc;

fn conn(source: &str, source_handle: &str, target_handle: &str) -> Connection {
    Connection {
        source_node_id: source.to_string(),
        source_handle: source_handle.to_string(),
        target_node_id: "sink".to_string(),
        target_handle: target_handle.to_string(),
        data_type: None,
    }
}

/// Resolver over plain processor-classified sources
fn resolver_for(sources: &[&str]) -> (ConnectionResolver, Arc<NodeOutputCache>) {
    let registry = Arc::new(NodeRegistry::new());
    let classifier = Arc::new(TypeClassifier::new(registry));
    let cache = Arc::new(NodeOutputCache::new());
    let node_types: HashMap<String, String> = sources
        .iter()
        .map(|id| (id.to_string(), "generic.step".to_string()))
        .collect();
    (
        ConnectionResolver::new(classifier, cache.clone(), node_types),
        cache,
    )
}

fn fan_in(handles: &[(&str, &str)], target_handle: &str) -> InputBinding {
    InputBinding::FanIn(
        handles
            .iter()
            .map(|(source, source_handle)| conn(source, source_handle, target_handle))
            .collect(),
    )
}

#[test]
fn test_tools_connections_flatten_in_order() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(
        &mut state,
        "a",
        Value::Array(vec![Value::String("A".into())]),
        HashMap::new(),
    );
    cache.store(
        &mut state,
        "b",
        Value::Array(vec![Value::String("B".into())]),
        HashMap::new(),
    );

    let binding = fan_in(&[("a", "output"), ("b", "output")], "tools");
    let resolved = resolver.resolve("tools", &binding, &state);

    assert_eq!(
        resolved,
        Some(Value::Array(vec![
            Value::String("A".into()),
            Value::String("B".into())
        ]))
    );
}

#[test]
fn test_tools_unwrap_mapping_with_tools_key() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    let mut wrapped = HashMap::new();
    wrapped.insert(
        "tools".to_string(),
        Value::Array(vec![Value::String("t1".into())]),
    );
    wrapped.insert("name".to_string(), Value::String("toolkit".into()));
    cache.store(&mut state, "a", Value::Object(wrapped), HashMap::new());
    cache.store(
        &mut state,
        "b",
        Value::Array(vec![Value::String("t2".into())]),
        HashMap::new(),
    );

    let binding = fan_in(&[("a", "output"), ("b", "output")], "tools");
    let resolved = resolver.resolve("tools", &binding, &state);

    assert_eq!(
        resolved,
        Some(Value::Array(vec![
            Value::String("t1".into()),
            Value::String("t2".into())
        ]))
    );
}

#[test]
fn test_documents_extend_lists_and_append_scalars() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(
        &mut state,
        "a",
        Value::Array(vec![Value::String("d1".into()), Value::String("d2".into())]),
        HashMap::new(),
    );
    cache.store(&mut state, "b", Value::String("d3".into()), HashMap::new());

    let binding = fan_in(&[("a", "output"), ("b", "output")], "documents");
    let resolved = resolver.resolve("documents", &binding, &state);

    assert_eq!(
        resolved,
        Some(Value::Array(vec![
            Value::String("d1".into()),
            Value::String("d2".into()),
            Value::String("d3".into())
        ]))
    );
}

#[test]
fn test_all_strings_join_with_pipe() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(&mut state, "a", Value::String("foo".into()), HashMap::new());
    cache.store(&mut state, "b", Value::String("bar".into()), HashMap::new());

    let binding = fan_in(&[("a", "output"), ("b", "output")], "query");
    let resolved = resolver.resolve("query", &binding, &state);

    assert_eq!(resolved, Some(Value::String("foo | bar".into())));
}

#[test]
fn test_all_lists_concatenate_in_connection_order() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(
        &mut state,
        "a",
        Value::Array(vec![Value::Number(1.0)]),
        HashMap::new(),
    );
    cache.store(
        &mut state,
        "b",
        Value::Array(vec![Value::Number(2.0)]),
        HashMap::new(),
    );

    let binding = fan_in(&[("a", "output"), ("b", "output")], "items");
    let resolved = resolver.resolve("items", &binding, &state);

    assert_eq!(
        resolved,
        Some(Value::Array(vec![Value::Number(1.0), Value::Number(2.0)]))
    );
}

#[test]
fn test_all_mappings_shallow_merge_later_wins() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    let mut first = HashMap::new();
    first.insert("x".to_string(), Value::Number(1.0));
    first.insert("y".to_string(), Value::Number(1.0));
    let mut second = HashMap::new();
    second.insert("y".to_string(), Value::Number(2.0));

    cache.store(&mut state, "a", Value::Object(first), HashMap::new());
    cache.store(&mut state, "b", Value::Object(second), HashMap::new());

    let binding = fan_in(&[("a", "output"), ("b", "output")], "settings");
    let resolved = resolver.resolve("settings", &binding, &state);

    let merged = match resolved {
        Some(Value::Object(map)) => map,
        other => panic!("expected object, got {:?}", other),
    };
    assert_eq!(merged.get("x"), Some(&Value::Number(1.0)));
    assert_eq!(merged.get("y"), Some(&Value::Number(2.0)));
}

#[test]
fn test_heterogeneous_values_pass_through_as_list() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(&mut state, "a", Value::String("str".into()), HashMap::new());
    cache.store(&mut state, "b", Value::Number(42.0), HashMap::new());

    let binding = fan_in(&[("a", "output"), ("b", "output")], "mixed");
    let resolved = resolver.resolve("mixed", &binding, &state);

    assert_eq!(
        resolved,
        Some(Value::Array(vec![
            Value::String("str".into()),
            Value::Number(42.0)
        ]))
    );
}

#[test]
fn test_zero_successful_extractions_resolve_to_none() {
    let (resolver, _cache) = resolver_for(&["a", "b"]);
    let state = FlowState::new("s");

    // Neither source has produced an output.
    let binding = fan_in(&[("a", "output"), ("b", "output")], "query");
    assert_eq!(resolver.resolve("query", &binding, &state), None);
}

#[test]
fn test_single_success_is_returned_directly() {
    let (resolver, cache) = resolver_for(&["a", "b"]);
    let mut state = FlowState::new("s");

    cache.store(&mut state, "b", Value::String("only".into()), HashMap::new());

    let binding = fan_in(&[("a", "output"), ("b", "output")], "query");
    assert_eq!(
        resolver.resolve("query", &binding, &state),
        Some(Value::String("only".into()))
    );
}

#[test]
fn test_provider_source_extracts_named_output_port() {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry);
    let registry = Arc::new(registry);
    let classifier = Arc::new(TypeClassifier::new(registry));
    let cache = Arc::new(NodeOutputCache::new());

    let mut node_types = HashMap::new();
    node_types.insert("greeting".to_string(), "input.text".to_string());
    let resolver = ConnectionResolver::new(classifier, cache.clone(), node_types);

    let mut state = FlowState::new("s");
    let mut output = HashMap::new();
    output.insert("text".to_string(), Value::String("hi".into()));
    cache.store(&mut state, "greeting", Value::Object(output), HashMap::new());

    let binding = InputBinding::Single(conn("greeting", "text", "input"));
    assert_eq!(
        resolver.resolve("input", &binding, &state),
        Some(Value::String("hi".into()))
    );
}
