// crates/loomcore/tests/flow_wire_test.rs

use loomcore::{FlowDefinition, FlowState, Value};

#[test]
fn test_edge_handles_default_when_omitted() {
    let json = r#"{
        "nodes": [
            {"id": "a", "type": "input.text", "data": {"text": "hi"}},
            {"id": "b", "type": "output.collect"}
        ],
        "edges": [
            {"source": "a", "target": "b"}
        ]
    }"#;

    let flow: FlowDefinition = serde_json::from_str(json).expect("valid flow json");
    assert_eq!(flow.nodes.len(), 2);
    assert_eq!(flow.edges[0].source_handle, "output");
    assert_eq!(flow.edges[0].target_handle, "input");
}

#[test]
fn test_edge_handles_use_camel_case_on_the_wire() {
    let json = r#"{
        "nodes": [
            {"id": "a", "type": "input.text"},
            {"id": "b", "type": "output.collect"}
        ],
        "edges": [
            {"source": "a", "sourceHandle": "text", "target": "b", "targetHandle": "documents"}
        ]
    }"#;

    let flow: FlowDefinition = serde_json::from_str(json).expect("valid flow json");
    assert_eq!(flow.edges[0].source_handle, "text");
    assert_eq!(flow.edges[0].target_handle, "documents");

    let round_trip = serde_json::to_string(&flow).expect("serializes");
    assert!(round_trip.contains("\"sourceHandle\":\"text\""));
    assert!(round_trip.contains("\"targetHandle\":\"documents\""));
}

#[test]
fn test_node_type_field_is_named_type_on_the_wire() {
    let json = r#"{"nodes": [{"id": "a", "type": "debug.log"}], "edges": []}"#;
    let flow: FlowDefinition = serde_json::from_str(json).expect("valid flow json");
    assert_eq!(flow.nodes[0].node_type, "debug.log");

    let round_trip = serde_json::to_string(&flow).expect("serializes");
    assert!(round_trip.contains("\"type\":\"debug.log\""));
}

#[test]
fn test_value_round_trips_plain_json() {
    let json: serde_json::Value = serde_json::from_str(
        r#"{"name": "doc", "tags": ["a", "b"], "score": 0.5, "ok": true, "none": null}"#,
    )
    .expect("valid json");

    let value = Value::from_json(json.clone());
    match &value {
        Value::Object(map) => {
            assert_eq!(map.get("name"), Some(&Value::String("doc".into())));
            assert_eq!(
                map.get("tags"),
                Some(&Value::Array(vec![
                    Value::String("a".into()),
                    Value::String("b".into())
                ]))
            );
            assert_eq!(map.get("score"), Some(&Value::Number(0.5)));
            assert_eq!(map.get("ok"), Some(&Value::Bool(true)));
            assert_eq!(map.get("none"), Some(&Value::Null));
        }
        other => panic!("expected object, got {:?}", other),
    }

    assert_eq!(value.to_json(), json);
}

#[test]
fn test_value_deserializes_untagged() {
    let value: Value = serde_json::from_str(r#"["x", 1.5, {"k": null}]"#).expect("valid");
    match value {
        Value::Array(items) => {
            assert_eq!(items[0], Value::String("x".into()));
            assert_eq!(items[1], Value::Number(1.5));
            assert!(matches!(items[2], Value::Object(_)));
        }
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_flow_state_serde_round_trip() {
    let mut state = FlowState::new("session-1");
    state.user_id = Some("user-9".to_string());
    state.set_variable("topic", Value::String("graphs".into()));
    state.mark_executed("n1");
    state.last_output = Some(Value::Number(1.0));

    let json = serde_json::to_string(&state).expect("serializes");
    let restored: FlowState = serde_json::from_str(&json).expect("deserializes");

    assert_eq!(restored.session_id, "session-1");
    assert_eq!(restored.user_id.as_deref(), Some("user-9"));
    assert_eq!(
        restored.variables.get("topic"),
        Some(&Value::String("graphs".into()))
    );
    assert_eq!(restored.executed_nodes, vec!["n1".to_string()]);
    assert_eq!(restored.last_output, Some(Value::Number(1.0)));
}
