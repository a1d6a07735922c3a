// crates/loomruntime/tests/connections_test.rs

use loomcore::{EdgeDefinition, IssueKind};
use loomruntime::{ConnectionMapper, InputBinding};

fn edge(source: &str, source_handle: &str, target: &str, target_handle: &str) -> EdgeDefinition {
    EdgeDefinition {
        source: source.to_string(),
        source_handle: source_handle.to_string(),
        target: target.to_string(),
        target_handle: target_handle.to_string(),
        data_type: None,
    }
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_builds_connection_map_for_valid_edges() {
    let edges = vec![edge("a", "output", "b", "input"), edge("b", "output", "c", "input")];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "c"]));

    assert!(mapper.issues().is_empty());
    assert!(mapper.map().has_incoming("b"));
    assert!(mapper.map().has_outgoing("b"));
    assert!(!mapper.map().has_incoming("a"));
    assert!(!mapper.map().has_outgoing("c"));
}

#[test]
fn test_missing_endpoints_are_recorded_not_dropped() {
    let edges = vec![
        edge("a", "output", "ghost", "input"),
        edge("phantom", "output", "b", "input"),
        edge("a", "output", "b", "input"),
    ];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b"]));

    let kinds: Vec<IssueKind> = mapper.issues().iter().map(|i| i.kind).collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&IssueKind::MissingTargetNode));
    assert!(kinds.contains(&IssueKind::MissingSourceNode));

    // The valid edge is still mapped best-effort.
    assert!(mapper.map().has_incoming("b"));
}

#[test]
fn test_fan_in_preserves_connection_order() {
    let edges = vec![
        edge("a", "output", "c", "documents"),
        edge("b", "output", "c", "documents"),
    ];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "c"]));

    let bindings = mapper.map().inputs_for("c").expect("c has inputs");
    match bindings.get("documents").expect("documents binding") {
        InputBinding::FanIn(conns) => {
            assert_eq!(conns.len(), 2);
            assert_eq!(conns[0].source_node_id, "a");
            assert_eq!(conns[1].source_node_id, "b");
        }
        other => panic!("expected fan-in, got {:?}", other),
    }
}

#[test]
fn test_single_connection_stays_single() {
    let edges = vec![edge("a", "output", "b", "input")];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b"]));

    let bindings = mapper.map().inputs_for("b").expect("b has inputs");
    assert!(matches!(
        bindings.get("input").expect("input binding"),
        InputBinding::Single(_)
    ));
}

#[test]
fn test_detect_cycle_reports_three_node_loop() {
    let edges = vec![
        edge("a", "output", "b", "input"),
        edge("b", "output", "c", "input"),
        edge("c", "output", "a", "input"),
    ];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "c"]));
    assert!(mapper.detect_cycle());
}

#[test]
fn test_detect_cycle_accepts_diamond() {
    // a -> b, a -> c, b -> d, c -> d: a DAG even though d is reached twice
    let edges = vec![
        edge("a", "output", "b", "input"),
        edge("a", "output", "c", "input"),
        edge("b", "output", "d", "input"),
        edge("c", "output", "d", "input"),
    ];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "c", "d"]));
    assert!(!mapper.detect_cycle());
}

#[test]
fn test_start_and_end_node_discovery() {
    let edges = vec![edge("a", "output", "b", "input"), edge("b", "output", "c", "input")];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "c"]));

    assert_eq!(mapper.find_start_nodes(), vec!["a".to_string()]);
    assert_eq!(mapper.find_end_nodes(), vec!["c".to_string()]);
}

#[test]
fn test_boundary_fallback_uses_input_array_order() {
    // Every node has incoming and outgoing edges, so discovery falls back
    // to the first/last node of the original input array.
    let edges = vec![
        edge("x", "output", "y", "input"),
        edge("y", "output", "x", "input"),
    ];
    let mapper = ConnectionMapper::build(&edges, ids(&["x", "y"]));

    assert_eq!(mapper.find_start_nodes(), vec!["x".to_string()]);
    assert_eq!(mapper.find_end_nodes(), vec!["y".to_string()]);
}

#[test]
fn test_orphaned_nodes_detected() {
    let edges = vec![edge("a", "output", "b", "input")];
    let mapper = ConnectionMapper::build(&edges, ids(&["a", "b", "lonely"]));

    assert_eq!(mapper.orphaned_nodes(), vec!["lonely".to_string()]);
}

#[test]
fn test_single_node_flow_is_not_orphaned() {
    let mapper = ConnectionMapper::build(&[], ids(&["only"]));
    assert!(mapper.orphaned_nodes().is_empty());
    assert_eq!(mapper.find_start_nodes(), vec!["only".to_string()]);
    assert_eq!(mapper.find_end_nodes(), vec!["only".to_string()]);
}
