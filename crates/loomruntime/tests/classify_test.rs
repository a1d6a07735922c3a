// crates/loomruntime/tests/classify_test.rs

use loomruntime::{DetectionSource, NodeRegistry, NodeRole, TypeClassifier};
use std::sync::Arc;

fn classifier_with_standard_nodes() -> TypeClassifier {
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry);
    TypeClassifier::new(Arc::new(registry))
}

#[test]
fn test_metadata_driven_roles() {
    let classifier = classifier_with_standard_nodes();

    assert_eq!(classifier.classify("input.text").role, NodeRole::Provider);
    assert_eq!(classifier.classify("http.request").role, NodeRole::Provider);
    assert_eq!(classifier.classify("text.template").role, NodeRole::Processor);
    assert_eq!(
        classifier.classify("transform.json_parse").role,
        NodeRole::Processor
    );
    assert_eq!(classifier.classify("memory.buffer").role, NodeRole::Memory);
    assert_eq!(
        classifier.classify("output.collect").role,
        NodeRole::Terminator
    );
    assert_eq!(
        classifier.classify("control.router").role,
        NodeRole::ControlFlow
    );
}

#[test]
fn test_control_flow_flag_and_session_awareness() {
    let classifier = classifier_with_standard_nodes();

    let router = classifier.classify("control.router");
    assert!(router.is_control_flow);

    let memory = classifier.classify("memory.buffer");
    assert!(!memory.is_control_flow);
    assert!(memory.session_aware);
}

#[test]
fn test_detection_source_laddering() {
    let classifier = classifier_with_standard_nodes();

    // First classification comes from metadata, the second from the cache.
    let first = classifier.classify("memory.buffer");
    assert_eq!(first.detection_source, DetectionSource::Dynamic);

    let second = classifier.classify("memory.buffer");
    assert_eq!(second.detection_source, DetectionSource::Cache);
    assert_eq!(second.role, first.role);
}

#[test]
fn test_legacy_table_covers_unregistered_types() {
    let classifier = classifier_with_standard_nodes();

    let result = classifier.classify("chat_memory");
    assert_eq!(result.role, NodeRole::Memory);
    assert_eq!(result.detection_source, DetectionSource::Fallback);

    let router = classifier.classify("conditional_router");
    assert_eq!(router.role, NodeRole::ControlFlow);
    assert!(router.is_control_flow);
}

#[test]
fn test_unknown_type_defaults_conservatively() {
    let classifier = classifier_with_standard_nodes();

    let result = classifier.classify("definitely.not.registered");
    assert_eq!(result.role, NodeRole::Processor);
    assert_eq!(result.detection_source, DetectionSource::Error);
    assert!(!result.is_control_flow);
}

#[test]
fn test_derived_queries_follow_registration_order() {
    let classifier = classifier_with_standard_nodes();

    let providers = classifier.nodes_by_role(NodeRole::Provider);
    assert_eq!(providers, vec!["input.text".to_string(), "http.request".to_string()]);

    let control = classifier.control_flow_node_types();
    assert_eq!(control, vec!["control.router".to_string()]);

    // Deterministic for a fixed registry state.
    assert_eq!(providers, classifier.nodes_by_role(NodeRole::Provider));
}
