//! End-to-end tests for graph construction, evaluation and wire round-trips
//!
//! These tests exercise the whole stack the way a node catalogue would:
//! register a couple of kinds, wire a graph, evaluate it, push it through
//! the wire format and back, and check the rebuilt graph behaves the same.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use braid::{
    from_json, to_json, BuildError, ElementType, ExpressionBuilder, Graph, GraphError, Node,
    NodeId, NodeRegistry, NodeSchema, ResolvedInputs, Roots, SocketDefinition, TensorData, Value,
};

/// Builder that counts how many times it constructed an expression.
struct CountingConst {
    hits: Arc<AtomicUsize>,
}

impl ExpressionBuilder for CountingConst {
    fn build(&self, inputs: &ResolvedInputs) -> Result<BTreeMap<String, Value>, BuildError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "out".to_string(),
            inputs.get("value").cloned().unwrap_or(Value::None),
        );
        Ok(outputs)
    }
}

fn add(inputs: &ResolvedInputs) -> Result<BTreeMap<String, Value>, BuildError> {
    let mut total = 0.0;
    for name in ["a", "b"] {
        total += inputs
            .get(name)
            .and_then(Value::as_scalar)
            .ok_or_else(|| BuildError::for_parameter("expected a scalar", name))?;
    }
    let mut outputs = BTreeMap::new();
    outputs.insert("out".to_string(), Value::Number(total));
    Ok(outputs)
}

fn const_schema() -> NodeSchema {
    NodeSchema::new("Const")
        .with_inputs(vec![SocketDefinition::required("value")])
        .with_outputs(vec!["out"])
}

fn add_schema() -> NodeSchema {
    NodeSchema::new("Add")
        .with_inputs(vec![
            SocketDefinition::required("a"),
            SocketDefinition::required("b"),
        ])
        .with_outputs(vec!["out"])
}

fn registry(hits: &Arc<AtomicUsize>) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(
        const_schema(),
        Arc::new(CountingConst {
            hits: Arc::clone(hits),
        }),
    );
    registry.register_fn(add_schema(), add);
    registry
}

fn const_node(graph: &mut Graph, registry: &NodeRegistry, value: Value) -> NodeId {
    let mut node = registry.instantiate("Const").unwrap();
    node.set_value("value", value).unwrap();
    graph.insert(node)
}

/// Const(2) -> Add.a, Const(3) -> Add.b; Add.out == 5, before and after
/// a wire round-trip.
#[test]
fn const_add_roundtrip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let two = const_node(&mut graph, &registry, Value::Number(2.0));
    let three = const_node(&mut graph, &registry, Value::Number(3.0));
    let sum = graph.insert(registry.instantiate("Add").unwrap());
    graph.connect(two, "out", sum, "a").unwrap();
    graph.connect(three, "out", sum, "b").unwrap();

    let outputs = graph.evaluate(sum).unwrap();
    assert_eq!(outputs["out"], Value::Number(5.0));

    let json = to_json(&graph, sum).unwrap();
    let (mut restored, roots) = from_json(&json, &registry).unwrap();
    let root = match roots {
        Roots::One(id) => id,
        other => panic!("expected one root, got {other:?}"),
    };
    assert_eq!(root, sum);
    assert_eq!(restored.evaluate(root).unwrap()["out"], Value::Number(5.0));
}

/// Two evaluations of an unmodified node construct the expression once.
#[test]
fn idempotent_evaluation() {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let node = const_node(&mut graph, &registry, Value::Number(7.0));

    let first = graph.evaluate(node).unwrap();
    let second = graph.evaluate(node).unwrap();
    assert_eq!(first, second);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

/// A -> {B, C} -> D: evaluating D constructs A exactly once; after
/// clean_graph all four caches are empty and re-evaluation constructs A
/// exactly once more.
#[test]
fn shared_subexpression_and_invalidation() {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let a = const_node(&mut graph, &registry, Value::Number(1.0));
    let b = graph.insert(registry.instantiate("Add").unwrap());
    let c = graph.insert(registry.instantiate("Add").unwrap());
    let d = graph.insert(registry.instantiate("Add").unwrap());
    graph.node_mut(b).unwrap().set_value("b", Value::Number(0.0)).unwrap();
    graph.node_mut(c).unwrap().set_value("b", Value::Number(0.0)).unwrap();
    graph.connect(a, "out", b, "a").unwrap();
    graph.connect(a, "out", c, "a").unwrap();
    graph.connect(b, "out", d, "a").unwrap();
    graph.connect(c, "out", d, "b").unwrap();

    let outputs = graph.evaluate(d).unwrap();
    assert_eq!(outputs["out"], Value::Number(2.0));
    assert_eq!(hits.load(Ordering::SeqCst), 1, "A constructed once");

    graph.clean_graph(d).unwrap();
    for id in [a, b, c, d] {
        assert!(
            !graph.node(id).unwrap().is_evaluated(),
            "cache should be empty after clean_graph"
        );
    }

    graph.evaluate(d).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2, "A constructed once more");
}

/// A graph mixing literal and connected sockets survives a round-trip
/// with its evaluation result intact, binary payload included.
#[test]
fn mixed_literal_and_connected_graph_roundtrip() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = registry(&hits);
    registry.register_fn(
        NodeSchema::new("TensorSource")
            .with_inputs(vec![SocketDefinition::required("tensor")])
            .with_outputs(vec!["out"]),
        |inputs: &ResolvedInputs| -> Result<BTreeMap<String, Value>, BuildError> {
            let mut outputs = BTreeMap::new();
            outputs.insert(
                "out".to_string(),
                inputs.get("tensor").cloned().unwrap_or(Value::None),
            );
            Ok(outputs)
        },
    );

    let payload: Vec<u8> = (0u8..32).collect();
    let tensor = TensorData::new(vec![4, 2], ElementType::F32, payload.clone(), "cpu").unwrap();

    let mut graph = Graph::new();
    let two = const_node(&mut graph, &registry, Value::Number(2.0));
    let sum = graph.insert(registry.instantiate("Add").unwrap());
    let source = graph.insert(registry.instantiate("TensorSource").unwrap());
    graph
        .node_mut(source)
        .unwrap()
        .set_value("tensor", Value::Tensor(tensor))
        .unwrap();
    graph.connect(two, "out", sum, "a").unwrap();
    graph.node_mut(sum).unwrap().set_value("b", Value::Number(3.0)).unwrap();

    // two disconnected sinks: Add and TensorSource
    let json_sum = to_json(&graph, sum).unwrap();
    let (mut restored, _) = from_json(&json_sum, &registry).unwrap();
    assert_eq!(restored.evaluate(sum).unwrap()["out"], Value::Number(5.0));

    let json_tensor = to_json(&graph, source).unwrap();
    let (mut restored, _) = from_json(&json_tensor, &registry).unwrap();
    match &restored.evaluate(source).unwrap()["out"] {
        Value::Tensor(out) => {
            assert_eq!(out.bytes, payload);
            assert_eq!(out.shape, vec![4, 2]);
            assert_eq!(out.dtype, ElementType::F32);
        }
        other => panic!("expected tensor, got {other:?}"),
    }
}

/// Two disconnected sinks serialize into one record set and come back as
/// exactly two roots; a single sink comes back as one root, not a list.
#[test]
fn root_recovery() {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let first = const_node(&mut graph, &registry, Value::Number(1.0));
    let second = const_node(&mut graph, &registry, Value::Number(2.0));

    let one = serde_json::from_str::<braid::WireGraph>(&to_json(&graph, first).unwrap()).unwrap();
    let mut both = serde_json::from_str::<braid::WireGraph>(&to_json(&graph, second).unwrap()).unwrap();
    both.nodes.extend(one.nodes.clone());

    let (_, roots) = braid::from_wire(&both, &registry).unwrap();
    match roots {
        Roots::Many(ids) => assert_eq!(ids.len(), 2),
        Roots::One(_) => panic!("expected two roots"),
    }

    let (_, roots) = braid::from_wire(&one, &registry).unwrap();
    assert!(matches!(roots, Roots::One(id) if id == first));
}

/// A connection naming an absent socket fails and leaves both endpoint
/// sockets untouched.
#[test]
fn connection_validation_is_atomic() {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let a = const_node(&mut graph, &registry, Value::Number(1.0));
    let b = graph.insert(registry.instantiate("Add").unwrap());

    assert!(matches!(
        graph.connect(a, "missing", b, "a"),
        Err(GraphError::UnknownSocket { .. })
    ));
    assert_eq!(graph.node(a).unwrap().request_count(), 0);
    assert!(graph
        .node(b)
        .unwrap()
        .inputs()
        .all(|(_, socket)| !socket.is_connected()));
}

/// The inspect dump walks shared nodes once and shows socket state.
#[test]
fn inspect_dumps_the_upstream_subgraph() {
    let hits = Arc::new(AtomicUsize::new(0));
    let registry = registry(&hits);

    let mut graph = Graph::new();
    let shared = const_node(&mut graph, &registry, Value::Number(4.0));
    let sum = graph.insert(registry.instantiate("Add").unwrap());
    graph.connect(shared, "out", sum, "a").unwrap();
    graph.connect(shared, "out", sum, "b").unwrap();

    let dump = graph.inspect(sum).unwrap();
    assert!(dump.contains("(Add)"));
    assert!(dump.contains("(Const)"));
    // the shared node is printed exactly once
    assert_eq!(dump.matches("(Const)").count(), 1);
    assert!(dump.contains("input [value] = 4"));
}

/// Sockets fed by defaults evaluate without explicit wiring.
#[test]
fn schema_defaults_feed_evaluation() {
    let mut registry = NodeRegistry::new();
    registry.register_fn(
        NodeSchema::new("Add")
            .with_inputs(vec![
                SocketDefinition::required("a").with_default(Value::Number(10.0)),
                SocketDefinition::required("b").with_default(Value::Number(20.0)),
            ])
            .with_outputs(vec!["out"]),
        add,
    );

    let mut graph = Graph::new();
    let node = graph.insert(registry.instantiate("Add").unwrap());
    assert_eq!(graph.evaluate(node).unwrap()["out"], Value::Number(30.0));
}

/// Nodes can also be built directly from a schema, without a registry.
#[test]
fn direct_node_construction() {
    let node = Node::from_schema(&const_schema(), Arc::new(add), None).unwrap();
    assert_eq!(node.type_name(), "Const");
    assert!(node.cached_outputs().is_empty());
}
