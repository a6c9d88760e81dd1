//! Braid - a typed node/socket DAG engine
//!
//! This library provides the core data model for wiring computation nodes
//! together through typed sockets, a lazy memoized evaluation protocol,
//! cycle-safe traversal, and a text-safe wire format for persisting and
//! reconstructing graphs. The catalogue of node kinds lives outside the
//! core: callers register schemas and expression builders explicitly and
//! hand the registry to deserialization.

pub mod codec;
pub mod connection;
pub mod error;
pub mod graph;
pub mod node;
pub mod registry;
pub mod schema;
pub mod socket;
pub mod value;
pub mod wire;

pub use codec::{decode, decode_record, encode, EncodedValue, TupleItem};
pub use connection::Connection;
pub use error::{BuildError, DecodeError, GraphError, SocketKind};
pub use graph::{Graph, Roots};
pub use node::{Node, NodeId};
pub use registry::{NodeDefinition, NodeRegistry};
pub use schema::{ExpressionBuilder, NodeSchema, ResolvedInputs, SocketDefinition};
pub use socket::{InputSocket, OutputSocket, SocketState};
pub use value::{ArrayData, ElementType, TensorData, Value};
pub use wire::{from_json, from_wire, to_json, to_wire, NodeRecord, WireGraph};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn basic_graph_operations() {
        let schema = NodeSchema::new("Passthrough")
            .with_inputs(vec![SocketDefinition::required("in")])
            .with_outputs(vec!["out"]);
        let builder: Arc<dyn ExpressionBuilder> = Arc::new(
            |inputs: &ResolvedInputs| -> Result<BTreeMap<String, Value>, BuildError> {
                let mut outputs = BTreeMap::new();
                outputs.insert(
                    "out".to_string(),
                    inputs.get("in").cloned().unwrap_or(Value::None),
                );
                Ok(outputs)
            },
        );

        let mut graph = Graph::new();
        let a = graph.insert(Node::from_schema(&schema, Arc::clone(&builder), None).unwrap());
        let b = graph.insert(Node::from_schema(&schema, builder, None).unwrap());

        let edge = graph.connect(a, "out", b, "in").unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.roots(), vec![b]);

        graph.disconnect(&edge).unwrap();
        assert!(graph.remove(a).is_ok());
        assert_eq!(graph.len(), 1);
    }
}
