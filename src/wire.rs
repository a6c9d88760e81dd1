//! Flat wire format: node and edge records, traversal, reconstruction
//!
//! A graph serializes as a flat list of node records plus a flat list of
//! connection records; topology (including the root set) is reconstructed
//! purely from those lists. Only sockets holding a direct value appear in
//! a node's `data` map — connected sockets are implied by the edge list.

use crate::codec;
use crate::connection::Connection;
use crate::error::GraphError;
use crate::graph::{Graph, Roots};
use crate::node::NodeId;
use crate::registry::NodeRegistry;
use crate::socket::SocketState;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One serialized node: id, type name, and encoded direct values keyed
/// by input-socket name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub data: BTreeMap<String, serde_json::Value>,
}

/// The whole serialized graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireGraph {
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<Connection>,
}

/// Serializes the subgraph reachable upstream from `root`.
///
/// Depth-first from the root, following each input socket's connections
/// to source nodes; a visited-id set emits every node exactly once even
/// when shared sub-expressions reach it along several paths.
pub fn to_wire(graph: &Graph, root: NodeId) -> Result<WireGraph, GraphError> {
    let mut wire = WireGraph {
        nodes: Vec::new(),
        connections: Vec::new(),
    };
    let mut visited = HashSet::new();
    visit(graph, root, &mut visited, &mut wire)?;
    Ok(wire)
}

fn visit(
    graph: &Graph,
    id: NodeId,
    visited: &mut HashSet<NodeId>,
    wire: &mut WireGraph,
) -> Result<(), GraphError> {
    if !visited.insert(id) {
        return Ok(());
    }
    let node = graph.node(id).ok_or(GraphError::UnknownNode(id))?;

    let mut data = BTreeMap::new();
    for (name, socket) in node.inputs() {
        if let Some(value) = socket.value() {
            data.insert(name.to_string(), serde_json::to_value(codec::encode(value))?);
        }
    }
    wire.nodes.push(NodeRecord {
        id,
        name: node.type_name().to_string(),
        data,
    });

    for (_, socket) in node.outputs() {
        wire.connections.extend(socket.connections().iter().cloned());
    }

    for (_, socket) in node.inputs() {
        if let SocketState::Connected(connections) = socket.state() {
            for connection in connections {
                visit(graph, connection.source, visited, wire)?;
            }
        }
    }
    Ok(())
}

/// Reconstructs a graph from flat records.
///
/// Nodes are built through the registry; an unregistered type name, an
/// undecodable value, or a value naming an unknown socket aborts the
/// whole load (later edges depend on nodes existing). Edges referencing
/// an unknown id or socket are skipped and logged instead — one bad edge
/// should not lose a large graph.
pub fn from_wire(wire: &WireGraph, registry: &NodeRegistry) -> Result<(Graph, Roots), GraphError> {
    let mut graph = Graph::new();
    for record in &wire.nodes {
        let mut node = registry.instantiate_with_id(&record.name, record.id)?;
        for (socket, raw) in &record.data {
            let value = codec::decode_record(raw).map_err(|source| GraphError::Decode {
                node: record.id,
                type_name: record.name.clone(),
                socket: socket.clone(),
                source,
            })?;
            node.set_value(socket, value)?;
        }
        graph.insert(node);
    }

    for connection in &wire.connections {
        if let Err(err) = graph.connect(
            connection.source,
            &connection.source_output,
            connection.target,
            &connection.target_input,
        ) {
            warn!("skipping connection {connection}: {err}");
        }
    }

    let roots = Roots::from_ids(graph.roots());
    Ok((graph, roots))
}

/// Serializes the subgraph under `root` to a JSON string.
pub fn to_json(graph: &Graph, root: NodeId) -> Result<String, GraphError> {
    Ok(serde_json::to_string_pretty(&to_wire(graph, root)?)?)
}

/// Reconstructs a graph from a JSON string.
pub fn from_json(json: &str, registry: &NodeRegistry) -> Result<(Graph, Roots), GraphError> {
    let wire: WireGraph = serde_json::from_str(json)?;
    from_wire(&wire, registry)
}
