//! Graph arena: node ownership, wiring, memoized evaluation, invalidation
//!
//! The arena owns every node; topology is whatever the connection records
//! inside the sockets say. There is no separate edge list — serialization
//! and evaluation both walk input-socket connections backward from a node.

use crate::connection::Connection;
use crate::error::{GraphError, SocketKind};
use crate::node::{Node, NodeId};
use crate::socket::SocketState;
use crate::value::Value;
use indexmap::IndexMap;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Root set recovered from a deserialized graph: the single sink when
/// there is exactly one, otherwise the whole list (a serialized graph may
/// contain multiple disconnected sinks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Roots {
    One(NodeId),
    Many(Vec<NodeId>),
}

impl Roots {
    pub fn from_ids(mut ids: Vec<NodeId>) -> Self {
        if ids.len() == 1 {
            Roots::One(ids.remove(0))
        } else {
            Roots::Many(ids)
        }
    }

    /// All root ids regardless of arity.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            Roots::One(id) => vec![*id],
            Roots::Many(ids) => ids.clone(),
        }
    }
}

/// Arena of nodes addressed by id.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Takes ownership of a node and returns its id.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        if self.nodes.insert(id, node).is_some() {
            log::warn!("node id {id} inserted twice; replaced the earlier node");
        }
        id
    }

    /// Removes a node. Fails while any connection still references it;
    /// disconnect edges first so no socket is left with a dangling entry.
    pub fn remove(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        let has_edges = node.request_count() > 0
            || node.inputs().any(|(_, socket)| socket.is_connected());
        if has_edges {
            return Err(GraphError::EdgesRemain(id));
        }
        self.nodes
            .remove(&id)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Wires `source:output -> target:input`.
    ///
    /// Both named sockets are validated before anything is registered, so
    /// a failed connect leaves both endpoints untouched. On success the
    /// edge is registered in both sockets' lists.
    pub fn connect(
        &mut self,
        source: NodeId,
        output: &str,
        target: NodeId,
        input: &str,
    ) -> Result<Connection, GraphError> {
        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        let source_node = self.nodes.get(&source).ok_or(GraphError::UnknownNode(source))?;
        if source_node.output(output).is_none() {
            return Err(source_node.unknown_socket(output, SocketKind::Output));
        }
        let target_node = self.nodes.get(&target).ok_or(GraphError::UnknownNode(target))?;
        if target_node.input(input).is_none() {
            return Err(target_node.unknown_socket(input, SocketKind::Input));
        }

        let connection = Connection::new(source, output, target, input);
        if let Some(node) = self.nodes.get_mut(&source) {
            if let Some(socket) = node.output_mut(output) {
                socket.attach(connection.clone());
            }
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            if let Some(socket) = node.input_mut(input) {
                socket.attach(connection.clone());
            }
        }
        Ok(connection)
    }

    /// Removes an edge from both endpoint sockets. Callers must
    /// disconnect before dropping nodes; nothing reference-counts edges.
    pub fn disconnect(&mut self, connection: &Connection) -> Result<(), GraphError> {
        let source = self
            .nodes
            .get_mut(&connection.source)
            .ok_or(GraphError::UnknownNode(connection.source))?;
        match source.output_mut(&connection.source_output) {
            Some(socket) => {
                if !socket.detach(connection) {
                    debug!("disconnect: edge {connection} was not registered at its source");
                }
            }
            None => {
                return Err(
                    source.unknown_socket(&connection.source_output, SocketKind::Output)
                )
            }
        }

        let target = self
            .nodes
            .get_mut(&connection.target)
            .ok_or(GraphError::UnknownNode(connection.target))?;
        match target.input_mut(&connection.target_input) {
            Some(socket) => {
                if !socket.detach(connection) {
                    debug!("disconnect: edge {connection} was not registered at its target");
                }
            }
            None => {
                return Err(target.unknown_socket(&connection.target_input, SocketKind::Input))
            }
        }
        Ok(())
    }

    /// Evaluates a node, memoized: an already-evaluated node returns its
    /// cache untouched, so each node's builder runs at most once per
    /// dirty period no matter how many paths reach it.
    ///
    /// Resolution per input socket: a direct value passes through; a
    /// single connection yields the source's named output; fan-in yields
    /// an ordered tuple, with `none` holding the place of any upstream
    /// output that did not materialize.
    pub fn evaluate(&mut self, id: NodeId) -> Result<BTreeMap<String, Value>, GraphError> {
        let plan: Vec<(String, SocketState)> = {
            let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
            node.touch();
            if node.is_evaluated() {
                return Ok(node.cached_outputs().clone());
            }
            node.inputs()
                .map(|(name, socket)| (name.to_string(), socket.state().clone()))
                .collect()
        };

        let mut resolved: IndexMap<String, Value> = IndexMap::new();
        for (name, state) in plan {
            match state {
                SocketState::Unset => {}
                SocketState::Value(value) => {
                    resolved.insert(name, value);
                }
                SocketState::Connected(connections) => {
                    let mut collected = Vec::with_capacity(connections.len());
                    for connection in &connections {
                        let outputs = self.evaluate(connection.source)?;
                        collected.push(outputs.get(&connection.source_output).cloned());
                    }
                    if collected.len() == 1 {
                        // a missing single upstream output leaves the slot unset
                        if let Some(value) = collected.pop().flatten() {
                            resolved.insert(name, value);
                        }
                    } else {
                        let items = collected
                            .into_iter()
                            .map(|value| value.unwrap_or(Value::None))
                            .collect();
                        resolved.insert(name, Value::Tuple(items));
                    }
                }
            }
        }

        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.store_resolved(resolved);
        let inputs = node.resolved_inputs();
        let builder = node.builder();
        let outputs = builder
            .build(&inputs)
            .map_err(|source| GraphError::Evaluation {
                node: id,
                type_name: node.type_name().to_string(),
                source,
            })?;
        debug!(
            "evaluated {} node {id} ({} outputs)",
            node.type_name(),
            outputs.len()
        );
        node.store_cache(outputs.clone());
        Ok(outputs)
    }

    /// Clears this node's cache and every cache in its upstream subgraph.
    ///
    /// Already-clean nodes are not revisited, so the walk is linear in
    /// the subgraph size even under heavy sharing.
    pub fn clean_graph(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        if node.is_clean() {
            return Ok(());
        }
        node.invalidate();

        let upstream: Vec<NodeId> = {
            let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
            node.inputs()
                .flat_map(|(_, socket)| socket.connections().iter().map(|c| c.source))
                .collect()
        };
        for source in upstream {
            if self.nodes.contains_key(&source) {
                self.clean_graph(source)?;
            }
        }
        Ok(())
    }

    /// Ids of nodes with zero outbound connections across all output
    /// sockets, sorted for determinism.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.request_count() == 0)
            .map(Node::id)
            .collect();
        roots.sort();
        roots
    }

    /// Human-readable dump of a node and its upstream subgraph: ids,
    /// types, and per-socket connection/value state. Shared nodes are
    /// printed once.
    pub fn inspect(&self, id: NodeId) -> Result<String, GraphError> {
        let mut out = String::new();
        let mut visited = HashSet::new();
        self.inspect_into(id, 0, &mut visited, &mut out)?;
        Ok(out)
    }

    fn inspect_into(
        &self,
        id: NodeId,
        indent: usize,
        visited: &mut HashSet<NodeId>,
        out: &mut String,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
        if !visited.insert(id) {
            return Ok(());
        }
        let pad = "  ".repeat(indent);
        out.push_str(&format!("{pad}Node {} ({})\n", id, node.type_name()));
        for (name, socket) in node.inputs() {
            match socket.state() {
                SocketState::Connected(connections) => {
                    for connection in connections {
                        out.push_str(&format!(
                            "{pad}  input [{name}] <- node {}:{}\n",
                            connection.source, connection.source_output
                        ));
                        self.inspect_into(connection.source, indent + 2, visited, out)?;
                    }
                }
                SocketState::Value(value) => {
                    out.push_str(&format!("{pad}  input [{name}] = {value}\n"));
                }
                SocketState::Unset => {
                    out.push_str(&format!("{pad}  input [{name}] unconnected\n"));
                }
            }
        }
        Ok(())
    }
}
