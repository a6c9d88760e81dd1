//! Typed socket endpoints on a node
//!
//! An input socket is fed by a direct value or by upstream connections,
//! never both. The state is a tagged union so the invariant is
//! unrepresentable rather than merely checked.

use crate::connection::Connection;
use crate::value::Value;

/// Exclusive state of an input socket.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SocketState {
    /// Nothing feeds this socket.
    #[default]
    Unset,
    /// A direct literal value.
    Value(Value),
    /// One or more upstream connections, in attachment order.
    Connected(Vec<Connection>),
}

/// Named input endpoint on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSocket {
    name: String,
    state: SocketState,
}

impl InputSocket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: SocketState::Unset,
        }
    }

    pub fn with_value(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            state: SocketState::Value(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &SocketState {
        &self.state
    }

    /// Replaces whatever feeds this socket with a direct value.
    /// Any existing connections are dropped.
    pub fn set_value(&mut self, value: Value) {
        self.state = SocketState::Value(value);
    }

    /// Returns the socket to the unset state.
    pub fn clear(&mut self) {
        self.state = SocketState::Unset;
    }

    /// Appends a connection. Connections dominate: a direct value is
    /// discarded the moment the first edge attaches.
    pub fn attach(&mut self, connection: Connection) {
        match &mut self.state {
            SocketState::Connected(connections) => connections.push(connection),
            _ => self.state = SocketState::Connected(vec![connection]),
        }
    }

    /// Removes one matching connection. The socket returns to `Unset`
    /// when the last edge detaches. Returns whether an edge was removed.
    pub fn detach(&mut self, connection: &Connection) -> bool {
        let SocketState::Connected(connections) = &mut self.state else {
            return false;
        };
        let Some(index) = connections.iter().position(|c| c == connection) else {
            return false;
        };
        connections.remove(index);
        if connections.is_empty() {
            self.state = SocketState::Unset;
        }
        true
    }

    pub fn connections(&self) -> &[Connection] {
        match &self.state {
            SocketState::Connected(connections) => connections,
            _ => &[],
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.state {
            SocketState::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, SocketState::Connected(_))
    }
}

/// Named output endpoint on a node, holding its fan-out edges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputSocket {
    name: String,
    connections: Vec<Connection>,
}

impl OutputSocket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attach(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn detach(&mut self, connection: &Connection) -> bool {
        let Some(index) = self.connections.iter().position(|c| c == connection) else {
            return false;
        };
        self.connections.remove(index);
        true
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of downstream readers of this output.
    pub fn request_count(&self) -> usize {
        self.connections.len()
    }
}
