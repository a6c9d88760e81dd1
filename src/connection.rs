//! Directed edges between output and input sockets

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated directed edge from an output socket to an input socket.
///
/// Connections are plain records: the [`Graph`](crate::graph::Graph)
/// validates them at construction and registers each one in both
/// endpoint sockets so the topology can be walked in either direction.
/// Field names follow the wire format, so the same record serializes
/// straight into the `connections` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    #[serde(rename = "sourceOutput")]
    pub source_output: String,
    pub target: NodeId,
    #[serde(rename = "targetInput")]
    pub target_input: String,
}

impl Connection {
    pub fn new(
        source: NodeId,
        source_output: impl Into<String>,
        target: NodeId,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_output: source_output.into(),
            target,
            target_input: target_input.into(),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source, self.source_output, self.target, self.target_input
        )
    }
}
