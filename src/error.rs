//! Error taxonomy for graph construction, evaluation and the wire codec

use crate::node::NodeId;
use std::fmt;
use thiserror::Error;

/// Which side of a node a socket lives on, for error rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Input,
    Output,
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketKind::Input => write!(f, "input"),
            SocketKind::Output => write!(f, "output"),
        }
    }
}

/// Errors that can occur while decoding an [`EncodedValue`](crate::codec::EncodedValue).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The element-type tag of a binary payload is not one we know.
    #[error("unsupported element type `{0}`")]
    UnknownDtype(String),

    /// The decompressed payload length disagrees with shape x dtype.
    #[error("payload for {dtype} value of shape {shape:?} should be {expected} bytes, got {actual}")]
    PayloadMismatch {
        dtype: String,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// The base64 armor around a binary payload is malformed.
    #[error("malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The compressed payload could not be inflated.
    #[error("malformed compressed payload: {0}")]
    Inflate(#[from] std::io::Error),

    /// The record carries an unrecognized tag or does not match any
    /// known record shape.
    #[error("malformed value record: {0}")]
    Malformed(String),
}

/// Error returned by an [`ExpressionBuilder`](crate::schema::ExpressionBuilder)
/// when expression construction fails, optionally naming the offending
/// parameter.
#[derive(Debug)]
pub struct BuildError {
    pub message: String,
    pub parameter: Option<String>,
}

impl BuildError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameter: None,
        }
    }

    /// Attributes the failure to a named parameter.
    pub fn for_parameter(message: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(parameter) => write!(f, "{} (parameter `{}`)", self.message, parameter),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BuildError {}

/// Errors raised by graph construction, evaluation and (de)serialization.
///
/// Every variant that concerns a particular node carries its id and type
/// name so failures surface with context rather than a bare message.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph holds no node with this id.
    #[error("no node with id {0}")]
    UnknownNode(NodeId),

    /// A connection or value assignment named a socket the node does not have.
    #[error("{type_name} node {node} has no {kind} socket named `{socket}`")]
    UnknownSocket {
        node: NodeId,
        type_name: String,
        socket: String,
        kind: SocketKind,
    },

    /// A connection would join a node to itself.
    #[error("cannot connect node {0} to itself")]
    SelfLoop(NodeId),

    /// Deserialization hit a type name the registry does not know.
    #[error("node type `{0}` is not registered")]
    UnregisteredType(String),

    /// Socket setup failed while constructing a node from its schema.
    #[error("failed to construct `{type_name}` node: {reason}")]
    Construction { type_name: String, reason: String },

    /// A recorded direct value could not be decoded for this socket.
    #[error("failed to decode value for socket `{socket}` of {type_name} node {node}: {source}")]
    Decode {
        node: NodeId,
        type_name: String,
        socket: String,
        #[source]
        source: DecodeError,
    },

    /// Expression construction failed under `evaluate()`.
    #[error("failed to evaluate {type_name} node {node}: {source}")]
    Evaluation {
        node: NodeId,
        type_name: String,
        #[source]
        source: BuildError,
    },

    /// A node cannot be removed while connections still reference it.
    #[error("node {0} still has connections; disconnect them first")]
    EdgesRemain(NodeId),

    /// Wire-format (de)serialization failed at the JSON layer.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
