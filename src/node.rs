//! Node: typed sockets around a memoized expression-construction step

use crate::error::{GraphError, SocketKind};
use crate::schema::{ExpressionBuilder, NodeSchema, ResolvedInputs};
use crate::socket::{InputSocket, OutputSocket};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier of a node. Assigned once at construction and
/// immutable afterwards; serialized as a string on the wire.
pub type NodeId = Uuid;

/// A graph unit: input/output sockets, a transient resolved-inputs table,
/// a cached-outputs table and the builder that produces those outputs.
///
/// State machine: `Unevaluated ⇄ Evaluated`. The cache is non-empty
/// exactly when the node has been evaluated since its last invalidation.
pub struct Node {
    id: NodeId,
    type_name: String,
    inputs: IndexMap<String, InputSocket>,
    outputs: IndexMap<String, OutputSocket>,
    /// Collector socket name, if the schema declares one.
    variadic: Option<String>,
    /// Transient table filled while resolving inputs for evaluation.
    resolved: IndexMap<String, Value>,
    /// Cached named outputs of the last evaluation.
    cache: BTreeMap<String, Value>,
    clean: bool,
    builder: Arc<dyn ExpressionBuilder>,
}

impl Node {
    /// Builds a node from its schema, applying socket defaults.
    ///
    /// `id` is `None` for fresh nodes (a v4 id is generated) and
    /// `Some(recorded)` when reconstructing a serialized graph.
    pub fn from_schema(
        schema: &NodeSchema,
        builder: Arc<dyn ExpressionBuilder>,
        id: Option<NodeId>,
    ) -> Result<Self, GraphError> {
        let mut inputs = IndexMap::new();
        let mut variadic = None;
        for definition in &schema.inputs {
            if definition.variadic {
                if variadic.is_some() {
                    return Err(GraphError::Construction {
                        type_name: schema.type_name.clone(),
                        reason: "more than one collector input declared".to_string(),
                    });
                }
                variadic = Some(definition.name.clone());
            }
            let socket = match &definition.default {
                Some(default) => InputSocket::with_value(&definition.name, default.clone()),
                None => InputSocket::new(&definition.name),
            };
            if inputs.insert(definition.name.clone(), socket).is_some() {
                return Err(GraphError::Construction {
                    type_name: schema.type_name.clone(),
                    reason: format!("duplicate input socket `{}`", definition.name),
                });
            }
        }

        let mut outputs = IndexMap::new();
        for name in &schema.outputs {
            if outputs
                .insert(name.clone(), OutputSocket::new(name))
                .is_some()
            {
                return Err(GraphError::Construction {
                    type_name: schema.type_name.clone(),
                    reason: format!("duplicate output socket `{name}`"),
                });
            }
        }

        Ok(Self {
            id: id.unwrap_or_else(Uuid::new_v4),
            type_name: schema.type_name.clone(),
            inputs,
            outputs,
            variadic,
            resolved: IndexMap::new(),
            cache: BTreeMap::new(),
            clean: true,
            builder,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.get(name)
    }

    /// Input sockets in schema order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &InputSocket)> {
        self.inputs.iter().map(|(name, socket)| (name.as_str(), socket))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &OutputSocket)> {
        self.outputs.iter().map(|(name, socket)| (name.as_str(), socket))
    }

    /// Sets a direct value on a named input socket.
    pub fn set_value(&mut self, socket: &str, value: Value) -> Result<(), GraphError> {
        match self.inputs.get_mut(socket) {
            Some(input) => {
                input.set_value(value);
                Ok(())
            }
            None => Err(self.unknown_socket(socket, SocketKind::Input)),
        }
    }

    /// Cached named outputs; empty unless the node is evaluated.
    pub fn cached_outputs(&self) -> &BTreeMap<String, Value> {
        &self.cache
    }

    pub fn is_evaluated(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Total outbound connection count over all output sockets. A node
    /// with zero is a root, the only valid serialization entry point.
    pub fn request_count(&self) -> usize {
        self.outputs
            .values()
            .map(OutputSocket::request_count)
            .sum()
    }

    pub(crate) fn unknown_socket(&self, socket: &str, kind: SocketKind) -> GraphError {
        GraphError::UnknownSocket {
            node: self.id,
            type_name: self.type_name.clone(),
            socket: socket.to_string(),
            kind,
        }
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut InputSocket> {
        self.inputs.get_mut(name)
    }

    pub(crate) fn output_mut(&mut self, name: &str) -> Option<&mut OutputSocket> {
        self.outputs.get_mut(name)
    }

    pub(crate) fn builder(&self) -> Arc<dyn ExpressionBuilder> {
        Arc::clone(&self.builder)
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.clean
    }

    /// Marks the node as carrying evaluation state that a later
    /// `clean_graph` walk must clear.
    pub(crate) fn touch(&mut self) {
        self.clean = false;
    }

    pub(crate) fn store_resolved(&mut self, resolved: IndexMap<String, Value>) {
        self.resolved = resolved;
    }

    pub(crate) fn store_cache(&mut self, outputs: BTreeMap<String, Value>) {
        self.cache = outputs;
    }

    /// Clears the cache and resolved table; the node is clean again.
    pub(crate) fn invalidate(&mut self) {
        self.cache.clear();
        self.resolved.clear();
        self.clean = true;
    }

    /// Packages the resolved table for the builder, assembling the
    /// ordered argument list under the contiguous-prefix policy:
    /// iteration over schema-ordered sockets stops at the first one with
    /// no resolved value (or an explicit `none`), and a collector's
    /// flattened fan-in is truncated at its first missing element.
    pub(crate) fn resolved_inputs(&self) -> ResolvedInputs {
        let mut args = Vec::new();
        'sockets: for name in self.inputs.keys() {
            let Some(value) = self.resolved.get(name) else {
                break;
            };
            if value.is_none() {
                break;
            }
            if self.variadic.as_deref() == Some(name.as_str()) {
                let items: &[Value] = match value {
                    Value::Tuple(items) => items,
                    other => std::slice::from_ref(other),
                };
                for item in items {
                    if item.is_none() {
                        continue 'sockets;
                    }
                    args.push(item.clone());
                }
            } else {
                args.push(value.clone());
            }
        }
        ResolvedInputs::new(self.resolved.clone(), args)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}
