//! Name-keyed registry of node kinds
//!
//! Populated by explicit registration at startup; consumed only during
//! deserialization. The core itself never defines which kinds exist.

use crate::error::GraphError;
use crate::node::{Node, NodeId};
use crate::schema::{ExpressionBuilder, NodeSchema};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered node kind: its socket schema and the builder every
/// instance evaluates with.
#[derive(Clone)]
pub struct NodeDefinition {
    pub schema: NodeSchema,
    pub builder: Arc<dyn ExpressionBuilder>,
}

/// Registry mapping type names to node definitions.
#[derive(Default)]
pub struct NodeRegistry {
    definitions: BTreeMap<String, NodeDefinition>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }

    /// Registers a node kind under its schema's type name.
    pub fn register(&mut self, schema: NodeSchema, builder: Arc<dyn ExpressionBuilder>) {
        let type_name = schema.type_name.clone();
        debug!("registering node type `{type_name}`");
        if self
            .definitions
            .insert(type_name.clone(), NodeDefinition { schema, builder })
            .is_some()
        {
            warn!("node type `{type_name}` registered twice; keeping the newer definition");
        }
    }

    /// Convenience for closure builders.
    pub fn register_fn<F>(&mut self, schema: NodeSchema, builder: F)
    where
        F: ExpressionBuilder + 'static,
    {
        self.register(schema, Arc::new(builder));
    }

    pub fn lookup(&self, type_name: &str) -> Option<&NodeDefinition> {
        self.definitions.get(type_name)
    }

    /// Instantiates a fresh node of the named kind.
    pub fn instantiate(&self, type_name: &str) -> Result<Node, GraphError> {
        self.instantiate_inner(type_name, None)
    }

    /// Instantiates a node carrying a recorded id, for deserialization.
    pub fn instantiate_with_id(&self, type_name: &str, id: NodeId) -> Result<Node, GraphError> {
        self.instantiate_inner(type_name, Some(id))
    }

    fn instantiate_inner(&self, type_name: &str, id: Option<NodeId>) -> Result<Node, GraphError> {
        let definition = self
            .lookup(type_name)
            .ok_or_else(|| GraphError::UnregisteredType(type_name.to_string()))?;
        Node::from_schema(&definition.schema, Arc::clone(&definition.builder), id)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
