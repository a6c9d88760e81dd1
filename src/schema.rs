//! Node schemas and the expression-builder seam
//!
//! A schema describes a node kind's sockets; the builder is the external
//! step that turns resolved inputs into named outputs. The core never
//! defines which kinds exist — catalogues register schemas and builders
//! explicitly at startup.

use crate::error::BuildError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Declares one input socket of a node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketDefinition {
    pub name: String,
    pub default: Option<Value>,
    /// Marks the node's collector socket: its resolved fan-in is
    /// flattened into the ordered argument list.
    pub variadic: bool,
}

impl SocketDefinition {
    /// A plain input with no default.
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            variadic: false,
        }
    }

    /// A collector input accepting fan-in.
    pub fn variadic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            variadic: true,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Socket layout of a node kind: ordered inputs and named outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSchema {
    pub type_name: String,
    pub inputs: Vec<SocketDefinition>,
    pub outputs: Vec<String>,
}

impl NodeSchema {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<SocketDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<&str>) -> Self {
        self.outputs = outputs.into_iter().map(str::to_string).collect();
        self
    }

    /// Name of the collector socket, if the schema declares one.
    pub fn variadic_input(&self) -> Option<&str> {
        self.inputs
            .iter()
            .find(|input| input.variadic)
            .map(|input| input.name.as_str())
    }
}

/// Inputs handed to an expression builder: the resolved named table plus
/// the ordered argument list after the contiguous-prefix policy.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    named: IndexMap<String, Value>,
    args: Vec<Value>,
}

impl ResolvedInputs {
    pub fn new(named: IndexMap<String, Value>, args: Vec<Value>) -> Self {
        Self { named, args }
    }

    /// Resolved value of a named socket, if it resolved at all.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Ordered, prefix-trimmed positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }
}

/// External expression-construction step invoked during evaluation.
///
/// Must be pure from the graph's point of view: same resolved inputs,
/// same named outputs, no visible side effects.
pub trait ExpressionBuilder: Send + Sync {
    fn build(&self, inputs: &ResolvedInputs) -> Result<BTreeMap<String, Value>, BuildError>;
}

impl<F> ExpressionBuilder for F
where
    F: Fn(&ResolvedInputs) -> Result<BTreeMap<String, Value>, BuildError> + Send + Sync,
{
    fn build(&self, inputs: &ResolvedInputs) -> Result<BTreeMap<String, Value>, BuildError> {
        self(inputs)
    }
}
