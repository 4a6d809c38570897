use crate::cluster::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Unique name of a deployed service.
pub type ServiceName = String;

/// Number of live instances of one service per node.
///
/// Iteration order is the node id order; the weighted pick walks entries in this order.
pub type TopologySnapshot = BTreeMap<NodeId, usize>;

/// A deployed service as reported by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: ServiceName,
    pub topology: TopologySnapshot,
}

impl ServiceDescriptor {
    pub fn total_instances(&self) -> usize {
        self.topology.values().sum()
    }
}

/// Shape of a single call argument.
///
/// Arguments travel as JSON, so a method signature is the list of JSON kinds it
/// accepts. `Any` only appears in registered signatures and matches every kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Any,
}

impl ArgKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ArgKind::Null,
            Value::Bool(_) => ArgKind::Bool,
            Value::Number(_) => ArgKind::Number,
            Value::String(_) => ArgKind::String,
            Value::Array(_) => ArgKind::Array,
            Value::Object(_) => ArgKind::Object,
        }
    }

    /// Whether a registered parameter of this kind accepts an argument of `actual` kind.
    pub fn accepts(self, actual: ArgKind) -> bool {
        self == ArgKind::Any || self == actual
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Null => "null",
            ArgKind::Bool => "bool",
            ArgKind::Number => "number",
            ArgKind::String => "string",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
            ArgKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Dispatch key of a service method: its name plus the kinds of its arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub name: String,
    pub arg_kinds: Vec<ArgKind>,
}

impl MethodKey {
    pub fn new(name: &str, arg_kinds: &[ArgKind]) -> Self {
        Self {
            name: name.to_string(),
            arg_kinds: arg_kinds.to_vec(),
        }
    }

    /// Builds the key a call with `args` has to be dispatched under.
    pub fn for_call(name: &str, args: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            arg_kinds: args.iter().map(ArgKind::of).collect(),
        }
    }

    /// `true` if this (registered) signature can serve `call`.
    pub fn matches(&self, call: &MethodKey) -> bool {
        self.name == call.name
            && self.arg_kinds.len() == call.arg_kinds.len()
            && self
                .arg_kinds
                .iter()
                .zip(&call.arg_kinds)
                .all(|(registered, actual)| registered.accepts(*actual))
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, kind) in self.arg_kinds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", kind)?;
        }
        f.write_str(")")
    }
}
