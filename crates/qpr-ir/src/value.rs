//! Runtime values carried by wire tokens.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a slot in the resource pool.
///
/// The generation counter distinguishes successive occupants of the same
/// slot, so a handle kept after its resource was freed is detectably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Slot index in the pool.
    pub slot: u32,
    /// Occupancy generation of the slot.
    pub generation: u32,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}#{}", self.slot, self.generation)
    }
}

/// A token value.
///
/// Classical values are indices into their type's finite value set. Quantum
/// values and references are handles into the resource pool; the wire type
/// says which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A classical value.
    Word(u64),
    /// A pooled resource.
    Handle(ResourceRef),
}

impl Value {
    /// The only value of `unit`.
    pub const UNIT: Value = Value::Word(0);

    /// Get the classical value, if this is one.
    #[inline]
    pub fn as_word(&self) -> Option<u64> {
        match self {
            Value::Word(w) => Some(*w),
            Value::Handle(_) => None,
        }
    }

    /// Get the resource handle, if this is one.
    #[inline]
    pub fn as_handle(&self) -> Option<ResourceRef> {
        match self {
            Value::Handle(r) => Some(*r),
            Value::Word(_) => None,
        }
    }
}

impl From<u64> for Value {
    fn from(w: u64) -> Self {
        Value::Word(w)
    }
}

impl From<ResourceRef> for Value {
    fn from(r: ResourceRef) -> Self {
        Value::Handle(r)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Word(w) => write!(f, "{w}"),
            Value::Handle(r) => write!(f, "{r}"),
        }
    }
}

/// A semantic function rejected its operands (division by zero, overflow,
/// a value outside its type, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OperandError(pub String);

impl OperandError {
    /// Create a new operand error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Values keyed by port name: the inputs or outputs of one firing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortValues(BTreeMap<String, Value>);

impl PortValues {
    /// Create an empty set of port values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(port.into(), value.into());
        self
    }

    /// Insert a value.
    pub fn insert(&mut self, port: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(port.into(), value.into());
    }

    /// Get a value by port.
    pub fn get(&self, port: &str) -> Option<Value> {
        self.0.get(port).copied()
    }

    /// Get a classical value, failing if the port is missing or holds a handle.
    pub fn word(&self, port: &str) -> Result<u64, OperandError> {
        self.get(port)
            .and_then(|v| v.as_word())
            .ok_or_else(|| OperandError(format!("port '{port}' does not hold a classical value")))
    }

    /// Get a resource handle, failing if the port is missing or classical.
    pub fn handle(&self, port: &str) -> Result<ResourceRef, OperandError> {
        self.get(port)
            .and_then(|v| v.as_handle())
            .ok_or_else(|| OperandError(format!("port '{port}' does not hold a handle")))
    }

    /// Iterate `(port, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.0.iter().map(|(p, v)| (p.as_str(), *v))
    }

    /// Number of ports with values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl<P: Into<String>> FromIterator<(P, Value)> for PortValues {
    fn from_iter<I: IntoIterator<Item = (P, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(p, v)| (p.into(), v)).collect())
    }
}
