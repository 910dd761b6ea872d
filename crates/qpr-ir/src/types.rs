//! Classical, quantum and reference types, and port signatures.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::value::OperandError;

/// Name of the distinguished single-valued ordering type.
pub const UNIT: &str = "unit";

/// Name of the built-in two-valued classical type.
pub const BIT: &str = "bit";

/// Name of the built-in two-dimensional quantum type.
pub const QUBIT: &str = "qubit";

/// How a classical value is rendered when written to the output tape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputEncoding {
    /// ASCII decimal digits of the value.
    Decimal,
    /// One byte string per value, indexed by the value.
    Table(Vec<Vec<u8>>),
}

impl OutputEncoding {
    /// Render a value, or `None` if the table has no entry for it.
    pub fn encode(&self, value: u64) -> Option<Vec<u8>> {
        match self {
            OutputEncoding::Decimal => Some(value.to_string().into_bytes()),
            OutputEncoding::Table(entries) => usize::try_from(value)
                .ok()
                .and_then(|idx| entries.get(idx))
                .cloned(),
        }
    }
}

/// A classical type with a finite value set `0..cardinality`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalType {
    /// Number of distinct values.
    pub cardinality: u128,
    /// Value used when a resource of this type is allocated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<u64>,
    /// Byte rendering used by encoded write nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<OutputEncoding>,
}

impl ClassicalType {
    /// Check whether a value belongs to this type's value set.
    #[inline]
    pub fn contains(&self, value: u64) -> bool {
        u128::from(value) < self.cardinality
    }
}

/// A quantum type with a finite basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumType {
    /// Dimension of the basis (2 for a qubit).
    pub dimension: usize,
    /// State used on allocation; `|0⟩` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_state: Option<Vec<Complex64>>,
}

impl QuantumType {
    /// The state a fresh resource of this type starts in.
    pub fn initial_state(&self) -> Vec<Complex64> {
        if let Some(state) = &self.default_state {
            return state.clone();
        }
        let mut state = vec![Complex64::new(0.0, 0.0); self.dimension];
        if let Some(zero) = state.first_mut() {
            *zero = Complex64::new(1.0, 0.0);
        }
        state
    }
}

/// Check that `amps` is a normalized state of the given dimension.
pub fn validate_state(amps: &[Complex64], dimension: usize) -> Result<(), OperandError> {
    if amps.len() != dimension {
        return Err(OperandError(format!(
            "state has {} amplitudes, expected {dimension}",
            amps.len()
        )));
    }
    let norm: f64 = amps.iter().map(Complex64::norm_sqr).sum();
    if (norm - 1.0).abs() > 1e-6 {
        return Err(OperandError(format!("state has norm {norm:.6}, expected 1")));
    }
    Ok(())
}

/// The structure behind a type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Finite classical data.
    Classical(ClassicalType),
    /// Finite-dimensional quantum data.
    Quantum(QuantumType),
    /// A classical handle to a pooled resource of the named type.
    Reference {
        /// The type of the resource the handle points at.
        target: String,
    },
}

/// A named type. Types are identified by name throughout the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// Unique name.
    pub name: String,
    /// Structure of the type.
    pub kind: TypeKind,
}

impl Type {
    /// Create a classical type with `cardinality` values.
    pub fn classical(name: impl Into<String>, cardinality: u128) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Classical(ClassicalType {
                cardinality,
                default: None,
                encoding: None,
            }),
        }
    }

    /// Create an unsigned integer type of the given bit width.
    pub fn uint(name: impl Into<String>, bits: u32) -> Self {
        Self::classical(name, 1u128 << bits.min(64))
            .with_default(0)
            .with_encoding(OutputEncoding::Decimal)
    }

    /// The `unit` type: exactly one value, no information.
    pub fn unit() -> Self {
        Self::classical(UNIT, 1).with_default(0)
    }

    /// The `bit` type, written to the tape as `0` / `1`.
    pub fn bit() -> Self {
        Self::classical(BIT, 2)
            .with_default(0)
            .with_encoding(OutputEncoding::Table(vec![b"0".to_vec(), b"1".to_vec()]))
    }

    /// Create a quantum type of the given basis dimension.
    pub fn quantum(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Quantum(QuantumType {
                dimension,
                default_state: None,
            }),
        }
    }

    /// The `qubit` type.
    pub fn qubit() -> Self {
        Self::quantum(QUBIT, 2)
    }

    /// Create a reference type pointing at resources of `target`.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Reference {
                target: target.into(),
            },
        }
    }

    /// Set the default value of a classical type. No effect on other kinds.
    #[must_use]
    pub fn with_default(mut self, value: u64) -> Self {
        if let TypeKind::Classical(c) = &mut self.kind {
            c.default = Some(value);
        }
        self
    }

    /// Set the tape encoding of a classical type. No effect on other kinds.
    #[must_use]
    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        if let TypeKind::Classical(c) = &mut self.kind {
            c.encoding = Some(encoding);
        }
        self
    }

    /// Set the allocation state of a quantum type. No effect on other kinds.
    #[must_use]
    pub fn with_default_state(mut self, state: Vec<Complex64>) -> Self {
        if let TypeKind::Quantum(q) = &mut self.kind {
            q.default_state = Some(state);
        }
        self
    }

    /// References count as classical: they may be copied and fanned out.
    #[inline]
    pub fn is_classical(&self) -> bool {
        !self.is_quantum()
    }

    /// Check if this is a quantum type.
    #[inline]
    pub fn is_quantum(&self) -> bool {
        matches!(self.kind, TypeKind::Quantum(_))
    }

    /// Check if this is a reference type.
    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference { .. })
    }

    /// Get the classical structure, if any.
    pub fn as_classical(&self) -> Option<&ClassicalType> {
        match &self.kind {
            TypeKind::Classical(c) => Some(c),
            _ => None,
        }
    }

    /// Get the quantum structure, if any.
    pub fn as_quantum(&self) -> Option<&QuantumType> {
        match &self.kind {
            TypeKind::Quantum(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Mapping from port name to type name.
///
/// Port order carries no meaning; iteration is by port name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(BTreeMap<String, String>);

impl Signature {
    /// Create an empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port, replacing any existing port with the same name.
    #[must_use]
    pub fn with(mut self, port: impl Into<String>, ty: impl Into<String>) -> Self {
        self.0.insert(port.into(), ty.into());
        self
    }

    /// Single-port signature.
    pub fn single(port: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::new().with(port, ty)
    }

    /// The signature given to empty function boundaries: one `unit` port.
    pub fn unit() -> Self {
        Self::single(UNIT, UNIT)
    }

    /// Type name of a port.
    pub fn get(&self, port: &str) -> Option<&str> {
        self.0.get(port).map(String::as_str)
    }

    /// Check if a port exists.
    pub fn contains(&self, port: &str) -> bool {
        self.0.contains_key(port)
    }

    /// Iterate `(port, type)` pairs in port-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    /// Iterate port names.
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no ports.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace an empty signature by [`Signature::unit`].
    #[must_use]
    pub fn or_unit(self) -> Self {
        if self.is_empty() { Self::unit() } else { self }
    }
}

impl<P: Into<String>, T: Into<String>> FromIterator<(P, T)> for Signature {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(p, t)| (p.into(), t.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (port, ty)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{port}: {ty}")?;
        }
        write!(f, ")")
    }
}
