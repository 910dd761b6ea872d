//! The type and node-specifier catalog.
//!
//! A [`Catalog`] is filled once by whoever imports or authors programs, then
//! wrapped in an `Arc` and handed to every [`FunctionBuilder`] and to the
//! execution engine. Nothing mutates it afterwards.
//!
//! [`FunctionBuilder`]: crate::function::FunctionBuilder

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::types::{Signature, Type, TypeKind, BIT, QUBIT, UNIT, validate_state};
use crate::value::{OperandError, PortValues};

/// Port names used by the built-in specifiers.
pub mod ports {
    /// Qubit operand of single-qubit gates and measurement.
    pub const QUBIT: &str = "q";
    /// Control operand of controlled gates.
    pub const CONTROL: &str = "ctl";
    /// Target operand of controlled gates.
    pub const TARGET: &str = "tgt";
    /// Classical measurement outcome.
    pub const OUTCOME: &str = "outcome";
    /// Generic value port (allocation result, copy source, encoded write).
    pub const VALUE: &str = "value";
    /// Ordering token.
    pub const UNIT: &str = "unit";
    /// Reference operand of cell access.
    pub const REF: &str = "ref";
    /// First copy output.
    pub const COPY_A: &str = "a";
    /// Second copy output.
    pub const COPY_B: &str = "b";
    /// Trigger input of literal writers.
    pub const TRIGGER: &str = "trigger";
}

/// A pure classical semantic function.
pub type PureFn = Arc<dyn Fn(&PortValues) -> Result<PortValues, OperandError> + Send + Sync>;

/// A decision function: picks a branch index from the classical inputs.
pub type DecideFn = Arc<dyn Fn(&PortValues) -> Result<usize, OperandError> + Send + Sync>;

/// What a specifier does when its node fires.
#[derive(Clone)]
pub enum Semantics {
    /// Classical computation.
    Pure(PureFn),
    /// Branch selection for D-nodes.
    Decision {
        /// Number of branches the decision may select.
        branches: usize,
        /// The decision function.
        decide: DecideFn,
    },
    /// Unitary gate on one qubit, or on a target controlled by a qubit.
    Gate(StandardGate),
    /// Projective measurement in the computational basis.
    Measure,
    /// Take a resource of the named type from the pool.
    Allocate {
        /// Type of the allocated resource.
        ty: String,
    },
    /// Return a resource to the pool.
    Deallocate {
        /// Type of the released resource.
        ty: String,
    },
    /// Duplicate a classical value or alias a reference.
    Copy,
    /// Append a fixed byte string to the output tape.
    WriteLiteral(Vec<u8>),
    /// Append the encoding of a classical value to the output tape.
    WriteEncoded {
        /// Type whose encoding is used.
        ty: String,
    },
    /// Read a classical cell through a reference.
    Load,
    /// Overwrite a classical cell through a reference.
    Store,
}

impl fmt::Debug for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Pure(_) => f.write_str("Pure"),
            Semantics::Decision { branches, .. } => {
                f.debug_struct("Decision").field("branches", branches).finish()
            }
            Semantics::Gate(g) => f.debug_tuple("Gate").field(g).finish(),
            Semantics::Measure => f.write_str("Measure"),
            Semantics::Allocate { ty } => f.debug_struct("Allocate").field("ty", ty).finish(),
            Semantics::Deallocate { ty } => f.debug_struct("Deallocate").field("ty", ty).finish(),
            Semantics::Copy => f.write_str("Copy"),
            Semantics::WriteLiteral(bytes) => f
                .debug_tuple("WriteLiteral")
                .field(&String::from_utf8_lossy(bytes))
                .finish(),
            Semantics::WriteEncoded { ty } => {
                f.debug_struct("WriteEncoded").field("ty", ty).finish()
            }
            Semantics::Load => f.write_str("Load"),
            Semantics::Store => f.write_str("Store"),
        }
    }
}

/// A named built-in node kind with its signature and semantics.
#[derive(Debug, Clone)]
pub struct Specifier {
    /// Globally unique name.
    pub name: String,
    /// Input ports.
    pub inputs: Signature,
    /// Output ports. Always empty for decision specifiers.
    pub outputs: Signature,
    /// Behaviour on firing.
    pub semantics: Semantics,
}

impl Specifier {
    /// Create a specifier.
    pub fn new(
        name: impl Into<String>,
        inputs: Signature,
        outputs: Signature,
        semantics: Semantics,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            semantics,
        }
    }

    /// Check if this specifier drives a D-node.
    #[inline]
    pub fn is_decision(&self) -> bool {
        matches!(self.semantics, Semantics::Decision { .. })
    }

    /// Number of branches for decision specifiers, `None` otherwise.
    pub fn branch_count(&self) -> Option<usize> {
        match self.semantics {
            Semantics::Decision { branches, .. } => Some(branches),
            _ => None,
        }
    }
}

/// Registry of types and node specifiers.
#[derive(Debug, Clone)]
pub struct Catalog {
    types: FxHashMap<String, Type>,
    specifiers: FxHashMap<String, Specifier>,
}

impl Catalog {
    /// Create a catalog containing only the `unit` type.
    pub fn new() -> Self {
        let mut types = FxHashMap::default();
        types.insert(UNIT.to_string(), Type::unit());
        Self {
            types,
            specifiers: FxHashMap::default(),
        }
    }

    /// Create a catalog with `unit`, `bit`, `qubit` and the standard
    /// gate, measurement, allocation, copy and write specifiers.
    pub fn standard() -> IrResult<Self> {
        let mut catalog = Self::new();
        catalog.register_type(Type::bit())?;
        catalog.register_type(Type::qubit())?;

        for gate in [
            StandardGate::I,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::Z,
            StandardGate::H,
            StandardGate::S,
            StandardGate::Sdg,
            StandardGate::T,
            StandardGate::Tdg,
            StandardGate::CX,
            StandardGate::CZ,
        ] {
            catalog.register_gate(gate.name(), gate, QUBIT)?;
        }
        catalog.register_measure("measure", QUBIT, BIT)?;
        catalog.register_allocator(QUBIT)?;
        catalog.register_copy(BIT)?;
        catalog.register_writer(BIT)?;
        Ok(catalog)
    }

    /// Register a type.
    pub fn register_type(&mut self, ty: Type) -> IrResult<()> {
        if self.types.contains_key(&ty.name) {
            return Err(IrError::DuplicateType(ty.name));
        }
        let invalid = |reason: String| IrError::InvalidDefault {
            ty: ty.name.clone(),
            reason,
        };
        match &ty.kind {
            TypeKind::Reference { target } => {
                self.ty(target)?;
            }
            TypeKind::Classical(c) => {
                if let Some(v) = c.default.filter(|v| !c.contains(*v)) {
                    return Err(invalid(format!("{v} is outside 0..{}", c.cardinality)));
                }
            }
            TypeKind::Quantum(q) => {
                if let Some(state) = &q.default_state {
                    validate_state(state, q.dimension).map_err(|e| invalid(e.0))?;
                }
            }
        }
        debug!("Registering type: {}", ty.name);
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    /// Register a node specifier.
    pub fn register_specifier(&mut self, spec: Specifier) -> IrResult<()> {
        if self.specifiers.contains_key(&spec.name) {
            return Err(IrError::DuplicateSpecifier(spec.name));
        }
        for (_, ty) in spec.inputs.iter().chain(spec.outputs.iter()) {
            self.ty(ty)?;
        }
        if spec.inputs.is_empty() {
            return Err(IrError::SpecifierKind {
                name: spec.name,
                expected: "a node specifier (it has no inputs)",
            });
        }
        if let Semantics::Decision { branches, .. } = spec.semantics {
            if !spec.outputs.is_empty() || branches == 0 {
                return Err(IrError::SpecifierKind {
                    name: spec.name,
                    expected: "a decision (needs no outputs and at least one branch)",
                });
            }
        }
        debug!("Registering specifier: {} {}", spec.name, spec.inputs);
        self.specifiers.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Look up a type by name.
    pub fn ty(&self, name: &str) -> IrResult<&Type> {
        self.types
            .get(name)
            .ok_or_else(|| IrError::UnknownType(name.to_string()))
    }

    /// Look up a specifier by name.
    pub fn specifier(&self, name: &str) -> IrResult<&Specifier> {
        self.specifiers
            .get(name)
            .ok_or_else(|| IrError::UnknownSpecifier(name.to_string()))
    }

    /// Check if a type is registered.
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterate registered types.
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    /// Iterate registered specifiers.
    pub fn specifiers(&self) -> impl Iterator<Item = &Specifier> {
        self.specifiers.values()
    }

    // =========================================================================
    // Registration helpers for the built-in semantic families
    // =========================================================================

    /// Register a pure classical function.
    pub fn register_pure<F>(
        &mut self,
        name: impl Into<String>,
        inputs: Signature,
        outputs: Signature,
        f: F,
    ) -> IrResult<()>
    where
        F: Fn(&PortValues) -> Result<PortValues, OperandError> + Send + Sync + 'static,
    {
        self.register_specifier(Specifier::new(
            name,
            inputs,
            outputs,
            Semantics::Pure(Arc::new(f)),
        ))
    }

    /// Register a decision function selecting one of `branches` branches.
    pub fn register_decision<F>(
        &mut self,
        name: impl Into<String>,
        inputs: Signature,
        branches: usize,
        f: F,
    ) -> IrResult<()>
    where
        F: Fn(&PortValues) -> Result<usize, OperandError> + Send + Sync + 'static,
    {
        self.register_specifier(Specifier::new(
            name,
            inputs,
            Signature::new(),
            Semantics::Decision {
                branches,
                decide: Arc::new(f),
            },
        ))
    }

    /// Register a gate acting on a two-dimensional quantum type.
    pub fn register_gate(
        &mut self,
        name: impl Into<String>,
        gate: StandardGate,
        qtype: &str,
    ) -> IrResult<()> {
        let name = name.into();
        let dimension = self.quantum_dimension(qtype)?;
        if dimension != 2 {
            return Err(IrError::mismatch(
                format!("gate {name} needs a qubit type"),
                QUBIT,
                qtype,
            ));
        }
        let sig = if gate.is_controlled() {
            Signature::new()
                .with(ports::CONTROL, qtype)
                .with(ports::TARGET, qtype)
        } else {
            Signature::single(ports::QUBIT, qtype)
        };
        self.register_specifier(Specifier::new(
            name,
            sig.clone(),
            sig,
            Semantics::Gate(gate),
        ))
    }

    /// Register a measurement of `qtype` producing an outcome of `ctype`.
    ///
    /// The outcome type must have exactly as many values as the basis has
    /// states.
    pub fn register_measure(
        &mut self,
        name: impl Into<String>,
        qtype: &str,
        ctype: &str,
    ) -> IrResult<()> {
        let dimension = self.quantum_dimension(qtype)?;
        let outcome = self.ty(ctype)?;
        let fits = outcome
            .as_classical()
            .is_some_and(|c| c.cardinality == dimension as u128);
        if !fits {
            return Err(IrError::mismatch(
                format!("measurement outcome for {qtype}"),
                format!("classical type with {dimension} values"),
                ctype,
            ));
        }
        self.register_specifier(Specifier::new(
            name,
            Signature::single(ports::QUBIT, qtype),
            Signature::new()
                .with(ports::QUBIT, qtype)
                .with(ports::OUTCOME, ctype),
            Semantics::Measure,
        ))
    }

    /// Register `alloc_<ty>` and `free_<ty>`.
    ///
    /// Quantum resources travel on wires of their own type. Classical
    /// resources are reached through the reference type `ref_<ty>`, which is
    /// registered here if absent. Returns the name of the handle type.
    pub fn register_allocator(&mut self, ty: &str) -> IrResult<String> {
        let handle_ty = if self.ty(ty)?.is_quantum() {
            ty.to_string()
        } else {
            let ref_name = format!("ref_{ty}");
            if !self.contains_type(&ref_name) {
                self.register_type(Type::reference(&ref_name, ty))?;
            }
            ref_name
        };
        self.register_specifier(Specifier::new(
            format!("alloc_{ty}"),
            Signature::single(ports::UNIT, UNIT),
            Signature::single(ports::VALUE, &handle_ty),
            Semantics::Allocate { ty: ty.to_string() },
        ))?;
        self.register_specifier(Specifier::new(
            format!("free_{ty}"),
            Signature::single(ports::VALUE, &handle_ty),
            Signature::single(ports::UNIT, UNIT),
            Semantics::Deallocate { ty: ty.to_string() },
        ))?;
        Ok(handle_ty)
    }

    /// Register `copy_<ty>` for a classical (or reference) type.
    pub fn register_copy(&mut self, ty: &str) -> IrResult<()> {
        if self.ty(ty)?.is_quantum() {
            return Err(IrError::NotCopyable(ty.to_string()));
        }
        self.register_specifier(Specifier::new(
            format!("copy_{ty}"),
            Signature::single(ports::VALUE, ty),
            Signature::new()
                .with(ports::COPY_A, ty)
                .with(ports::COPY_B, ty),
            Semantics::Copy,
        ))
    }

    /// Register `write_<ty>`, which writes the type's encoding of its input.
    pub fn register_writer(&mut self, ty: &str) -> IrResult<()> {
        let has_encoding = self
            .ty(ty)?
            .as_classical()
            .is_some_and(|c| c.encoding.is_some());
        if !has_encoding {
            return Err(IrError::MissingEncoding(ty.to_string()));
        }
        self.register_specifier(Specifier::new(
            format!("write_{ty}"),
            Signature::single(ports::VALUE, ty),
            Signature::single(ports::UNIT, UNIT),
            Semantics::WriteEncoded { ty: ty.to_string() },
        ))
    }

    /// Register a writer of a fixed byte string, fired by a `trigger` token.
    pub fn register_literal_writer(
        &mut self,
        name: impl Into<String>,
        trigger: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> IrResult<()> {
        if self.ty(trigger)?.is_quantum() {
            return Err(IrError::NotCopyable(trigger.to_string()));
        }
        self.register_specifier(Specifier::new(
            name,
            Signature::single(ports::TRIGGER, trigger),
            Signature::single(ports::UNIT, UNIT),
            Semantics::WriteLiteral(bytes.into()),
        ))
    }

    /// Register `load_<ty>` and `store_<ty>` over `ref_<ty>`.
    ///
    /// The allocator for `ty` must be registered first.
    pub fn register_cell_access(&mut self, ty: &str) -> IrResult<()> {
        let ref_ty = format!("ref_{ty}");
        self.ty(&ref_ty)?;
        self.register_specifier(Specifier::new(
            format!("load_{ty}"),
            Signature::single(ports::REF, &ref_ty),
            Signature::new()
                .with(ports::REF, &ref_ty)
                .with(ports::VALUE, ty),
            Semantics::Load,
        ))?;
        self.register_specifier(Specifier::new(
            format!("store_{ty}"),
            Signature::new()
                .with(ports::REF, &ref_ty)
                .with(ports::VALUE, ty),
            Signature::single(ports::REF, &ref_ty),
            Semantics::Store,
        ))
    }

    fn quantum_dimension(&self, qtype: &str) -> IrResult<usize> {
        self.ty(qtype)?
            .as_quantum()
            .map(|q| q.dimension)
            .ok_or_else(|| IrError::mismatch("quantum operand", "quantum type", qtype))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
