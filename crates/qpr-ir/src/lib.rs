//! QPR Graph Intermediate Representation
//!
//! This crate provides the data model for hybrid classical/quantum programs
//! expressed as dataflow graphs. It is the foundation of the QPR stack: the
//! validator inspects these graphs and the engine executes them.
//!
//! # Overview
//!
//! A [`Catalog`] registers the finite classical and quantum [`Type`]s and the
//! built-in node [`Specifier`]s (gates, measurement, allocation, copy, write,
//! pure and decision functions). A [`FunctionBuilder`] assembles a typed graph
//! of F-nodes, D-nodes and wires between one initial and one final node, and
//! [`FunctionBuilder::seal`] freezes it into a [`Function`]. Functions are
//! collected into a [`Library`], and a library with a `main` function is a
//! [`Program`].
//!
//! Every construction step type-checks: a wire whose ends disagree is rejected
//! with [`IrError::TypeMismatch`] and nothing is committed.
//!
//! [`Function::to_dot`] renders a sealed function as a Graphviz `digraph`.
//!
//! # Example: Measure a Fresh Qubit
//!
//! ```rust
//! use std::sync::Arc;
//! use qpr_ir::{Catalog, FunctionBuilder, Library, Program, Signature, ports};
//!
//! let catalog = Arc::new(Catalog::standard().unwrap());
//! let mut main = FunctionBuilder::new(
//!     Arc::clone(&catalog),
//!     "main",
//!     Signature::new(),
//!     Signature::new(),
//! )
//! .unwrap();
//!
//! let alloc = main.add_node("alloc_qubit").unwrap();
//! let h = main.add_node("h").unwrap();
//! let m = main.add_node("measure").unwrap();
//! let free = main.add_node("free_qubit").unwrap();
//! let (init, fin) = (main.initial(), main.final_node());
//!
//! main.add_wire(init, "unit", alloc, ports::UNIT).unwrap();
//! main.add_wire(alloc, ports::VALUE, h, ports::QUBIT).unwrap();
//! main.add_wire(h, ports::QUBIT, m, ports::QUBIT).unwrap();
//! main.add_wire(m, ports::QUBIT, free, ports::VALUE).unwrap();
//! main.add_wire(free, ports::UNIT, fin, "unit").unwrap();
//! let write = main.add_node("write_bit").unwrap();
//! main.add_wire(m, ports::OUTCOME, write, ports::VALUE).unwrap();
//! main.add_wire(write, ports::UNIT, fin, "unit").unwrap();
//!
//! let program = Program::build(Library::build([main.seal().unwrap()]).unwrap()).unwrap();
//! assert_eq!(program.main().node_count(), 7);
//! ```
//!
//! # Built-in Specifier Families
//!
//! | Family | Inputs | Outputs |
//! |--------|--------|---------|
//! | gate | `q` (or `ctl`, `tgt`) | same |
//! | `measure` | `q` | `q`, `outcome` |
//! | `alloc_<T>` | `unit` | `value` |
//! | `free_<T>` | `value` | `unit` |
//! | `copy_<T>` | `value` | `a`, `b` |
//! | `write_<T>` | `value` | `unit` |
//! | literal writer | `trigger` | `unit` |
//! | `load_<T>` / `store_<T>` | `ref` (+ `value`) | `ref` (+ `value`) |

pub mod catalog;
pub mod dot;
pub mod error;
pub mod function;
pub mod gate;
pub mod node;
pub mod program;
pub mod types;
pub mod value;

pub use catalog::{Catalog, DecideFn, PureFn, Semantics, Specifier, ports};
pub use error::{IrError, IrResult};
pub use function::{Function, FunctionBuilder, PortWires};
pub use gate::{StandardGate, apply_matrix};
pub use node::{
    Branch, CallSpec, Decision, DecisionSpec, Node, NodeId, NodeKind, OpSpec, PortMap, Wire,
    WireId,
};
pub use program::{FnId, Library, MAIN, Program};
pub use types::{
    BIT, ClassicalType, OutputEncoding, QUBIT, QuantumType, Signature, Type, TypeKind, UNIT,
    validate_state,
};
pub use value::{OperandError, PortValues, ResourceRef, Value};
