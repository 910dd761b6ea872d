//! QPR Execution Engine
//!
//! Runs a built [`Program`](qpr_ir::Program) as a dataflow graph: every wire
//! holds at most one token, a node fires once all of its input ports hold a
//! token and all of its output wires are empty, and the run ends when `main`'s
//! final node fires.
//!
//! # Overview
//!
//! - [`Engine`]: drives firing across all live activations, one node per step,
//!   in the order chosen by a [`SchedulePolicy`].
//! - [`ResourceManager`]: the capacity-bounded pool behind allocation nodes,
//!   classical cells and quantum state vectors.
//! - [`OutputTape`]: append-only byte output, optionally streamed through a
//!   [`TapeSink`].
//! - [`EngineConfig`]: limits, schedule and measurement seed, from defaults,
//!   a YAML file and `QPR_*` environment variables.
//!
//! Runtime failures (`ResourceExhausted`, `InvalidOperand`, `InvalidReference`,
//! `Deadlock`) end the run with a [`RunStatus::RuntimeError`]; the engine then
//! releases every live resource. Tape entries written before the failure are
//! kept in the [`RunReport`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use qpr_exec::{Engine, EngineConfig};
//! use qpr_ir::{Catalog, FunctionBuilder, Library, Program, Signature, ports};
//!
//! let mut catalog = Catalog::standard().unwrap();
//! catalog.register_literal_writer("hello", "unit", b"hello\n".to_vec()).unwrap();
//! let catalog = Arc::new(catalog);
//!
//! let mut main =
//!     FunctionBuilder::new(Arc::clone(&catalog), "main", Signature::new(), Signature::new())
//!         .unwrap();
//! let w = main.add_node("hello").unwrap();
//! let (init, fin) = (main.initial(), main.final_node());
//! main.add_wire(init, "unit", w, ports::TRIGGER).unwrap();
//! main.add_wire(w, ports::UNIT, fin, "unit").unwrap();
//! let program = Program::build(Library::build([main.seal().unwrap()]).unwrap()).unwrap();
//!
//! let engine = Engine::new(catalog, EngineConfig::default());
//! let report = engine.run(&program, &BTreeMap::new()).unwrap();
//! assert!(report.is_success());
//! assert_eq!(report.tape_strings(), vec!["hello\n"]);
//! ```

mod activation;
pub mod config;
pub mod engine;
pub mod error;
pub mod quantum;
pub mod report;
pub mod resource;
pub mod scheduler;
pub mod tape;

pub use activation::ActivationId;
pub use config::{EngineConfig, ResourceLimits};
pub use engine::Engine;
pub use error::{
    ExecError, ExecResult, ResourceError, ResourceKind, ResourceResult, RuntimeError,
    RuntimeErrorKind, Site,
};
pub use report::{HostValue, RunId, RunReport, RunStats, RunStatus};
pub use resource::{ResourceManager, ResourceStats, SlotState};
pub use scheduler::SchedulePolicy;
pub use tape::{OutputTape, TapeSink};
