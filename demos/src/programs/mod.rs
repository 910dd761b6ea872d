//! Demo programs built on [`crate::catalog`].

pub mod collatz;
pub mod hazards;
pub mod register;
pub mod write2;

use std::sync::Arc;

use qpr_ir::{Catalog, IrResult, Program};
use tracing::debug;

/// A named program with sample inputs.
#[derive(Debug, Clone, Copy)]
pub struct Demo {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Sample inputs as `(port, value)` pairs, in host syntax.
    pub inputs: &'static [(&'static str, &'static str)],
    builder: fn(Arc<Catalog>) -> IrResult<Program>,
}

impl Demo {
    /// Build the program against `catalog`, which must be the demo catalog.
    pub fn build(&self, catalog: Arc<Catalog>) -> IrResult<Program> {
        let program = (self.builder)(catalog)?;
        debug!(
            "Built demo {}: {} functions",
            self.name,
            program.library().len()
        );
        Ok(program)
    }
}

static DEMOS: [Demo; 5] = [
    Demo {
        name: "collatz",
        description: "Collatz sequence, one measured qubit per step",
        inputs: &[("n", "6")],
        builder: collatz::program,
    },
    Demo {
        name: "write2",
        description: "Two rotated qubits measured and written in either order",
        inputs: &[],
        builder: write2::program,
    },
    Demo {
        name: "register",
        description: "Increment a classical cell through a callee",
        inputs: &[("n", "41")],
        builder: register::program,
    },
    Demo {
        name: "hang",
        description: "Two decisions whose branches starve both joins",
        inputs: &[("a", "0"), ("b", "1"), ("c", "0"), ("d", "0")],
        builder: hazards::hang,
    },
    Demo {
        name: "race",
        description: "Two unconditional producers feeding one output",
        inputs: &[("a", "0"), ("b", "1")],
        builder: hazards::race,
    },
];

/// All demos, in display order.
pub fn demos() -> &'static [Demo] {
    &DEMOS
}

/// Look up a demo by name.
pub fn demo(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name)
}
