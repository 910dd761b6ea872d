//! Programs the validator rejects.

use std::sync::Arc;

use qpr_ir::{BIT, Catalog, FunctionBuilder, IrResult, Library, Program, Signature};

/// Two decisions whose branches each feed one input of two joins.
///
/// When the decisions pick different sides, each join holds one token and
/// waits forever for the other.
pub fn hang(catalog: Arc<Catalog>) -> IrResult<Program> {
    let inputs = Signature::new()
        .with("a", BIT)
        .with("b", BIT)
        .with("c", BIT)
        .with("d", BIT);
    let mut f = FunctionBuilder::new(catalog, "main", inputs, Signature::single("e", BIT))?;
    let (init, fin) = (f.initial(), f.final_node());
    let d0 = f.add_labeled("pick", "D0")?;
    let d1 = f.add_labeled("pick", "D1")?;
    let j0 = f.add_labeled("pair", "J0")?;
    let j1 = f.add_labeled("pair", "J1")?;

    f.add_wire(init, "a", d0, "l")?;
    f.add_wire(init, "c", d0, "r")?;
    f.add_wire(init, "b", d1, "l")?;
    f.add_wire(init, "d", d1, "r")?;
    f.add_branch(d0, j0, [("l", "x")])?;
    f.add_branch(d0, j1, [("r", "x")])?;
    f.add_branch(d1, j0, [("l", "y")])?;
    f.add_branch(d1, j1, [("r", "y")])?;
    f.add_wire(j0, "e", fin, "e")?;
    f.add_wire(j1, "e", fin, "e")?;
    Program::build(Library::build([f.seal()?])?)
}

/// Two pass-through nodes wired to the same output port.
pub fn race(catalog: Arc<Catalog>) -> IrResult<Program> {
    let mut f = FunctionBuilder::new(
        catalog,
        "main",
        Signature::new().with("a", BIT).with("b", BIT),
        Signature::single("c", BIT),
    )?;
    let (init, fin) = (f.initial(), f.final_node());
    let left = f.add_labeled("pass", "A")?;
    let right = f.add_labeled("pass", "B")?;
    f.add_wire(init, "a", left, "x")?;
    f.add_wire(init, "b", right, "x")?;
    f.add_wire(left, "e", fin, "c")?;
    f.add_wire(right, "e", fin, "c")?;
    Program::build(Library::build([f.seal()?])?)
}
