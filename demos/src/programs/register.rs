//! A classical cell passed by reference to a callee that increments it.

use std::sync::Arc;

use qpr_ir::{Catalog, Function, FunctionBuilder, IrResult, Library, Program, Signature, UNIT, ports};

use crate::catalog::U32;

/// Build the program: `main(n)` stores `n` in a fresh cell, calls
/// `bump(cell)`, loads the result, frees the cell and returns the value.
pub fn program(catalog: Arc<Catalog>) -> IrResult<Program> {
    let main = main_fn(Arc::clone(&catalog))?;
    let bump = bump_fn(catalog)?;
    Program::build(Library::build([main, bump])?)
}

fn cell() -> Signature {
    Signature::single("r", format!("ref_{U32}"))
}

fn main_fn(catalog: Arc<Catalog>) -> IrResult<Function> {
    let mut b = FunctionBuilder::new(
        catalog,
        "main",
        Signature::single("n", U32),
        Signature::new().with("n", U32).with("unit", UNIT),
    )?;
    let (init, fin) = (b.initial(), b.final_node());

    let touch = b.add_node("touch")?;
    let alloc = b.add_node("alloc_u32")?;
    let store = b.add_node("store_u32")?;
    let call = b.add_call("bump", cell(), cell())?;
    let load = b.add_node("load_u32")?;
    let free = b.add_node("free_u32")?;

    b.add_wire(init, "n", touch, "n")?;
    b.add_wire(touch, "tick", alloc, ports::UNIT)?;
    b.add_wire(alloc, ports::VALUE, store, ports::REF)?;
    b.add_wire(touch, "n", store, ports::VALUE)?;
    b.add_wire(store, ports::REF, call, "r")?;
    b.add_wire(call, "r", load, ports::REF)?;
    b.add_wire(load, ports::VALUE, fin, "n")?;
    b.add_wire(load, ports::REF, free, ports::VALUE)?;
    b.add_wire(free, ports::UNIT, fin, "unit")?;
    b.seal()
}

fn bump_fn(catalog: Arc<Catalog>) -> IrResult<Function> {
    let mut b = FunctionBuilder::new(catalog, "bump", cell(), cell())?;
    let (init, fin) = (b.initial(), b.final_node());
    let load = b.add_node("load_u32")?;
    let incr = b.add_node("incr")?;
    let store = b.add_node("store_u32")?;

    b.add_wire(init, "r", load, ports::REF)?;
    b.add_wire(load, ports::VALUE, incr, "n")?;
    b.add_wire(load, ports::REF, store, ports::REF)?;
    b.add_wire(incr, "n", store, ports::VALUE)?;
    b.add_wire(store, ports::REF, fin, "r")?;
    b.seal()
}
