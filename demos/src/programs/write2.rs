//! Two independent measurement chains joined before the final node.

use std::sync::Arc;

use qpr_ir::{Catalog, FunctionBuilder, IrResult, Library, NodeId, Program, Signature, ports};

/// Build the program. Its tape holds two bits in an order the schedule picks.
pub fn program(catalog: Arc<Catalog>) -> IrResult<Program> {
    let mut b = FunctionBuilder::new(catalog, "main", Signature::new(), Signature::unit())?;
    let (init, fin) = (b.initial(), b.final_node());

    let (write0, free0) = chain(&mut b, init, "rx_quarter")?;
    let (write1, free1) = chain(&mut b, init, "rx_half")?;

    let writes = b.add_labeled("sync", "writes")?;
    let frees = b.add_labeled("sync", "frees")?;
    let all = b.add_node("sync")?;
    b.add_wire(write0, ports::UNIT, writes, "a")?;
    b.add_wire(write1, ports::UNIT, writes, "b")?;
    b.add_wire(free0, ports::UNIT, frees, "a")?;
    b.add_wire(free1, ports::UNIT, frees, "b")?;
    b.add_wire(writes, ports::UNIT, all, "a")?;
    b.add_wire(frees, ports::UNIT, all, "b")?;
    b.add_wire(all, ports::UNIT, fin, ports::UNIT)?;
    Program::build(Library::build([b.seal()?])?)
}

fn chain(b: &mut FunctionBuilder, init: NodeId, gate: &str) -> IrResult<(NodeId, NodeId)> {
    let alloc = b.add_node("alloc_qubit")?;
    let rotate = b.add_node(gate)?;
    let measure = b.add_node("measure")?;
    let write = b.add_node("write_bit")?;
    let free = b.add_node("free_qubit")?;
    b.add_wire(init, ports::UNIT, alloc, ports::UNIT)?;
    b.add_wire(alloc, ports::VALUE, rotate, ports::QUBIT)?;
    b.add_wire(rotate, ports::QUBIT, measure, ports::QUBIT)?;
    b.add_wire(measure, ports::OUTCOME, write, ports::VALUE)?;
    b.add_wire(measure, ports::QUBIT, free, ports::VALUE)?;
    Ok((write, free))
}
