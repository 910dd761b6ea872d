//! The Collatz program.
//!
//! `main(n)` writes `Error` for zero and otherwise calls `f(n)`. Each call
//! of `f` takes one Collatz step: it allocates a qubit, flips it on odd
//! steps, measures it, writes the outcome, frees it and recurses on the next
//! value. `f(1)` writes `Done`; a step whose `3n + 1` leaves `u32` writes
//! `Overflow`.

use std::sync::Arc;

use qpr_ir::{
    Catalog, FunctionBuilder, IrResult, Library, NodeId, Program, Signature, UNIT, ports,
};

use crate::catalog::{U32, step};

/// Build the program.
pub fn program(catalog: Arc<Catalog>) -> IrResult<Program> {
    let main = main_fn(Arc::clone(&catalog))?;
    let f = step_fn(catalog)?;
    Program::build(Library::build([main, f])?)
}

fn signature() -> (Signature, Signature) {
    (Signature::single("n", U32), Signature::single("done", UNIT))
}

fn main_fn(catalog: Arc<Catalog>) -> IrResult<qpr_ir::Function> {
    let (inputs, outputs) = signature();
    let mut b = FunctionBuilder::new(catalog, "main", inputs.clone(), outputs.clone())?;
    let (init, fin) = (b.initial(), b.final_node());

    let zero = b.add_node("is_zero")?;
    let error = b.add_node("write_error")?;
    let call = b.add_call("f", inputs, outputs)?;

    b.add_wire(init, "n", zero, "n")?;
    b.add_branch(zero, error, [("n", ports::TRIGGER)])?;
    b.add_branch(zero, call, [("n", "n")])?;
    b.add_wire(error, ports::UNIT, fin, "done")?;
    b.add_wire(call, "done", fin, "done")?;
    b.seal()
}

fn step_fn(catalog: Arc<Catalog>) -> IrResult<qpr_ir::Function> {
    let (inputs, outputs) = signature();
    let mut b = FunctionBuilder::new(catalog, "f", inputs.clone(), outputs.clone())?;
    let (init, fin) = (b.initial(), b.final_node());

    let decide = b.add_labeled("collatz_step", "step")?;
    let done = b.add_node("write_done")?;
    let overflow = b.add_node("write_overflow")?;
    let halve = b.add_node("halve")?;
    let triple = b.add_node("triple")?;
    let call = b.add_call("f", inputs, outputs)?;

    b.add_wire(init, "n", decide, "n")?;
    let branches = [
        (step::DONE, done, ports::TRIGGER),
        (step::EVEN, halve, "n"),
        (step::ODD, triple, "n"),
        (step::OVERFLOW, overflow, ports::TRIGGER),
    ];
    for (expected, target, port) in branches {
        let index = b.add_branch(decide, target, [("n", port)])?;
        debug_assert_eq!(index, expected);
    }

    b.add_wire(done, ports::UNIT, fin, "done")?;
    b.add_wire(overflow, ports::UNIT, fin, "done")?;

    let even = coin(&mut b, halve, false)?;
    let odd = coin(&mut b, triple, true)?;
    b.add_wire(even, "n", call, "n")?;
    b.add_wire(odd, "n", call, "n")?;
    b.add_wire(call, "done", fin, "done")?;
    b.seal()
}

/// Allocate a qubit when `step` ticks, flip it if `flip`, measure it, write
/// the outcome and free it. Returns the node that forwards the next `n` once
/// both the write and the free have fired.
fn coin(b: &mut FunctionBuilder, step: NodeId, flip: bool) -> IrResult<NodeId> {
    let alloc = b.add_node("alloc_qubit")?;
    let measure = b.add_node("measure")?;
    let write = b.add_node("write_bit")?;
    let free = b.add_node("free_qubit")?;
    let sync = b.add_node("sync_u32")?;

    b.add_wire(step, "tick", alloc, ports::UNIT)?;
    if flip {
        let x = b.add_node("x")?;
        b.add_wire(alloc, ports::VALUE, x, ports::QUBIT)?;
        b.add_wire(x, ports::QUBIT, measure, ports::QUBIT)?;
    } else {
        b.add_wire(alloc, ports::VALUE, measure, ports::QUBIT)?;
    }
    b.add_wire(measure, ports::OUTCOME, write, ports::VALUE)?;
    b.add_wire(measure, ports::QUBIT, free, ports::VALUE)?;
    b.add_wire(step, "n", sync, "n")?;
    b.add_wire(write, ports::UNIT, sync, "a")?;
    b.add_wire(free, ports::UNIT, sync, "b")?;
    Ok(sync)
}

/// The tape the program writes for `n`, computed directly.
pub fn expected_tape(n: u32) -> Vec<Vec<u8>> {
    if n == 0 {
        return vec![b"Error\n".to_vec()];
    }
    let mut tape = Vec::new();
    let mut n = u64::from(n);
    loop {
        match crate::catalog::collatz_branch(n) {
            step::DONE => {
                tape.push(b"Done\n".to_vec());
                break;
            }
            step::EVEN => {
                tape.push(b"0".to_vec());
                n /= 2;
            }
            step::ODD => {
                tape.push(b"1".to_vec());
                n = 3 * n + 1;
            }
            _ => {
                tape.push(b"Overflow\n".to_vec());
                break;
            }
        }
    }
    tape
}
