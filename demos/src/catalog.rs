//! The catalog shared by every demo program.

use std::f64::consts::PI;

use qpr_ir::{BIT, Catalog, IrResult, OperandError, PortValues, Signature, StandardGate, Type, Value};

/// 32-bit unsigned integers, written in decimal.
pub const U32: &str = "u32";

/// Branches of `collatz_step`.
pub mod step {
    /// `n == 1`.
    pub const DONE: usize = 0;
    /// `n` even.
    pub const EVEN: usize = 1;
    /// `n` odd and `3n + 1` fits.
    pub const ODD: usize = 2;
    /// `n` odd and `3n + 1` overflows.
    pub const OVERFLOW: usize = 3;
}

/// Pick the `collatz_step` branch for `n`.
pub fn collatz_branch(n: u64) -> usize {
    if n == 1 {
        step::DONE
    } else if n % 2 == 0 {
        step::EVEN
    } else if 3 * n + 1 > u64::from(u32::MAX) {
        step::OVERFLOW
    } else {
        step::ODD
    }
}

/// Build the demo catalog on top of [`Catalog::standard`].
///
/// Adds `u32`, the Collatz specifiers, unit and `u32` synchronizers, the
/// literal writers, two fixed-angle `Rx` gates and `u32` cells.
pub fn catalog() -> IrResult<Catalog> {
    let mut catalog = Catalog::standard()?;
    catalog.register_type(Type::uint(U32, 32))?;
    catalog.register_writer(U32)?;

    catalog.register_decision("is_zero", Signature::single("n", U32), 2, |v| {
        Ok(usize::from(v.word("n")? != 0))
    })?;
    catalog.register_decision("collatz_step", Signature::single("n", U32), 4, |v| {
        Ok(collatz_branch(v.word("n")?))
    })?;
    catalog.register_pure(
        "halve",
        Signature::single("n", U32),
        Signature::new().with("n", U32).with("tick", "unit"),
        |v| Ok(ticked(v.word("n")? / 2)),
    )?;
    catalog.register_pure(
        "triple",
        Signature::single("n", U32),
        Signature::new().with("n", U32).with("tick", "unit"),
        |v| {
            let n = v.word("n")?;
            let next = n
                .checked_mul(3)
                .and_then(|m| m.checked_add(1))
                .filter(|&m| m <= u64::from(u32::MAX))
                .ok_or_else(|| OperandError::new(format!("3 * {n} + 1 overflows u32")))?;
            Ok(ticked(next))
        },
    )?;
    catalog.register_pure(
        "touch",
        Signature::single("n", U32),
        Signature::new().with("n", U32).with("tick", "unit"),
        |v| Ok(ticked(v.word("n")?)),
    )?;
    catalog.register_pure(
        "incr",
        Signature::single("n", U32),
        Signature::single("n", U32),
        |v| {
            let n = v.word("n")?;
            if n >= u64::from(u32::MAX) {
                return Err(OperandError::new("u32 increment overflows"));
            }
            Ok(PortValues::new().with("n", n + 1))
        },
    )?;
    catalog.register_pure(
        "sync_u32",
        Signature::new()
            .with("n", U32)
            .with("a", "unit")
            .with("b", "unit"),
        Signature::single("n", U32),
        |v| Ok(PortValues::new().with("n", v.word("n")?)),
    )?;
    catalog.register_pure(
        "sync",
        Signature::new().with("a", "unit").with("b", "unit"),
        Signature::unit(),
        |_| Ok(PortValues::new().with("unit", Value::UNIT)),
    )?;

    catalog.register_literal_writer("write_error", U32, b"Error\n".to_vec())?;
    catalog.register_literal_writer("write_done", U32, b"Done\n".to_vec())?;
    catalog.register_literal_writer("write_overflow", U32, b"Overflow\n".to_vec())?;

    catalog.register_gate("rx_quarter", StandardGate::Rx(PI / 4.0), qpr_ir::QUBIT)?;
    catalog.register_gate("rx_half", StandardGate::Rx(PI / 2.0), qpr_ir::QUBIT)?;

    catalog.register_decision(
        "pick",
        Signature::new().with("l", BIT).with("r", BIT),
        2,
        |v| Ok(v.word("l")? as usize),
    )?;
    catalog.register_pure(
        "pair",
        Signature::new().with("x", BIT).with("y", BIT),
        Signature::single("e", BIT),
        |v| Ok(PortValues::new().with("e", v.word("x")? & v.word("y")?)),
    )?;
    catalog.register_pure(
        "pass",
        Signature::single("x", BIT),
        Signature::single("e", BIT),
        |v| Ok(PortValues::new().with("e", v.word("x")?)),
    )?;

    catalog.register_allocator(U32)?;
    catalog.register_cell_access(U32)?;
    Ok(catalog)
}

fn ticked(n: u64) -> PortValues {
    PortValues::new().with("n", n).with("tick", Value::UNIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collatz_branch() {
        assert_eq!(collatz_branch(1), step::DONE);
        assert_eq!(collatz_branch(6), step::EVEN);
        assert_eq!(collatz_branch(3), step::ODD);
        assert_eq!(collatz_branch(1_431_655_765), step::OVERFLOW);
        assert_eq!(collatz_branch(1_431_655_763), step::ODD);
    }

    #[test]
    fn test_catalog_builds() {
        let catalog = catalog().unwrap();
        for name in [
            "is_zero",
            "collatz_step",
            "halve",
            "triple",
            "sync_u32",
            "write_done",
            "rx_half",
            "load_u32",
            "store_u32",
            "alloc_u32",
            "write_u32",
        ] {
            assert!(catalog.specifier(name).is_ok(), "missing {name}");
        }
        assert_eq!(
            catalog.specifier("collatz_step").unwrap().branch_count(),
            Some(4)
        );
    }
}
