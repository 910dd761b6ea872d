//! Dot command implementation.

use anyhow::{Context, Result};

use super::common::load_program;

/// Execute the dot command.
pub fn execute(name: &str, function: &str) -> Result<()> {
    let (_, catalog, program) = load_program(name)?;
    let graph = program.library().get(function).with_context(|| {
        let known: Vec<&str> = program.library().functions().map(|f| f.name()).collect();
        format!(
            "Program '{name}' has no function '{function}'. Available: {}",
            known.join(", ")
        )
    })?;
    print!("{}", graph.to_dot(&catalog));
    Ok(())
}
