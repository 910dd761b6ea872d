//! List command implementation.

use anyhow::Result;
use console::style;

/// Execute the list command.
pub fn execute() -> Result<()> {
    println!("{} Demo programs:\n", style("QPR").cyan().bold());
    for demo in qpr_demos::demos() {
        let inputs = demo
            .inputs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {:<10} {}", style(demo.name).bold(), demo.description);
        if !inputs.is_empty() {
            println!("  {:<10} {}", "", style(inputs).dim());
        }
    }
    Ok(())
}
