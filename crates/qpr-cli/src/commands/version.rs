//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - dataflow execution for hybrid classical/quantum programs",
        style("QPR").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qpr-ir       Type catalog and graph store");
    println!("  qpr-verify   Hang and race validator");
    println!("  qpr-exec     Resource manager and execution engine");
    println!("  qpr-cli      Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
