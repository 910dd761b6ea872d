//! Shared helpers for CLI commands.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use qpr_demos::Demo;
use qpr_exec::HostValue;
use qpr_ir::{Catalog, Program};

/// Build the demo catalog and the named program.
pub fn load_program(name: &str) -> Result<(&'static Demo, Arc<Catalog>, Program)> {
    let Some(demo) = qpr_demos::demo(name) else {
        let known: Vec<&str> = qpr_demos::demos().iter().map(|d| d.name).collect();
        anyhow::bail!("Unknown program: '{name}'. Available: {}", known.join(", "));
    };
    let catalog = Arc::new(qpr_demos::catalog().context("Failed to build the demo catalog")?);
    let program = demo
        .build(Arc::clone(&catalog))
        .with_context(|| format!("Failed to build program '{name}'"))?;
    Ok((demo, catalog, program))
}

/// Parse one `name=value` argument.
pub fn parse_input(arg: &str) -> Result<(String, HostValue)> {
    let (name, value) = arg
        .split_once('=')
        .with_context(|| format!("Input '{arg}' is not of the form name=value"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Input '{arg}' has an empty name");
    }
    let value = value
        .parse::<HostValue>()
        .map_err(|e| anyhow::anyhow!("Input '{name}': {e}"))?;
    Ok((name.to_string(), value))
}

/// The demo's sample inputs, overridden by `args`.
pub fn collect_inputs(demo: &Demo, args: &[String]) -> Result<BTreeMap<String, HostValue>> {
    let mut inputs = BTreeMap::new();
    for (name, value) in demo.inputs {
        inputs.insert(name.to_string(), parse_input(&format!("{name}={value}"))?.1);
    }
    for arg in args {
        let (name, value) = parse_input(arg)?;
        inputs.insert(name, value);
    }
    Ok(inputs)
}
