//! Run command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use qpr_exec::{Engine, EngineConfig, RunReport, SchedulePolicy};

use super::common::{collect_inputs, load_program};

/// Arguments of the run command.
pub struct RunArgs<'a> {
    pub program: &'a str,
    pub inputs: &'a [String],
    pub schedule: Option<&'a str>,
    pub seed: Option<u64>,
    pub config: Option<&'a Path>,
    pub json: bool,
}

/// Execute the run command.
pub fn execute(args: &RunArgs<'_>) -> Result<()> {
    let (demo, catalog, program) = load_program(args.program)?;
    let inputs = collect_inputs(demo, args.inputs)?;

    let mut config = EngineConfig::load(args.config).context("Failed to load engine configuration")?;
    if let Some(schedule) = args.schedule {
        let policy: SchedulePolicy = schedule
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid schedule: {e}"))?;
        config = config.with_schedule(policy);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    if !args.json {
        println!(
            "{} Running {} ({})",
            style("→").cyan().bold(),
            style(args.program).green(),
            style(config.schedule).yellow()
        );
    }

    let report = Engine::new(catalog, config)
        .run(&program, &inputs)
        .with_context(|| format!("Cannot start '{}'", args.program))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    match report.error() {
        Some(err) => anyhow::bail!("{err}"),
        None => Ok(()),
    }
}

fn print_report(report: &RunReport) {
    println!("\n{}", style("Tape:").bold());
    let text: String = report.tape_strings().concat();
    if text.is_empty() {
        println!("  {}", style("(empty)").dim());
    } else {
        for line in text.lines() {
            println!("  {line}");
        }
    }

    if !report.outputs.is_empty() {
        println!("\n{}", style("Outputs:").bold());
        for (port, value) in &report.outputs {
            println!("  {port} = {value}");
        }
    }

    let stats = &report.stats;
    println!("\n{}", style("Statistics:").bold());
    println!("  Run:         {}", report.run_id);
    println!("  Status:      {}", report.status);
    println!("  Steps:       {}", stats.steps);
    println!("  Activations: {} (peak depth {})", stats.activations, stats.peak_depth);
    println!(
        "  Resources:   {} allocated, peak {} live, {} released at exit",
        stats.allocations, stats.peak_live_resources, stats.released_at_exit
    );
    println!("  Time:        {} µs", report.duration().num_microseconds().unwrap_or(0));
}
