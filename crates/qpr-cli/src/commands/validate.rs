//! Validate command implementation.

use anyhow::Result;
use console::style;

use qpr_verify::{Validator, ValidatorConfig, Verdict};

use super::common::load_program;

/// Execute the validate command.
pub fn execute(name: &str, max_terms: Option<usize>, strict: bool, json: bool) -> Result<()> {
    let (_, _, program) = load_program(name)?;

    let mut config = ValidatorConfig::default();
    if let Some(max_terms) = max_terms {
        config.max_terms = max_terms;
    }
    let verdict = Validator::new(config).validate(&program);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        match &verdict {
            Verdict::Ok => println!(
                "{} {} has no hazards",
                style("✓").green().bold(),
                style(name).green()
            ),
            Verdict::Warnings(hazards) => {
                println!(
                    "{} {} has {} hazard(s):",
                    style("!").yellow().bold(),
                    style(name).yellow(),
                    hazards.len()
                );
                for hazard in hazards {
                    println!("  {hazard}");
                }
            }
        }
    }

    if strict && !verdict.is_ok() {
        anyhow::bail!("{} hazard(s) in '{name}'", verdict.hazards().len());
    }
    Ok(())
}
