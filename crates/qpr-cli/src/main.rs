//! QPR Command-Line Interface
//!
//! Lists, validates and runs the demo programs.
//!
//! ```text
//! qpr list
//! qpr validate hang
//! qpr run collatz --input n=27 --schedule random:3 --json
//! qpr dot collatz --function f | dot -Tsvg > f.svg
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{dot, list, run, validate, version};

/// QPR - run hybrid classical/quantum dataflow programs
#[derive(Parser, Debug)]
#[command(name = "qpr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the demo programs
    List,

    /// Check a program for hangs and races
    Validate {
        /// Demo program name
        program: String,

        /// Bound on guard terms per node
        #[arg(long)]
        max_terms: Option<usize>,

        /// Exit with an error if any hazard is found
        #[arg(long)]
        strict: bool,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a program and print its output tape
    Run {
        /// Demo program name
        program: String,

        /// Input value as name=value (integer, |0>, |1>, |+> or |->)
        #[arg(short, long = "input", value_name = "NAME=VALUE")]
        inputs: Vec<String>,

        /// Schedule policy (in-order, reverse, random, random:SEED)
        #[arg(short, long, env = "QPR_SCHEDULE")]
        schedule: Option<String>,

        /// Measurement seed
        #[arg(long)]
        seed: Option<u64>,

        /// Engine configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a function graph in Graphviz DOT
    Dot {
        /// Demo program name
        program: String,

        /// Function to render
        #[arg(short, long, default_value = qpr_ir::MAIN)]
        function: String,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::List => list::execute(),

        Commands::Validate {
            program,
            max_terms,
            strict,
            json,
        } => validate::execute(&program, max_terms, strict, json),

        Commands::Run {
            program,
            inputs,
            schedule,
            seed,
            config,
            json,
        } => run::execute(&run::RunArgs {
            program: &program,
            inputs: &inputs,
            schedule: schedule.as_deref(),
            seed,
            config: config.as_deref(),
            json,
        }),

        Commands::Dot { program, function } => dot::execute(&program, &function),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "qpr", "run", "collatz", "-i", "n=27", "--seed", "4", "--json",
        ])
        .unwrap();
        let Commands::Run {
            program,
            inputs,
            seed,
            json,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(program, "collatz");
        assert_eq!(inputs, ["n=27"]);
        assert_eq!(seed, Some(4));
        assert!(json);
    }

    #[test]
    fn test_parse_dot_defaults_to_main() {
        let cli = Cli::try_parse_from(["qpr", "dot", "collatz"]).unwrap();
        let Commands::Dot { program, function } = cli.command else {
            panic!("expected dot");
        };
        assert_eq!(program, "collatz");
        assert_eq!(function, "main");
    }

    #[test]
    fn test_parse_verbosity() {
        let cli = Cli::try_parse_from(["qpr", "-vv", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_run_requires_program() {
        assert!(Cli::try_parse_from(["qpr", "run"]).is_err());
    }
}
