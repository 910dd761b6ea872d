//! Validator: runs checks over every function of a program.

use tracing::{debug, info, instrument, warn};

use qpr_ir::{Function, Program};

use crate::check::{Check, CheckContext};
use crate::checks::{HangCheck, RaceCheck};
use crate::config::ValidatorConfig;
use crate::guard::GuardAnalysis;
use crate::hazard::{Hazard, Verdict};

/// Manages and runs a sequence of checks.
pub struct Validator {
    /// The checks to run, in order.
    checks: Vec<Box<dyn Check>>,
    /// Analysis bounds.
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with no checks.
    pub fn empty(config: ValidatorConfig) -> Self {
        Self {
            checks: vec![],
            config,
        }
    }

    /// Create a validator with the race and hang checks.
    pub fn new(config: ValidatorConfig) -> Self {
        let mut validator = Self::empty(config);
        validator.add_check(RaceCheck);
        validator.add_check(HangCheck);
        validator
    }

    /// Add a check.
    pub fn add_check(&mut self, check: impl Check + 'static) {
        self.checks.push(Box::new(check));
    }

    /// The analysis bounds.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate every function of the program.
    ///
    /// Never mutates the program; calling it twice gives the same verdict.
    #[instrument(skip(self, program))]
    pub fn validate(&self, program: &Program) -> Verdict {
        info!(
            "Validating program with {} functions and {} checks",
            program.library().len(),
            self.checks.len()
        );

        let mut hazards = Vec::new();
        for function in program.library().functions() {
            hazards.extend(self.validate_function(function));
        }

        hazards.sort();
        hazards.dedup();

        if hazards.is_empty() {
            info!("Validation passed");
            Verdict::Ok
        } else {
            for hazard in &hazards {
                warn!("{hazard}");
            }
            Verdict::Warnings(hazards)
        }
    }

    /// Run all checks on one function.
    pub fn validate_function(&self, function: &Function) -> Vec<Hazard> {
        let analysis = GuardAnalysis::new(function, &self.config);
        let ctx = CheckContext {
            function,
            analysis: &analysis,
            config: &self.config,
        };

        let mut hazards = Vec::new();
        for check in &self.checks {
            if check.should_run(function) {
                let before = hazards.len();
                check.run(&ctx, &mut hazards);
                debug!(
                    "Check {} on {}: {} hazards",
                    check.name(),
                    function.name(),
                    hazards.len() - before
                );
            } else {
                debug!("Skipping check {} on {}", check.name(), function.name());
            }
        }
        hazards
    }

    /// Get the number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Check if the validator has no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}
