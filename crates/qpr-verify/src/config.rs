//! Validator configuration.

use serde::{Deserialize, Serialize};

/// Bounds on the guard analysis.
///
/// When a bound is hit the affected site is reported as `Unresolved`
/// instead of being silently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Maximum number of terms in one guard.
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
    /// Maximum number of branch assignments enumerated per hang query.
    #[serde(default = "default_max_assignments")]
    pub max_assignments: usize,
}

fn default_max_terms() -> usize {
    256
}

fn default_max_assignments() -> usize {
    1 << 16
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_terms: default_max_terms(),
            max_assignments: default_max_assignments(),
        }
    }
}
