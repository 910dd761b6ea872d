//! Engine configuration.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`QPR_` prefix)
//! 2. Configuration file (YAML)
//! 3. Default values

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExecError, ExecResult};
use crate::scheduler::SchedulePolicy;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pool capacities and the call ceiling
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Order in which enabled nodes fire
    #[serde(default)]
    pub schedule: SchedulePolicy,

    /// Seed of the measurement RNG
    #[serde(default)]
    pub seed: u64,
}

/// Resource limits of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum live classical cells
    #[serde(default = "default_max_classical")]
    pub max_classical: usize,

    /// Maximum live quantum resources
    #[serde(default = "default_max_quantum")]
    pub max_quantum: usize,

    /// Maximum live activations, `main` included
    #[serde(default = "default_max_activations")]
    pub max_activations: usize,
}

fn default_max_classical() -> usize {
    1024
}

fn default_max_quantum() -> usize {
    64
}

fn default_max_activations() -> usize {
    10_000
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            max_classical: default_max_classical(),
            max_quantum: default_max_quantum(),
            max_activations: default_max_activations(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            limits: ResourceLimits::default(),
            schedule: SchedulePolicy::default(),
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ExecResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ExecError::Config(format!("{}: {e}", path.display())))?;
        let config: EngineConfig = serde_yaml_ng::from_str(&contents)
            .map_err(|e| ExecError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if given, then apply environment overrides.
    pub fn load(config_file: Option<&Path>) -> ExecResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => EngineConfig::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        debug!("Engine configuration: {:?}", config);
        Ok(config)
    }

    /// Apply the `QPR_*` variables that are set and parse.
    pub fn merge_env(mut self) -> Self {
        if let Ok(v) = std::env::var("QPR_MAX_CLASSICAL") {
            if let Ok(val) = v.parse() {
                self.limits.max_classical = val;
            }
        }
        if let Ok(v) = std::env::var("QPR_MAX_QUANTUM") {
            if let Ok(val) = v.parse() {
                self.limits.max_quantum = val;
            }
        }
        if let Ok(v) = std::env::var("QPR_MAX_ACTIVATIONS") {
            if let Ok(val) = v.parse() {
                self.limits.max_activations = val;
            }
        }
        if let Ok(v) = std::env::var("QPR_SCHEDULE") {
            if let Ok(val) = v.parse() {
                self.schedule = val;
            }
        }
        if let Ok(v) = std::env::var("QPR_SEED") {
            if let Ok(val) = v.parse() {
                self.seed = val;
            }
        }
        self
    }

    /// Check that the limits allow a run at all.
    pub fn validate(&self) -> ExecResult<()> {
        if self.limits.max_activations == 0 {
            return Err(ExecError::Config(
                "max_activations must be at least 1 (main needs an activation)".into(),
            ));
        }
        if u32::try_from(self.limits.max_classical.saturating_add(self.limits.max_quantum)).is_err()
        {
            return Err(ExecError::Config(
                "max_classical + max_quantum must fit in 32 bits".into(),
            ));
        }
        Ok(())
    }

    /// Set the schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: SchedulePolicy) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the measurement seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.limits.max_classical, 1024);
        assert_eq!(config.limits.max_quantum, 64);
        assert_eq!(config.limits.max_activations, 10_000);
        assert_eq!(config.schedule, SchedulePolicy::InOrder);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "limits:\n  max_quantum: 2\nschedule:\n  random:\n    seed: 5\n";
        let config: EngineConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.limits.max_quantum, 2);
        assert_eq!(config.limits.max_classical, 1024);
        assert_eq!(config.schedule, SchedulePolicy::Random { seed: 5 });
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("qpr-config-{}.yaml", std::process::id()));
        std::fs::write(&path, "schedule: reverse_order\nseed: 11\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.schedule, SchedulePolicy::ReverseOrder);
        assert_eq!(config.seed, 11);

        assert!(matches!(
            EngineConfig::from_file("/nonexistent/qpr.yaml"),
            Err(ExecError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_activations() {
        let config = EngineConfig::default().with_limits(ResourceLimits {
            max_activations: 0,
            ..ResourceLimits::default()
        });
        assert!(config.validate().is_err());
    }
}
