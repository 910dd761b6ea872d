//! Host-facing values and the result of a run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use uuid::Uuid;

use qpr_ir::ResourceRef;

use crate::error::RuntimeError;

/// Unique identifier of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value crossing the boundary between the host and `main`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostValue {
    /// A classical value. For a reference-typed port, the initial cell
    /// contents.
    Classical(u64),
    /// A quantum state vector.
    Quantum(Vec<Complex64>),
    /// A resource handle returned by `main`.
    Reference(ResourceRef),
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Classical(v) => write!(f, "{v}"),
            HostValue::Reference(r) => write!(f, "{r}"),
            HostValue::Quantum(amps) => {
                write!(f, "[")?;
                for (i, a) in amps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a:.4}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl FromStr for HostValue {
    type Err = String;

    /// Parse an unsigned integer or one of `|0>`, `|1>`, `|+>`, `|->`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        match s.trim() {
            "|0>" => Ok(HostValue::Quantum(vec![one, zero])),
            "|1>" => Ok(HostValue::Quantum(vec![zero, one])),
            "|+>" => Ok(HostValue::Quantum(vec![h, h])),
            "|->" => Ok(HostValue::Quantum(vec![h, -h])),
            other => other
                .parse()
                .map(HostValue::Classical)
                .map_err(|_| format!("'{s}' is neither an integer nor a basis state")),
        }
    }
}

impl From<u64> for HostValue {
    fn from(v: u64) -> Self {
        HostValue::Classical(v)
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// `main`'s final node fired.
    Success,
    /// The run aborted.
    RuntimeError(RuntimeError),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "Success"),
            RunStatus::RuntimeError(e) => write!(f, "RuntimeError: {e}"),
        }
    }
}

/// Counters collected during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Node firings.
    pub steps: u64,
    /// Activations created, `main` included.
    pub activations: u64,
    /// Deepest call nesting reached; `main` is depth 1.
    pub peak_depth: usize,
    /// Highest number of simultaneously live resources.
    pub peak_live_resources: usize,
    /// Successful allocations.
    pub allocations: u64,
    /// Resources still live when the run ended, released by the engine.
    pub released_at_exit: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// Terminal status.
    pub status: RunStatus,
    /// Output tape entries in append order.
    pub tape: Vec<Vec<u8>>,
    /// Values on `main`'s output ports. Empty unless the run succeeded.
    pub outputs: BTreeMap<String, HostValue>,
    /// Counters.
    pub stats: RunStats,
}

impl RunReport {
    /// Check if the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Success)
    }

    /// The runtime error, if the run aborted.
    pub fn error(&self) -> Option<&RuntimeError> {
        match &self.status {
            RunStatus::RuntimeError(e) => Some(e),
            RunStatus::Success => None,
        }
    }

    /// Tape entries decoded lossily as UTF-8.
    pub fn tape_strings(&self) -> Vec<String> {
        self.tape
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect()
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
