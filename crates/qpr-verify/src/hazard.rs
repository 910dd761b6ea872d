//! Hazard reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use qpr_ir::NodeId;

/// Classification of a join site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// A port may stay empty while the node is still needed.
    Hang,
    /// Two producers of one port may both fire in the same run.
    Race,
    /// The analysis gave up (cycle or bound exceeded).
    Unresolved,
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardKind::Hang => write!(f, "hang"),
            HazardKind::Race => write!(f, "race"),
            HazardKind::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// One flagged input port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hazard {
    /// Function containing the site.
    pub function: String,
    /// The join node.
    pub node: NodeId,
    /// Display name of the node.
    pub label: String,
    /// The input port.
    pub port: String,
    /// Classification.
    pub kind: HazardKind,
    /// Human-readable explanation.
    pub detail: String,
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}::{}.{}: {}",
            self.kind, self.function, self.label, self.port, self.detail
        )
    }
}

/// Outcome of validating a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// No hazards found.
    Ok,
    /// Hazards, sorted by function, node, port and kind.
    Warnings(Vec<Hazard>),
}

impl Verdict {
    /// Check if no hazards were found.
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }

    /// The hazards found (empty for `Ok`).
    pub fn hazards(&self) -> &[Hazard] {
        match self {
            Verdict::Ok => &[],
            Verdict::Warnings(h) => h,
        }
    }

    /// Check if any hazard has the given kind.
    pub fn has(&self, kind: HazardKind) -> bool {
        self.hazards().iter().any(|h| h.kind == kind)
    }
}
