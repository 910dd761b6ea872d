//! Error types for the execution crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use qpr_ir::{NodeId, OperandError, ResourceRef};

/// The pools a run can exhaust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Classical cells.
    Classical,
    /// Quantum resources.
    Quantum,
    /// Live activation records.
    Activation,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Classical => write!(f, "classical"),
            ResourceKind::Quantum => write!(f, "quantum"),
            ResourceKind::Activation => write!(f, "activation"),
        }
    }
}

/// Errors from resource pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The pool for this kind is at capacity.
    #[error("No free {kind} capacity (limit: {capacity})")]
    Exhausted {
        /// Which pool.
        kind: ResourceKind,
        /// Its capacity.
        capacity: usize,
    },

    /// The handle does not name a live resource.
    #[error("Invalid reference {0}")]
    InvalidReference(ResourceRef),

    /// The handle names a resource of the other kind.
    #[error("Reference {reference} is not a {expected} resource")]
    WrongKind {
        /// The handle.
        reference: ResourceRef,
        /// Kind the operation needs.
        expected: ResourceKind,
    },

    /// No type with this name is registered.
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// Reference types name handles, not storage.
    #[error("Type '{0}' cannot be allocated")]
    NotAllocatable(String),

    /// A supplied state or value does not fit the type.
    #[error("Invalid state for '{ty}': {reason}")]
    InvalidState {
        /// The type.
        ty: String,
        /// What is wrong.
        reason: String,
    },
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors raised before a run starts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// A required input of `main` was not supplied.
    #[error("Missing input '{0}'")]
    MissingInput(String),

    /// An input was supplied for a port `main` does not have.
    #[error("Unexpected input '{0}'")]
    UnexpectedInput(String),

    /// An input value does not fit its port.
    #[error("Invalid input '{port}': {reason}")]
    InvalidInput {
        /// The port.
        port: String,
        /// What is wrong.
        reason: String,
    },

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for engine entry points.
pub type ExecResult<T> = Result<T, ExecError>;

/// Where a runtime error happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Function name.
    pub function: String,
    /// Node within the function.
    pub node: NodeId,
    /// Display name of the node.
    pub label: String,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.function, self.label)
    }
}

/// Fatal runtime conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RuntimeErrorKind {
    /// A pool is at capacity.
    #[error("Resource exhausted: no free {kind} capacity")]
    ResourceExhausted {
        /// Which pool.
        kind: ResourceKind,
    },

    /// A semantic function rejected its operands.
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// A handle was unknown or already freed.
    #[error("Invalid reference {0}")]
    InvalidReference(ResourceRef),

    /// Nothing can fire and `main` has not finished.
    #[error("Deadlock: no node is enabled")]
    Deadlock,
}

/// Terminal runtime failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}{}", format_site(.site))]
pub struct RuntimeError {
    /// What went wrong.
    pub kind: RuntimeErrorKind,
    /// Where, if known.
    pub site: Option<Site>,
}

/// Helper function to format an optional site.
#[allow(clippy::ref_option)]
fn format_site(site: &Option<Site>) -> String {
    match site {
        Some(s) => format!(" at {s}"),
        None => String::new(),
    }
}

impl RuntimeError {
    /// An error without a site.
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self { kind, site: None }
    }

    /// An invalid-operand error.
    pub fn operand(msg: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::InvalidOperand(msg.into()))
    }

    /// Attach a site unless one is already set.
    #[must_use]
    pub fn or_site(mut self, site: impl FnOnce() -> Site) -> Self {
        if self.site.is_none() {
            self.site = Some(site());
        }
        self
    }
}

impl From<ResourceError> for RuntimeError {
    fn from(err: ResourceError) -> Self {
        let kind = match err {
            ResourceError::Exhausted { kind, .. } => RuntimeErrorKind::ResourceExhausted { kind },
            ResourceError::InvalidReference(r) | ResourceError::WrongKind { reference: r, .. } => {
                RuntimeErrorKind::InvalidReference(r)
            }
            other => RuntimeErrorKind::InvalidOperand(other.to_string()),
        };
        Self::new(kind)
    }
}

impl From<OperandError> for RuntimeError {
    fn from(err: OperandError) -> Self {
        Self::operand(err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_mapping() {
        let err: RuntimeError = ResourceError::Exhausted {
            kind: ResourceKind::Quantum,
            capacity: 2,
        }
        .into();
        assert_eq!(
            err.kind,
            RuntimeErrorKind::ResourceExhausted {
                kind: ResourceKind::Quantum
            }
        );

        let r = ResourceRef {
            slot: 1,
            generation: 0,
        };
        let err: RuntimeError = ResourceError::InvalidReference(r).into();
        assert_eq!(err.kind, RuntimeErrorKind::InvalidReference(r));
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::operand("division by zero").or_site(|| Site {
            function: "f".into(),
            node: NodeId::new(4),
            label: "div".into(),
        });
        assert_eq!(err.to_string(), "Invalid operand: division by zero at f::div");
        assert_eq!(
            RuntimeError::new(RuntimeErrorKind::Deadlock).to_string(),
            "Deadlock: no node is enabled"
        );
    }
}
