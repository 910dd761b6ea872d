//! Error types for the IR crate.

use thiserror::Error;

use crate::node::NodeId;

/// Errors raised while registering catalog entries or building graphs.
///
/// Every variant is a construction-time failure: the offending registration,
/// wire, function, library or program is rejected and nothing is committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A type with this name is already registered.
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// A type's default value or default state is not a member of the type.
    #[error("Type '{ty}' has an invalid default: {reason}")]
    InvalidDefault {
        /// Name of the type.
        ty: String,
        /// What is wrong with the default.
        reason: String,
    },

    /// A node specifier with this name is already registered.
    #[error("Specifier '{0}' is already registered")]
    DuplicateSpecifier(String),

    /// No type with this name is registered.
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// No node specifier with this name is registered.
    #[error("Unknown specifier '{0}'")]
    UnknownSpecifier(String),

    /// The specifier exists but is of the wrong kind for the requested node.
    #[error("Specifier '{name}' cannot be used as {expected}")]
    SpecifierKind {
        /// Name of the specifier.
        name: String,
        /// What the caller tried to use it as.
        expected: &'static str,
    },

    /// Port types on either end of a connection differ.
    #[error("Type mismatch{}: expected '{expected}', found '{found}'", format_context(.context))]
    TypeMismatch {
        /// Where the mismatch was found.
        context: Option<String>,
        /// Type required by the receiving side.
        expected: String,
        /// Type offered by the sending side.
        found: String,
    },

    /// A node has no port with this name.
    #[error("Node {node:?} has no {direction} port '{port}'")]
    UnknownPort {
        /// The node that was addressed.
        node: NodeId,
        /// Either "input" or "output".
        direction: &'static str,
        /// The missing port name.
        port: String,
    },

    /// The node index does not exist in this function.
    #[error("Node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// A wire was attached to a node in a way the graph model forbids.
    #[error("Invalid wire: {0}")]
    InvalidWire(String),

    /// A quantum output port would be duplicated onto more than one wire.
    #[error("Quantum output '{port}' of node {node:?} already has a wire")]
    LinearityViolation {
        /// The source node.
        node: NodeId,
        /// The quantum output port.
        port: String,
    },

    /// A port mapping sends two source ports to the same target port.
    #[error("Port mapping is not injective: '{0}' is targeted twice")]
    NonInjectiveMapping(String),

    /// A quantum type was used where a copyable value is required.
    #[error("Type '{0}' is quantum and cannot be copied")]
    NotCopyable(String),

    /// An encoded writer was requested for a type without an output encoding.
    #[error("Type '{0}' has no output encoding")]
    MissingEncoding(String),

    /// A function failed its structural checks when sealed.
    #[error("Malformed function '{function}': {reason}")]
    MalformedFunction {
        /// Name of the function.
        function: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two functions share a name within one library.
    #[error("Function '{0}' is defined more than once")]
    DuplicateName(String),

    /// A call node names a function that is not in the library.
    #[error("Function '{callee}' called from '{caller}' is not defined")]
    UnknownFunction {
        /// The function containing the call node.
        caller: String,
        /// The missing callee.
        callee: String,
    },

    /// The library has no function named `main`.
    #[error("Program has no 'main' function")]
    MissingMain,
}

/// Helper function to format optional mismatch context.
#[allow(clippy::ref_option)]
fn format_context(context: &Option<String>) -> String {
    match context {
        Some(ctx) => format!(" ({ctx})"),
        None => String::new(),
    }
}

impl IrError {
    /// Build a [`IrError::TypeMismatch`] with context.
    pub fn mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        IrError::TypeMismatch {
            context: Some(context.into()),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Build a [`IrError::MalformedFunction`].
    pub fn malformed(function: impl Into<String>, reason: impl Into<String>) -> Self {
        IrError::MalformedFunction {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = IrError::mismatch("wire h.q -> m.q", "qubit", "bit");
        assert_eq!(
            err.to_string(),
            "Type mismatch (wire h.q -> m.q): expected 'qubit', found 'bit'"
        );
    }

    #[test]
    fn test_malformed_display() {
        let err = IrError::malformed("f", "two final nodes");
        assert_eq!(err.to_string(), "Malformed function 'f': two final nodes");
    }
}
