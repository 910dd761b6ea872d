//! Nodes and wires of a function graph.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::program::FnId;
use crate::types::Signature;

/// Node index inside one function's graph.
pub type NodeId = NodeIndex<u32>;

/// Wire index inside one function's graph.
pub type WireId = EdgeIndex<u32>;

/// Port renaming used by D-node branches and call bijections.
pub type PortMap = BTreeMap<String, String>;

/// A node: its declared ports and what it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Optional human-readable identity, used in error sites and hazards.
    pub label: Option<String>,
    /// Input ports.
    pub inputs: Signature,
    /// Output ports. Empty for D-nodes and the final node.
    pub outputs: Signature,
    /// Node kind.
    pub kind: NodeKind,
}

impl Node {
    /// Check if this is the function's initial node.
    #[inline]
    pub fn is_initial(&self) -> bool {
        matches!(self.kind, NodeKind::Initial)
    }

    /// Check if this is the function's final node.
    #[inline]
    pub fn is_final(&self) -> bool {
        matches!(self.kind, NodeKind::Final)
    }

    /// Check if this is a D-node.
    #[inline]
    pub fn is_decision(&self) -> bool {
        matches!(self.kind, NodeKind::Decision(_))
    }

    /// Get the call spec if this is a call node.
    pub fn call(&self) -> Option<&CallSpec> {
        match &self.kind {
            NodeKind::Op(OpSpec::Call(call)) => Some(call),
            _ => None,
        }
    }

    /// Get the decision spec if this is a D-node.
    pub fn decision(&self) -> Option<&DecisionSpec> {
        match &self.kind {
            NodeKind::Decision(d) => Some(d),
            _ => None,
        }
    }

    /// A short name for logs: the label, else the specifier or callee.
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.kind {
            NodeKind::Initial => "initial".into(),
            NodeKind::Final => "final".into(),
            NodeKind::Op(OpSpec::Builtin(name)) => name.clone(),
            NodeKind::Op(OpSpec::Call(call)) => format!("call {}", call.callee),
            NodeKind::Decision(d) => d.specifier.clone(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Function entry: no inputs, outputs are the function's inputs.
    Initial,
    /// Function exit: inputs are the function's outputs, no outputs.
    Final,
    /// F-node.
    Op(OpSpec),
    /// D-node.
    Decision(DecisionSpec),
}

/// What an F-node computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpSpec {
    /// A catalog specifier by name.
    Builtin(String),
    /// A call into another library function.
    Call(CallSpec),
}

/// A call node's target and port bijections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSpec {
    /// The called function.
    pub callee: FnId,
    /// Call-node input port to callee input port.
    pub input_map: PortMap,
    /// Callee output port to call-node output port.
    pub output_map: PortMap,
}

/// A D-node's specifier and branch table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSpec {
    /// Name of the decision specifier in the catalog.
    pub specifier: String,
    /// Branches, indexed by the value the decision returns.
    pub branches: Vec<Branch>,
}

/// One outcome of a D-node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Node that receives the forwarded values.
    pub target: NodeId,
    /// Injective map from D-node input port to target input port.
    pub mapping: PortMap,
}

/// The result of evaluating a D-node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Forward the mapped inputs to `target`.
    Fire {
        /// Branch index chosen.
        branch: usize,
        /// Node receiving the tokens.
        target: NodeId,
        /// Port mapping applied.
        mapping: &'a PortMap,
    },
}

impl DecisionSpec {
    /// Turn a branch index into a [`Decision`].
    pub fn select(&self, branch: usize) -> Option<Decision<'_>> {
        self.branches.get(branch).map(|b| Decision::Fire {
            branch,
            target: b.target,
            mapping: &b.mapping,
        })
    }
}

/// A typed connection between an output port and an input port.
///
/// Wires leaving a D-node start at one of its *input* ports (the value is
/// forwarded) and belong to exactly one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// Port on the source node.
    pub source_port: String,
    /// Port on the target node.
    pub target_port: String,
    /// Type name shared by both ports.
    pub ty: String,
    /// Owning branch for D-node wires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<usize>,
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.source_port, self.target_port, self.ty)?;
        if let Some(branch) = self.branch {
            write!(f, " [branch {branch}]")?;
        }
        Ok(())
    }
}
