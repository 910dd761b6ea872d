//! Graphviz DOT rendering of function graphs.

use petgraph::dot::Dot;
use petgraph::visit::EdgeRef;

use crate::catalog::Catalog;
use crate::function::Function;
use crate::node::{Node, NodeKind, OpSpec, Wire};
use crate::types::UNIT;

impl Function {
    /// Render the graph as a Graphviz `digraph`.
    ///
    /// Nodes are labelled with [`Node::display_name`] and wires with their
    /// ports and type. Quantum wires are blue, `unit` wires grey and D-node
    /// branch wires dashed; the catalog resolves each wire's type.
    pub fn to_dot(&self, catalog: &Catalog) -> String {
        Dot::with_attr_getters(
            self.graph(),
            &[],
            &|_, edge| wire_attrs(catalog, edge.weight()),
            &|_, (_, node)| node_attrs(node).to_string(),
        )
        .to_string()
    }
}

fn node_attrs(node: &Node) -> &'static str {
    match &node.kind {
        NodeKind::Initial => "shape=diamond style=filled fillcolor=orange",
        NodeKind::Final => "shape=diamond style=filled fillcolor=orangered",
        NodeKind::Decision(_) => "shape=hexagon color=green penwidth=3",
        NodeKind::Op(OpSpec::Call(_)) => "shape=ellipse fontcolor=darkorange4",
        NodeKind::Op(OpSpec::Builtin(_)) => "shape=box",
    }
}

fn wire_attrs(catalog: &Catalog, wire: &Wire) -> String {
    let mut attrs = Vec::new();
    if wire.ty == UNIT {
        attrs.push("color=grey");
    } else if catalog.ty(&wire.ty).is_ok_and(|t| t.is_quantum()) {
        attrs.push("color=blue");
    }
    if wire.branch.is_some() {
        attrs.push("style=dashed");
    }
    attrs.join(" ")
}
