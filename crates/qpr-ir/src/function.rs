//! Function graphs: construction and the sealed, immutable form.

use std::collections::BTreeSet;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::{IrError, IrResult};
use crate::node::{Branch, CallSpec, DecisionSpec, Node, NodeId, NodeKind, OpSpec, PortMap, Wire, WireId};
use crate::program::FnId;
use crate::types::Signature;

/// Wires terminating on one input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortWires {
    /// The input port.
    pub port: String,
    /// Candidate producers, in wire order.
    pub wires: Vec<WireId>,
}

/// Incremental builder for a [`Function`].
///
/// Every mutating call validates first and commits only on success, so a
/// rejected node, wire or branch leaves the builder unchanged.
#[derive(Debug)]
pub struct FunctionBuilder {
    catalog: Arc<Catalog>,
    name: String,
    graph: DiGraph<Node, Wire, u32>,
    initial: NodeId,
    final_node: NodeId,
}

impl FunctionBuilder {
    /// Start a function. Empty signatures get an implicit `unit` port.
    pub fn new(
        catalog: Arc<Catalog>,
        name: impl Into<String>,
        inputs: Signature,
        outputs: Signature,
    ) -> IrResult<Self> {
        let inputs = inputs.or_unit();
        let outputs = outputs.or_unit();
        for (_, ty) in inputs.iter().chain(outputs.iter()) {
            catalog.ty(ty)?;
        }

        let mut graph = DiGraph::default();
        let initial = graph.add_node(Node {
            label: Some("initial".into()),
            inputs: Signature::new(),
            outputs: inputs,
            kind: NodeKind::Initial,
        });
        let final_node = graph.add_node(Node {
            label: Some("final".into()),
            inputs: outputs,
            outputs: Signature::new(),
            kind: NodeKind::Final,
        });

        Ok(Self {
            catalog,
            name: name.into(),
            graph,
            initial,
            final_node,
        })
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The initial node.
    pub fn initial(&self) -> NodeId {
        self.initial
    }

    /// The final node.
    pub fn final_node(&self) -> NodeId {
        self.final_node
    }

    /// Add a node for a catalog specifier.
    ///
    /// Decision specifiers produce a D-node with an empty branch table;
    /// fill it with [`FunctionBuilder::add_branch`].
    pub fn add_node(&mut self, specifier: &str) -> IrResult<NodeId> {
        let spec = self.catalog.specifier(specifier)?;
        let kind = if spec.is_decision() {
            NodeKind::Decision(DecisionSpec {
                specifier: spec.name.clone(),
                branches: Vec::new(),
            })
        } else {
            NodeKind::Op(OpSpec::Builtin(spec.name.clone()))
        };
        let node = Node {
            label: None,
            inputs: spec.inputs.clone(),
            outputs: spec.outputs.clone(),
            kind,
        };
        Ok(self.graph.add_node(node))
    }

    /// Add a node and give it a label.
    pub fn add_labeled(&mut self, specifier: &str, label: impl Into<String>) -> IrResult<NodeId> {
        let id = self.add_node(specifier)?;
        self.graph[id].label = Some(label.into());
        Ok(id)
    }

    /// Add a call node whose ports have the same names as the callee's.
    pub fn add_call(
        &mut self,
        callee: impl Into<FnId>,
        inputs: Signature,
        outputs: Signature,
    ) -> IrResult<NodeId> {
        let inputs = inputs.or_unit();
        let outputs = outputs.or_unit();
        let input_map = inputs.ports().map(|p| (p.to_string(), p.to_string())).collect();
        let output_map = outputs.ports().map(|p| (p.to_string(), p.to_string())).collect();
        self.add_call_mapped(callee, inputs, outputs, input_map, output_map)
    }

    /// Add a call node with explicit port bijections.
    ///
    /// `input_map` sends call-node inputs to callee inputs; `output_map`
    /// sends callee outputs to call-node outputs. The bijections are checked
    /// against the callee when the library is built.
    pub fn add_call_mapped(
        &mut self,
        callee: impl Into<FnId>,
        inputs: Signature,
        outputs: Signature,
        input_map: PortMap,
        output_map: PortMap,
    ) -> IrResult<NodeId> {
        let inputs = inputs.or_unit();
        let outputs = outputs.or_unit();
        for (_, ty) in inputs.iter().chain(outputs.iter()) {
            self.catalog.ty(ty)?;
        }
        let node = Node {
            label: None,
            inputs,
            outputs,
            kind: NodeKind::Op(OpSpec::Call(CallSpec {
                callee: callee.into(),
                input_map,
                output_map,
            })),
        };
        Ok(self.graph.add_node(node))
    }

    /// Connect an output port to an input port.
    ///
    /// Fails with `TypeMismatch` unless both ports have the same type, and
    /// with `LinearityViolation` if a quantum output already has a wire.
    pub fn add_wire(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> IrResult<WireId> {
        let src = self.node(source)?;
        let dst = self.node(target)?;

        if src.is_decision() {
            return Err(IrError::InvalidWire(format!(
                "node {} is a D-node; its outputs are declared with add_branch",
                src.display_name()
            )));
        }
        if dst.is_initial() {
            return Err(IrError::InvalidWire("the initial node has no inputs".into()));
        }

        let src_ty = src.outputs.get(source_port).ok_or_else(|| IrError::UnknownPort {
            node: source,
            direction: "output",
            port: source_port.to_string(),
        })?;
        let dst_ty = dst.inputs.get(target_port).ok_or_else(|| IrError::UnknownPort {
            node: target,
            direction: "input",
            port: target_port.to_string(),
        })?;
        if src_ty != dst_ty {
            return Err(IrError::mismatch(
                format!(
                    "wire {}.{source_port} -> {}.{target_port}",
                    src.display_name(),
                    dst.display_name()
                ),
                dst_ty,
                src_ty,
            ));
        }

        let existing = self.output_wires(source, source_port);
        if self.catalog.ty(src_ty)?.is_quantum() && !existing.is_empty() {
            return Err(IrError::LinearityViolation {
                node: source,
                port: source_port.to_string(),
            });
        }
        let duplicate = existing.iter().any(|&w| {
            self.graph.edge_endpoints(w).map(|(_, t)| t) == Some(target)
                && self.graph[w].target_port == target_port
        });
        if duplicate {
            return Err(IrError::InvalidWire(format!(
                "{}.{source_port} is already wired to {}.{target_port}",
                src.display_name(),
                dst.display_name()
            )));
        }

        let wire = Wire {
            source_port: source_port.to_string(),
            target_port: target_port.to_string(),
            ty: src_ty.to_string(),
            branch: None,
        };
        Ok(self.graph.add_edge(source, target, wire))
    }

    /// Append a branch to a D-node's table and create its wires.
    ///
    /// `mapping` pairs D-node input ports with `target` input ports. It must
    /// be non-empty and injective, types must match, and every quantum
    /// input of the D-node must be forwarded. Returns the branch index.
    pub fn add_branch<'a>(
        &mut self,
        decision: NodeId,
        target: NodeId,
        mapping: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> IrResult<usize> {
        let mapping: PortMap = mapping
            .into_iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect();
        let dnode = self.node(decision)?;
        let dst = self.node(target)?;

        let Some(spec) = dnode.decision() else {
            return Err(IrError::SpecifierKind {
                name: dnode.display_name(),
                expected: "a D-node",
            });
        };
        if dst.is_initial() {
            return Err(IrError::InvalidWire("the initial node has no inputs".into()));
        }
        let declared = self
            .catalog
            .specifier(&spec.specifier)?
            .branch_count()
            .unwrap_or(0);
        if spec.branches.len() >= declared {
            return Err(IrError::InvalidWire(format!(
                "D-node {} already has all {declared} branches",
                dnode.display_name()
            )));
        }
        if mapping.is_empty() {
            return Err(IrError::InvalidWire(format!(
                "branch {} of {} forwards nothing",
                spec.branches.len(),
                dnode.display_name()
            )));
        }

        let mut seen = BTreeSet::new();
        for (from, to) in &mapping {
            let from_ty = dnode.inputs.get(from).ok_or_else(|| IrError::UnknownPort {
                node: decision,
                direction: "input",
                port: from.clone(),
            })?;
            let to_ty = dst.inputs.get(to).ok_or_else(|| IrError::UnknownPort {
                node: target,
                direction: "input",
                port: to.clone(),
            })?;
            if from_ty != to_ty {
                return Err(IrError::mismatch(
                    format!(
                        "branch {}.{from} -> {}.{to}",
                        dnode.display_name(),
                        dst.display_name()
                    ),
                    to_ty,
                    from_ty,
                ));
            }
            if !seen.insert(to.as_str()) {
                return Err(IrError::NonInjectiveMapping(to.clone()));
            }
        }
        for (port, ty) in dnode.inputs.iter() {
            if self.catalog.ty(ty)?.is_quantum() && !mapping.contains_key(port) {
                return Err(IrError::LinearityViolation {
                    node: decision,
                    port: port.to_string(),
                });
            }
        }

        let index = spec.branches.len();
        let wires: Vec<Wire> = mapping
            .iter()
            .map(|(from, to)| Wire {
                source_port: from.clone(),
                target_port: to.clone(),
                ty: dnode.inputs.get(from).unwrap_or_default().to_string(),
                branch: Some(index),
            })
            .collect();
        for wire in wires {
            self.graph.add_edge(decision, target, wire);
        }
        if let NodeKind::Decision(spec) = &mut self.graph[decision].kind {
            spec.branches.push(Branch { target, mapping });
        }
        Ok(index)
    }

    /// Check structure and freeze the function.
    pub fn seal(self) -> IrResult<Function> {
        let initials = self.graph.node_weights().filter(|n| n.is_initial()).count();
        let finals = self.graph.node_weights().filter(|n| n.is_final()).count();
        if initials != 1 || finals != 1 {
            return Err(IrError::malformed(
                &self.name,
                format!("expected one initial and one final node, found {initials} and {finals}"),
            ));
        }

        let mut inbound = Vec::with_capacity(self.graph.node_count());
        let mut outbound = Vec::with_capacity(self.graph.node_count());

        for id in self.graph.node_indices() {
            let node = &self.graph[id];

            let mut ports = Vec::with_capacity(node.inputs.len());
            for port in node.inputs.ports() {
                let mut wires: Vec<WireId> = self
                    .graph
                    .edges_directed(id, Direction::Incoming)
                    .filter(|e| e.weight().target_port == port)
                    .map(|e| e.id())
                    .collect();
                if wires.is_empty() {
                    return Err(IrError::malformed(
                        &self.name,
                        format!("input port '{port}' of {} is not wired", node.display_name()),
                    ));
                }
                wires.sort_unstable();
                ports.push(PortWires {
                    port: port.to_string(),
                    wires,
                });
            }
            inbound.push(ports);

            let mut out: Vec<WireId> = self
                .graph
                .edges_directed(id, Direction::Outgoing)
                .map(|e| e.id())
                .collect();
            out.sort_unstable();
            if out.is_empty() && !node.is_final() {
                return Err(IrError::malformed(
                    &self.name,
                    format!("{} has no outgoing wires", node.display_name()),
                ));
            }
            for (port, ty) in node.outputs.iter() {
                let wired = out.iter().any(|&w| self.graph[w].source_port == port);
                if !wired && self.catalog.ty(ty)?.is_quantum() {
                    return Err(IrError::malformed(
                        &self.name,
                        format!(
                            "quantum output '{port}' of {} is dropped",
                            node.display_name()
                        ),
                    ));
                }
            }
            outbound.push(out);

            if let Some(spec) = node.decision() {
                let declared = self
                    .catalog
                    .specifier(&spec.specifier)?
                    .branch_count()
                    .unwrap_or(0);
                if spec.branches.len() != declared {
                    return Err(IrError::malformed(
                        &self.name,
                        format!(
                            "D-node {} has {} of {declared} branches",
                            node.display_name(),
                            spec.branches.len()
                        ),
                    ));
                }
            }
        }

        debug!(
            "Sealed function {}: {} nodes, {} wires",
            self.name,
            self.graph.node_count(),
            self.graph.edge_count()
        );

        Ok(Function {
            name: self.name,
            graph: self.graph,
            initial: self.initial,
            final_node: self.final_node,
            inbound,
            outbound,
        })
    }

    fn node(&self, id: NodeId) -> IrResult<&Node> {
        self.graph.node_weight(id).ok_or(IrError::UnknownNode(id))
    }

    fn output_wires(&self, node: NodeId, port: &str) -> Vec<WireId> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .filter(|e| e.weight().source_port == port)
            .map(|e| e.id())
            .collect()
    }
}

/// A sealed function graph.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    graph: DiGraph<Node, Wire, u32>,
    initial: NodeId,
    final_node: NodeId,
    /// Per node: wires grouped by input port, ports in name order.
    inbound: Vec<Vec<PortWires>>,
    /// Per node: outgoing wires in index order.
    outbound: Vec<Vec<WireId>>,
}

impl Function {
    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input signature (the initial node's outputs).
    pub fn inputs(&self) -> &Signature {
        &self.graph[self.initial].outputs
    }

    /// Output signature (the final node's inputs).
    pub fn outputs(&self) -> &Signature {
        &self.graph[self.final_node].inputs
    }

    /// The initial node.
    pub fn initial(&self) -> NodeId {
        self.initial
    }

    /// The final node.
    pub fn final_node(&self) -> NodeId {
        self.final_node
    }

    /// Get a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id)
    }

    /// Iterate nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of wires.
    pub fn wire_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get a wire.
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.graph.edge_weight(id)
    }

    /// Source and target of a wire.
    pub fn endpoints(&self, id: WireId) -> Option<(NodeId, NodeId)> {
        self.graph.edge_endpoints(id)
    }

    /// Iterate wires as `(id, source, target, wire)`.
    pub fn wires(&self) -> impl Iterator<Item = (WireId, NodeId, NodeId, &Wire)> {
        self.graph
            .edge_references()
            .map(|e| (e.id(), e.source(), e.target(), e.weight()))
    }

    /// Inbound wires of a node grouped by input port.
    pub fn inbound(&self, id: NodeId) -> &[PortWires] {
        self.inbound.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Outbound wires of a node.
    pub fn outbound(&self, id: NodeId) -> &[WireId] {
        self.outbound.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// The underlying graph, for analyses.
    pub fn graph(&self) -> &DiGraph<Node, Wire, u32> {
        &self.graph
    }

    /// Call nodes and their callees.
    pub fn calls(&self) -> impl Iterator<Item = (NodeId, &CallSpec)> {
        self.nodes().filter_map(|(id, n)| n.call().map(|c| (id, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ports;
    use crate::types::{BIT, QUBIT, Type};

    fn catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::standard().unwrap();
        catalog.register_type(Type::uint("u8", 8)).unwrap();
        catalog
            .register_decision("is_zero", Signature::single("n", "u8"), 2, |v| {
                Ok(usize::from(v.word("n")? != 0))
            })
            .unwrap();
        catalog
            .register_literal_writer("write_zero", "u8", b"zero".to_vec())
            .unwrap();
        Arc::new(catalog)
    }

    /// q -> h -> measure -> (q -> final.q, outcome -> final.b)
    fn bell_half() -> FunctionBuilder {
        let mut f = FunctionBuilder::new(
            catalog(),
            "main",
            Signature::single("q", QUBIT),
            Signature::new().with("q", QUBIT).with("b", BIT),
        )
        .unwrap();
        let h = f.add_node("h").unwrap();
        let m = f.add_node("measure").unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        f.add_wire(init, "q", h, ports::QUBIT).unwrap();
        f.add_wire(h, ports::QUBIT, m, ports::QUBIT).unwrap();
        f.add_wire(m, ports::QUBIT, fin, "q").unwrap();
        f.add_wire(m, ports::OUTCOME, fin, "b").unwrap();
        f
    }

    #[test]
    fn test_seal_simple_function() {
        let func = bell_half().seal().unwrap();
        assert_eq!(func.node_count(), 4);
        assert_eq!(func.wire_count(), 4);
        assert_eq!(func.inputs().get("q"), Some(QUBIT));
        assert_eq!(func.outputs().len(), 2);

        for (_, src, dst, wire) in func.wires() {
            let s = func.node(src).unwrap();
            let d = func.node(dst).unwrap();
            assert_eq!(s.outputs.get(&wire.source_port), Some(wire.ty.as_str()));
            assert_eq!(d.inputs.get(&wire.target_port), Some(wire.ty.as_str()));
        }
    }

    #[test]
    fn test_wire_type_mismatch_is_not_committed() {
        let mut f = bell_half();
        let before = f.graph.edge_count();
        let x = f.add_node("x").unwrap();
        let err = f.add_wire(f.initial(), "q", x, ports::QUBIT).unwrap_err();
        // initial.q already feeds h.q
        assert!(matches!(err, IrError::LinearityViolation { .. }));

        let w = f.add_node("write_bit").unwrap();
        let err = f.add_wire(x, ports::QUBIT, w, ports::VALUE).unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
        assert_eq!(f.graph.edge_count(), before);
    }

    #[test]
    fn test_unknown_port() {
        let mut f = bell_half();
        let h = f.add_node("h").unwrap();
        let err = f.add_wire(f.initial(), "nope", h, ports::QUBIT).unwrap_err();
        assert!(matches!(err, IrError::UnknownPort { direction: "output", .. }));
    }

    #[test]
    fn test_dangling_input_is_malformed() {
        let f = FunctionBuilder::new(catalog(), "f", Signature::new(), Signature::new()).unwrap();
        let err = f.seal().unwrap_err();
        assert!(matches!(err, IrError::MalformedFunction { .. }));
    }

    #[test]
    fn test_dropped_qubit_is_malformed() {
        let mut f = FunctionBuilder::new(
            catalog(),
            "f",
            Signature::single("q", QUBIT),
            Signature::single("b", BIT),
        )
        .unwrap();
        let m = f.add_node("measure").unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        f.add_wire(init, "q", m, ports::QUBIT).unwrap();
        f.add_wire(m, ports::OUTCOME, fin, "b").unwrap();
        let err = f.seal().unwrap_err();
        assert!(err.to_string().contains("dropped"));
    }

    #[test]
    fn test_branch_rules() {
        let mut f = FunctionBuilder::new(
            catalog(),
            "main",
            Signature::single("n", "u8"),
            Signature::new(),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let d = f.add_node("is_zero").unwrap();
        let w = f.add_node("write_zero").unwrap();
        f.add_wire(init, "n", d, "n").unwrap();

        assert!(matches!(
            f.add_wire(d, "n", w, ports::TRIGGER),
            Err(IrError::InvalidWire(_))
        ));
        assert!(matches!(
            f.add_branch(d, fin, [("n", "unit")]),
            Err(IrError::TypeMismatch { .. })
        ));

        assert_eq!(f.add_branch(d, w, [("n", ports::TRIGGER)]).unwrap(), 0);
        f.add_wire(w, ports::UNIT, fin, "unit").unwrap();

        // Only one of two branches declared.
        let err = f.seal().unwrap_err();
        assert!(err.to_string().contains("1 of 2 branches"));
    }

    #[test]
    fn test_non_injective_branch() {
        let cat = catalog();
        let mut cat = (*cat).clone();
        cat.register_decision(
            "pick",
            Signature::new().with("a", "u8").with("b", "u8"),
            1,
            |_| Ok(0),
        )
        .unwrap();
        let mut f = FunctionBuilder::new(
            Arc::new(cat),
            "g",
            Signature::new().with("a", "u8").with("b", "u8"),
            Signature::single("n", "u8"),
        )
        .unwrap();
        let d = f.add_node("pick").unwrap();
        let fin = f.final_node();
        let err = f.add_branch(d, fin, [("a", "n"), ("b", "n")]).unwrap_err();
        assert_eq!(err, IrError::NonInjectiveMapping("n".into()));
    }

    #[test]
    fn test_inbound_grouping() {
        let func = bell_half().seal().unwrap();
        let ports: Vec<&str> = func
            .inbound(func.final_node())
            .iter()
            .map(|p| p.port.as_str())
            .collect();
        assert_eq!(ports, vec!["b", "q"]);
        assert!(func.inbound(func.initial()).is_empty());
        assert_eq!(func.outbound(func.final_node()).len(), 0);
    }
}
