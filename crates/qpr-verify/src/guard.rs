//! Firing guards: which D-node branch choices let a node or wire fire.
//!
//! A guard is a disjunction of [`Term`]s; a term fixes the branch taken by
//! some D-nodes. Guards are computed once per function in topological order.
//! Nodes in a cycle get [`Guard::Unknown`], as does anything whose guard
//! would exceed the configured term budget.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{dominators, tarjan_scc};
use petgraph::visit::Reversed;
use rustc_hash::FxHashSet;
use tracing::debug;

use qpr_ir::{Function, NodeId, PortWires, WireId};

use crate::config::ValidatorConfig;

/// A conjunction of branch choices, at most one per D-node.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(BTreeMap<NodeId, usize>);

impl Term {
    /// The empty conjunction.
    pub fn top() -> Self {
        Self::default()
    }

    /// A single choice.
    pub fn literal(decision: NodeId, branch: usize) -> Self {
        Self(BTreeMap::from([(decision, branch)]))
    }

    /// Conjoin two terms. `None` if they pick different branches of one D-node.
    pub fn and(&self, other: &Term) -> Option<Term> {
        let mut out = self.0.clone();
        for (&d, &b) in &other.0 {
            match out.insert(d, b) {
                Some(prev) if prev != b => return None,
                _ => {}
            }
        }
        Some(Term(out))
    }

    /// Check if every choice in `self` also appears in `other`.
    fn implied_by(&self, other: &Term) -> bool {
        self.0.iter().all(|(d, b)| other.0.get(d) == Some(b))
    }

    /// Evaluate under a full assignment of branch choices.
    pub fn holds(&self, assignment: &BTreeMap<NodeId, usize>) -> bool {
        self.0.iter().all(|(d, b)| assignment.get(d) == Some(b))
    }

    /// D-nodes mentioned.
    pub fn decisions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.keys().copied()
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the empty conjunction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Condition under which something fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Disjunction of terms; empty means never.
    Dnf(Vec<Term>),
    /// The analysis could not decide.
    Unknown,
}

impl Guard {
    /// Fires unconditionally.
    pub fn always() -> Self {
        Guard::Dnf(vec![Term::top()])
    }

    /// Never fires.
    pub fn never() -> Self {
        Guard::Dnf(Vec::new())
    }

    /// Check if the analysis gave up.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Guard::Unknown)
    }

    /// `Some(true)` if some choice of branches makes this fire.
    pub fn is_satisfiable(&self) -> Option<bool> {
        match self {
            Guard::Dnf(terms) => Some(!terms.is_empty()),
            Guard::Unknown => None,
        }
    }

    /// Check if this guard holds for every choice of branches.
    pub fn is_always(&self) -> bool {
        matches!(self, Guard::Dnf(terms) if terms.iter().any(Term::is_empty))
    }

    /// Conjunction, capped at `limit` terms.
    pub fn and(&self, other: &Guard, limit: usize) -> Guard {
        let (Guard::Dnf(a), Guard::Dnf(b)) = (self, other) else {
            return Guard::Unknown;
        };
        let mut terms = Vec::with_capacity(a.len() * b.len());
        for x in a {
            for y in b {
                if let Some(t) = x.and(y) {
                    terms.push(t);
                }
            }
        }
        normalize(terms, limit)
    }

    /// Disjunction, capped at `limit` terms.
    pub fn or(&self, other: &Guard, limit: usize) -> Guard {
        let (Guard::Dnf(a), Guard::Dnf(b)) = (self, other) else {
            return Guard::Unknown;
        };
        normalize(a.iter().chain(b).cloned().collect(), limit)
    }

    /// Evaluate under a full assignment.
    pub fn holds(&self, assignment: &BTreeMap<NodeId, usize>) -> Option<bool> {
        match self {
            Guard::Dnf(terms) => Some(terms.iter().any(|t| t.holds(assignment))),
            Guard::Unknown => None,
        }
    }

    /// D-nodes mentioned.
    pub fn decisions(&self) -> BTreeSet<NodeId> {
        match self {
            Guard::Dnf(terms) => terms.iter().flat_map(Term::decisions).collect(),
            Guard::Unknown => BTreeSet::new(),
        }
    }
}

/// Sort, deduplicate and drop terms implied by a weaker term.
fn normalize(mut terms: Vec<Term>, limit: usize) -> Guard {
    terms.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    terms.dedup();
    let mut kept: Vec<Term> = Vec::with_capacity(terms.len());
    for t in terms {
        if !kept.iter().any(|k| k.implied_by(&t)) {
            kept.push(t);
        }
    }
    if kept.len() > limit {
        return Guard::Unknown;
    }
    kept.sort();
    Guard::Dnf(kept)
}

/// Per-function analysis results shared by all checks.
#[derive(Debug)]
pub struct GuardAnalysis {
    nodes: Vec<Guard>,
    wires: Vec<Guard>,
    branches: BTreeMap<NodeId, usize>,
    required: FxHashSet<NodeId>,
    max_terms: usize,
}

impl GuardAnalysis {
    /// Analyze a sealed function.
    pub fn new(function: &Function, config: &ValidatorConfig) -> Self {
        let graph = function.graph();
        let limit = config.max_terms;
        let mut nodes = vec![Guard::never(); graph.node_count()];
        let mut wires = vec![Guard::never(); graph.edge_count()];

        let branches = function
            .nodes()
            .filter_map(|(id, n)| n.decision().map(|d| (id, d.branches.len())))
            .collect();

        // tarjan_scc yields components in reverse topological order.
        for scc in tarjan_scc(graph).into_iter().rev() {
            let cyclic = scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some();
            for &id in &scc {
                let guard = if cyclic {
                    Guard::Unknown
                } else if id == function.initial() {
                    Guard::always()
                } else {
                    function
                        .inbound(id)
                        .iter()
                        .fold(Guard::always(), |acc, port| {
                            acc.and(&port_guard(&wires, port, limit), limit)
                        })
                };
                for &w in function.outbound(id) {
                    let branch = function.wire(w).and_then(|wire| wire.branch);
                    wires[w.index()] = match branch {
                        Some(b) => guard.and(&Guard::Dnf(vec![Term::literal(id, b)]), limit),
                        None => guard.clone(),
                    };
                }
                nodes[id.index()] = guard;
            }
        }

        // Nodes every path from the initial node to the final node runs through.
        let post = dominators::simple_fast(Reversed(graph), function.final_node());
        let required: FxHashSet<NodeId> = post
            .dominators(function.initial())
            .map(|it| it.collect())
            .unwrap_or_default();

        debug!(
            "Guard analysis of {}: {} unknown nodes, {} required",
            function.name(),
            nodes.iter().filter(|g| g.is_unknown()).count(),
            required.len()
        );

        Self {
            nodes,
            wires,
            branches,
            required,
            max_terms: limit,
        }
    }

    /// Guard of a node.
    pub fn node_guard(&self, id: NodeId) -> &Guard {
        &self.nodes[id.index()]
    }

    /// Guard of a wire carrying a token.
    pub fn wire_guard(&self, id: WireId) -> &Guard {
        &self.wires[id.index()]
    }

    /// Guard of an input port receiving at least one token.
    pub fn port_guard(&self, port: &PortWires) -> Guard {
        port_guard(&self.wires, port, self.max_terms)
    }

    /// Number of branches of a D-node.
    pub fn branch_count(&self, decision: NodeId) -> usize {
        self.branches.get(&decision).copied().unwrap_or(1)
    }

    /// Check if the node lies on every path from the initial to the final
    /// node, so the function cannot complete without it firing.
    pub fn is_required(&self, id: NodeId) -> bool {
        self.required.contains(&id)
    }

    /// The term budget.
    pub fn max_terms(&self) -> usize {
        self.max_terms
    }
}

fn port_guard(wires: &[Guard], port: &PortWires, limit: usize) -> Guard {
    port.wires
        .iter()
        .fold(Guard::never(), |acc, w| acc.or(&wires[w.index()], limit))
}

/// Search for branch choices where `need` holds and `have` does not.
///
/// Returns `None` if the search space exceeds `max_assignments`.
pub fn find_gap(
    analysis: &GuardAnalysis,
    need: &Guard,
    have: &Guard,
    max_assignments: usize,
) -> Option<Option<BTreeMap<NodeId, usize>>> {
    if need.is_unknown() || have.is_unknown() {
        return None;
    }
    let vars: Vec<NodeId> = need.decisions().union(&have.decisions()).copied().collect();
    let sizes: Vec<usize> = vars.iter().map(|&d| analysis.branch_count(d).max(1)).collect();

    let mut total: usize = 1;
    for &s in &sizes {
        total = total.checked_mul(s)?;
        if total > max_assignments {
            return None;
        }
    }

    let mut digits = vec![0usize; vars.len()];
    for _ in 0..total {
        let assignment: BTreeMap<NodeId, usize> =
            vars.iter().copied().zip(digits.iter().copied()).collect();
        if need.holds(&assignment) == Some(true) && have.holds(&assignment) == Some(false) {
            return Some(Some(assignment));
        }
        for (digit, &size) in digits.iter_mut().zip(&sizes) {
            *digit += 1;
            if *digit < size {
                break;
            }
            *digit = 0;
        }
    }
    Some(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(i: u32) -> NodeId {
        NodeId::new(i as usize)
    }

    #[test]
    fn test_term_conflict() {
        let a = Term::literal(d(1), 0);
        let b = Term::literal(d(1), 1);
        let c = Term::literal(d(2), 0);
        assert!(a.and(&b).is_none());
        assert_eq!(a.and(&c).unwrap().len(), 2);
    }

    #[test]
    fn test_guard_absorption() {
        let x = Guard::Dnf(vec![Term::literal(d(1), 0)]);
        let xy = x.and(&Guard::Dnf(vec![Term::literal(d(2), 1)]), 16);
        assert_eq!(x.or(&xy, 16), x);
        assert!(x.or(&Guard::always(), 16).is_always());
    }

    #[test]
    fn test_exclusive_branches_unsatisfiable() {
        let a = Guard::Dnf(vec![Term::literal(d(1), 0)]);
        let b = Guard::Dnf(vec![Term::literal(d(1), 1)]);
        assert_eq!(a.and(&b, 16).is_satisfiable(), Some(false));
        assert_eq!(a.or(&b, 16).is_satisfiable(), Some(true));
    }

    #[test]
    fn test_term_limit_gives_unknown() {
        let a = Guard::Dnf(vec![Term::literal(d(1), 0), Term::literal(d(1), 1)]);
        let b = Guard::Dnf(vec![Term::literal(d(2), 0), Term::literal(d(2), 1)]);
        assert!(a.and(&b, 3).is_unknown());
        assert!(!a.and(&b, 4).is_unknown());
        assert!(Guard::Unknown.or(&a, 16).is_unknown());
    }
}
