//! Activation records: one live invocation of a function each.

use std::collections::BTreeMap;
use std::sync::Arc;

use qpr_ir::{Function, NodeId, Value, WireId};

/// Index of an activation in the arena.
pub type ActivationId = usize;

/// Per-invocation wire state.
#[derive(Debug)]
pub(crate) struct Activation {
    pub(crate) function: Arc<Function>,
    /// One slot per wire: `None` is waiting, `Some` is fired.
    pub(crate) tokens: Vec<Option<Value>>,
    /// The call node in the caller that spawned this activation.
    pub(crate) parent: Option<(ActivationId, NodeId)>,
    pub(crate) depth: usize,
    /// Call nodes waiting for a callee, and the callee's activation.
    pub(crate) busy_calls: BTreeMap<NodeId, ActivationId>,
}

impl Activation {
    pub(crate) fn token(&self, wire: WireId) -> Option<Value> {
        self.tokens.get(wire.index()).copied().flatten()
    }
}

/// Arena of live activations with slot reuse.
#[derive(Debug, Default)]
pub(crate) struct Activations {
    slots: Vec<Option<Activation>>,
    free: Vec<ActivationId>,
    live: usize,
    created: u64,
    peak_depth: usize,
}

impl Activations {
    pub(crate) fn spawn(
        &mut self,
        function: Arc<Function>,
        parent: Option<(ActivationId, NodeId)>,
    ) -> ActivationId {
        let depth = parent
            .and_then(|(p, _)| self.get(p))
            .map_or(1, |p| p.depth + 1);
        let activation = Activation {
            tokens: vec![None; function.wire_count()],
            function,
            parent,
            depth,
            busy_calls: BTreeMap::new(),
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(activation);
                id
            }
            None => {
                self.slots.push(Some(activation));
                self.slots.len() - 1
            }
        };
        self.live += 1;
        self.created += 1;
        self.peak_depth = self.peak_depth.max(depth);
        id
    }

    pub(crate) fn get(&self, id: ActivationId) -> Option<&Activation> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: ActivationId) -> Option<&mut Activation> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// Remove an activation and every callee it is still waiting on.
    /// Returns the removed ids.
    pub(crate) fn remove(&mut self, id: ActivationId) -> Vec<ActivationId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(activation) = self.slots.get_mut(id).and_then(Option::take) else {
                continue;
            };
            stack.extend(activation.busy_calls.values().copied());
            self.free.push(id);
            self.live -= 1;
            removed.push(id);
        }
        removed
    }

    /// Live activations in id order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ActivationId, &Activation)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, a)| a.as_ref().map(|a| (id, a)))
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    pub(crate) fn created(&self) -> u64 {
        self.created
    }

    pub(crate) fn peak_depth(&self) -> usize {
        self.peak_depth
    }
}
