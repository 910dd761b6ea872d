//! The dataflow execution engine.
//!
//! A run keeps one token slot per wire per activation. A node instance is
//! *enabled* when every input port has a fired wire and every outgoing wire
//! is waiting; the scheduler picks one enabled instance per step and the
//! engine fires it. Only enabled instances are kept in the ready set, and
//! only the endpoints of wires that changed are re-examined after a step.
//! `main`'s final node bypasses the scheduler: the run ends as soon as it is
//! enabled.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, instrument, trace, warn};

use qpr_ir::{
    CallSpec, Catalog, Decision, Function, NodeId, NodeKind, OpSpec, PortValues, Program,
    Semantics, Signature, Specifier, TypeKind, Value, ports,
};

use crate::activation::{ActivationId, Activations};
use crate::config::EngineConfig;
use crate::error::{ExecError, ExecResult, ResourceKind, RuntimeError, RuntimeErrorKind, Site};
use crate::quantum;
use crate::report::{HostValue, RunId, RunReport, RunStats, RunStatus};
use crate::resource::{ResourceManager, SlotState};
use crate::scheduler::{Ready, Scheduler};
use crate::tape::{OutputTape, TapeSink};

/// Runs programs against a catalog.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Run `main` to completion or abort.
    ///
    /// Input problems are reported as [`ExecError`] before anything fires.
    /// Runtime failures are part of the returned report.
    #[instrument(skip(self, program, inputs), fields(main = %program.main().name()))]
    pub fn run(
        &self,
        program: &Program,
        inputs: &BTreeMap<String, HostValue>,
    ) -> ExecResult<RunReport> {
        self.execute(program, inputs, OutputTape::new())
    }

    /// Like [`Engine::run`], forwarding each tape entry to `sink` as it is
    /// written.
    #[instrument(skip(self, program, inputs, sink), fields(main = %program.main().name()))]
    pub fn run_streaming(
        &self,
        program: &Program,
        inputs: &BTreeMap<String, HostValue>,
        sink: Box<dyn TapeSink>,
    ) -> ExecResult<RunReport> {
        self.execute(program, inputs, OutputTape::streaming(sink))
    }

    fn execute(
        &self,
        program: &Program,
        inputs: &BTreeMap<String, HostValue>,
        tape: OutputTape,
    ) -> ExecResult<RunReport> {
        self.config.validate()?;
        let run_id = RunId::new();
        let started_at = Utc::now();
        let resources = ResourceManager::new(Arc::clone(&self.catalog), self.config.limits.clone());

        let main = Arc::clone(program.main());
        let initial = match self.bind_inputs(&main, inputs, &resources) {
            Ok(values) => values,
            Err(e) => {
                resources.release_all();
                return Err(e);
            }
        };

        info!(
            "Starting run {run_id} with schedule {}",
            self.config.schedule
        );

        let mut run = Run {
            catalog: &self.catalog,
            config: &self.config,
            program,
            resources: &resources,
            tape: &tape,
            activations: Activations::default(),
            ready: BTreeSet::new(),
            scheduler: Scheduler::new(self.config.schedule),
            rng: SmallRng::seed_from_u64(self.config.seed),
            steps: 0,
            root_final: None,
            result: None,
        };
        let root = run.activations.spawn(main, None);
        let outcome = run.complete(root, initial);

        let (status, outputs) = match outcome {
            Ok(outputs) => (RunStatus::Success, outputs),
            Err(e) => {
                warn!("Run {run_id} aborted: {e}");
                (RunStatus::RuntimeError(e), BTreeMap::new())
            }
        };

        let pool = resources.stats();
        let released_at_exit = resources.release_all();
        let stats = RunStats {
            steps: run.steps,
            activations: run.activations.created(),
            peak_depth: run.activations.peak_depth(),
            peak_live_resources: pool.peak_live,
            allocations: pool.allocations,
            released_at_exit,
        };

        info!(
            "Run {run_id} finished: {status} after {} steps, {} tape entries",
            stats.steps,
            tape.len()
        );

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            tape: tape.take(),
            outputs,
            stats,
        })
    }

    /// Turn host inputs into tokens for `main`'s initial node.
    fn bind_inputs(
        &self,
        main: &Function,
        inputs: &BTreeMap<String, HostValue>,
        resources: &ResourceManager,
    ) -> ExecResult<PortValues> {
        if let Some(extra) = inputs.keys().find(|k| !main.inputs().contains(k)) {
            return Err(ExecError::UnexpectedInput(extra.clone()));
        }

        let mut values = PortValues::new();
        for (port, ty) in main.inputs().iter() {
            let invalid = |reason: String| ExecError::InvalidInput {
                port: port.to_string(),
                reason,
            };
            let def = self.catalog.ty(ty).map_err(|e| invalid(e.to_string()))?;
            let Some(host) = inputs.get(port) else {
                if ty == qpr_ir::UNIT {
                    values.insert(port, Value::UNIT);
                    continue;
                }
                return Err(ExecError::MissingInput(port.to_string()));
            };

            let value = match (&def.kind, host) {
                (TypeKind::Classical(c), HostValue::Classical(v)) => {
                    if !c.contains(*v) {
                        return Err(invalid(format!("{v} is not a value of {ty}")));
                    }
                    Value::Word(*v)
                }
                (TypeKind::Quantum(_), HostValue::Quantum(amps)) => resources
                    .allocate_with(ty, SlotState::Quantum(amps.clone()))
                    .map(Value::Handle)
                    .map_err(|e| invalid(e.to_string()))?,
                (TypeKind::Reference { target }, HostValue::Classical(v)) => resources
                    .allocate_with(target, SlotState::Classical(*v))
                    .map(Value::Handle)
                    .map_err(|e| invalid(e.to_string()))?,
                (_, other) => {
                    return Err(invalid(format!("{other} does not fit type {ty}")));
                }
            };
            values.insert(port, value);
        }
        Ok(values)
    }
}

/// State of one program run.
struct Run<'a> {
    catalog: &'a Catalog,
    config: &'a EngineConfig,
    program: &'a Program,
    resources: &'a ResourceManager,
    tape: &'a OutputTape,
    activations: Activations,
    ready: BTreeSet<Ready>,
    scheduler: Scheduler,
    rng: SmallRng,
    steps: u64,
    /// `main`'s final node, fired as soon as it is enabled.
    root_final: Option<Ready>,
    /// Values on `main`'s final node, once it fired.
    result: Option<PortValues>,
}

type Fired<T> = Result<T, RuntimeError>;

impl<'a> Run<'a> {
    /// Force-fire the root's initial node and run until `main` finishes.
    fn complete(
        &mut self,
        root: ActivationId,
        inputs: PortValues,
    ) -> Fired<BTreeMap<String, HostValue>> {
        let function = self.function(root)?;
        self.root_final = Some((root, function.final_node()));
        self.emit(root, function.initial(), &inputs, None)?;
        let values = self.drive()?;
        self.host_outputs(&values)
    }

    fn drive(&mut self) -> Fired<PortValues> {
        loop {
            if let Some(values) = self.result.take() {
                return Ok(values);
            }
            let finished = self.root_final.filter(|k| self.ready.contains(k));
            let Some((act, node)) = finished.or_else(|| self.scheduler.pick(&self.ready)) else {
                return Err(self.deadlock());
            };
            self.ready.remove(&(act, node));
            self.steps += 1;
            self.fire(act, node)
                .map_err(|e| e.or_site(|| self.site(act, node)))?;
        }
    }

    fn fire(&mut self, act: ActivationId, node: NodeId) -> Fired<()> {
        let function = self.function(act)?;
        let Some(n) = function.node(node) else {
            return Err(RuntimeError::operand(format!("no node {node:?}")));
        };
        debug!("Firing {}::{}", function.name(), n.display_name());
        let inputs = self.consume(act, node, &function);

        match &n.kind {
            NodeKind::Initial => Ok(()),
            NodeKind::Final => self.finish(act, inputs),
            NodeKind::Decision(spec) => {
                let branch = match &self.specifier(&spec.specifier)?.semantics {
                    Semantics::Decision { decide, .. } => decide(&inputs)?,
                    other => {
                        return Err(RuntimeError::operand(format!(
                            "{} is not a decision ({other:?})",
                            spec.specifier
                        )));
                    }
                };
                let Some(Decision::Fire { branch, target, .. }) = spec.select(branch) else {
                    return Err(RuntimeError::operand(format!(
                        "decision {} returned branch {branch} of {}",
                        spec.specifier,
                        spec.branches.len()
                    )));
                };
                trace!("Branch {branch} of {} towards {target:?}", n.display_name());
                self.emit(act, node, &inputs, Some(branch))
            }
            NodeKind::Op(OpSpec::Call(call)) => self.call(act, node, call, &inputs),
            NodeKind::Op(OpSpec::Builtin(name)) => {
                let spec = self.specifier(name)?;
                let outputs = self.apply(spec, &inputs)?;
                self.emit(act, node, &outputs, None)
            }
        }
    }

    /// Evaluate an F-node specifier.
    fn apply(&mut self, spec: &Specifier, inputs: &PortValues) -> Fired<PortValues> {
        let rm = self.resources;
        let outputs = match &spec.semantics {
            Semantics::Pure(f) => {
                let outputs = f(inputs)?;
                self.check_outputs(&spec.name, &spec.outputs, &outputs)?;
                outputs
            }
            Semantics::Decision { .. } => {
                return Err(RuntimeError::operand(format!(
                    "decision {} used as an F-node",
                    spec.name
                )));
            }
            Semantics::Gate(gate) if gate.is_controlled() => {
                let ctl = inputs.handle(ports::CONTROL)?;
                let tgt = inputs.handle(ports::TARGET)?;
                if ctl == tgt {
                    return Err(RuntimeError::operand(format!(
                        "{}: control and target are the same resource",
                        spec.name
                    )));
                }
                match rm.with_quantum(ctl, |amps| quantum::basis_value(amps))? {
                    Some(0) => {}
                    Some(_) => rm.with_quantum(tgt, |amps| quantum::apply_gate(gate, amps))??,
                    None => {
                        return Err(RuntimeError::operand(format!(
                            "{}: control is in superposition and would entangle",
                            spec.name
                        )));
                    }
                }
                PortValues::new()
                    .with(ports::CONTROL, ctl)
                    .with(ports::TARGET, tgt)
            }
            Semantics::Gate(gate) => {
                let q = inputs.handle(ports::QUBIT)?;
                rm.with_quantum(q, |amps| quantum::apply_gate(gate, amps))??;
                PortValues::new().with(ports::QUBIT, q)
            }
            Semantics::Measure => {
                let q = inputs.handle(ports::QUBIT)?;
                let rng = &mut self.rng;
                let outcome = rm.with_quantum(q, |amps| quantum::measure(amps, rng))?;
                trace!("Measured {q}: {outcome}");
                PortValues::new()
                    .with(ports::QUBIT, q)
                    .with(ports::OUTCOME, outcome as u64)
            }
            Semantics::Allocate { ty } => {
                let r = rm.allocate(ty)?;
                PortValues::new().with(ports::VALUE, r)
            }
            Semantics::Deallocate { .. } => {
                rm.deallocate(inputs.handle(ports::VALUE)?)?;
                PortValues::new().with(ports::UNIT, Value::UNIT)
            }
            Semantics::Copy => {
                let value = inputs
                    .get(ports::VALUE)
                    .ok_or_else(|| RuntimeError::operand("copy without a value"))?;
                if let Value::Handle(r) = value {
                    rm.copy(r)?;
                }
                PortValues::new()
                    .with(ports::COPY_A, value)
                    .with(ports::COPY_B, value)
            }
            Semantics::WriteLiteral(bytes) => {
                self.tape.append(bytes);
                PortValues::new().with(ports::UNIT, Value::UNIT)
            }
            Semantics::WriteEncoded { ty } => {
                let value = inputs.word(ports::VALUE)?;
                let bytes = self
                    .catalog
                    .ty(ty)
                    .ok()
                    .and_then(|t| t.as_classical())
                    .and_then(|c| c.encoding.as_ref())
                    .and_then(|enc| enc.encode(value))
                    .ok_or_else(|| {
                        RuntimeError::operand(format!("{value} of {ty} has no output encoding"))
                    })?;
                self.tape.append(&bytes);
                PortValues::new().with(ports::UNIT, Value::UNIT)
            }
            Semantics::Load => {
                let r = inputs.handle(ports::REF)?;
                let value = rm.read(r)?;
                PortValues::new()
                    .with(ports::REF, r)
                    .with(ports::VALUE, value)
            }
            Semantics::Store => {
                let r = inputs.handle(ports::REF)?;
                rm.write(r, inputs.word(ports::VALUE)?)?;
                PortValues::new().with(ports::REF, r)
            }
        };
        Ok(outputs)
    }

    /// Pure outputs must cover the signature exactly and stay in their types.
    fn check_outputs(&self, name: &str, sig: &Signature, outputs: &PortValues) -> Fired<()> {
        if let Some((port, _)) = outputs.iter().find(|(p, _)| !sig.contains(p)) {
            return Err(RuntimeError::operand(format!(
                "{name} produced undeclared output '{port}'"
            )));
        }
        for (port, ty) in sig.iter() {
            let value = outputs.get(port).ok_or_else(|| {
                RuntimeError::operand(format!("{name} produced no value for '{port}'"))
            })?;
            let fits = match (self.catalog.ty(ty).map(|t| &t.kind), value) {
                (Ok(TypeKind::Classical(c)), Value::Word(w)) => c.contains(w),
                (Ok(TypeKind::Quantum(_) | TypeKind::Reference { .. }), Value::Handle(r)) => {
                    self.resources.contains(r)
                }
                _ => false,
            };
            if !fits {
                return Err(RuntimeError::operand(format!(
                    "{name} produced {value} on '{port}', which is not a value of {ty}"
                )));
            }
        }
        Ok(())
    }

    /// Spawn the callee and hand it the call's inputs.
    fn call(
        &mut self,
        act: ActivationId,
        node: NodeId,
        call: &CallSpec,
        inputs: &PortValues,
    ) -> Fired<()> {
        let callee = self.program.function(&call.callee).cloned().ok_or_else(|| {
            RuntimeError::operand(format!("call to unknown function {}", call.callee))
        })?;
        if self.activations.live() >= self.config.limits.max_activations {
            return Err(RuntimeError::new(RuntimeErrorKind::ResourceExhausted {
                kind: ResourceKind::Activation,
            }));
        }

        let mut mapped = PortValues::new();
        for (from, to) in &call.input_map {
            let value = inputs
                .get(from)
                .ok_or_else(|| RuntimeError::operand(format!("call input '{from}' is empty")))?;
            mapped.insert(to.clone(), value);
        }

        let initial = callee.initial();
        let child = self.activations.spawn(callee, Some((act, node)));
        if let Some(caller) = self.activations.get_mut(act) {
            caller.busy_calls.insert(node, child);
        }
        trace!("Activation {act} called {} as {child}", call.callee);
        self.refresh(act, node);
        self.emit(child, initial, &mapped, None)
    }

    /// A final node fired: finish the run or return to the caller.
    fn finish(&mut self, act: ActivationId, values: PortValues) -> Fired<()> {
        let parent = self.activations.get(act).and_then(|a| a.parent);
        let Some((caller, call_node)) = parent else {
            self.result = Some(values);
            return Ok(());
        };

        let caller_fn = self.function(caller)?;
        let call = caller_fn
            .node(call_node)
            .and_then(|n| n.call())
            .ok_or_else(|| RuntimeError::operand("return to a node that is not a call"))?;
        let mut mapped = PortValues::new();
        for (from, to) in &call.output_map {
            let value = values
                .get(from)
                .ok_or_else(|| RuntimeError::operand(format!("callee output '{from}' is empty")))?;
            mapped.insert(to.clone(), value);
        }

        let removed = self.activations.remove(act);
        self.ready.retain(|(a, _)| !removed.contains(a));
        if let Some(c) = self.activations.get_mut(caller) {
            c.busy_calls.remove(&call_node);
        }
        trace!("Activation {act} returned to {caller}");
        self.emit(caller, call_node, &mapped, None)
    }

    /// Take one fired token per input port, lowest wire first.
    fn consume(&mut self, act: ActivationId, node: NodeId, function: &Function) -> PortValues {
        let mut values = PortValues::new();
        let mut sources = Vec::new();
        if let Some(a) = self.activations.get_mut(act) {
            for port in function.inbound(node) {
                let taken = port
                    .wires
                    .iter()
                    .find_map(|&w| a.tokens[w.index()].take().map(|v| (w, v)));
                if let Some((w, value)) = taken {
                    values.insert(port.port.clone(), value);
                    if let Some((src, _)) = function.endpoints(w) {
                        sources.push(src);
                    }
                }
            }
        }
        for src in sources {
            self.refresh(act, src);
        }
        values
    }

    /// Fire the outgoing wires of `node`, restricted to one branch for D-nodes.
    fn emit(
        &mut self,
        act: ActivationId,
        node: NodeId,
        values: &PortValues,
        branch: Option<usize>,
    ) -> Fired<()> {
        let function = self.function(act)?;
        let mut targets = Vec::new();
        if let Some(a) = self.activations.get_mut(act) {
            for &w in function.outbound(node) {
                let Some(wire) = function.wire(w) else {
                    continue;
                };
                if wire.branch != branch {
                    continue;
                }
                let value = values.get(&wire.source_port).ok_or_else(|| {
                    RuntimeError::operand(format!("no value for output '{}'", wire.source_port))
                })?;
                a.tokens[w.index()] = Some(value);
                if let Some((_, dst)) = function.endpoints(w) {
                    targets.push(dst);
                }
            }
        }
        self.refresh(act, node);
        for dst in targets {
            self.refresh(act, dst);
        }
        Ok(())
    }

    /// Recompute whether one node instance belongs in the ready set.
    fn refresh(&mut self, act: ActivationId, node: NodeId) {
        let enabled = self.activations.get(act).is_some_and(|a| {
            let f = &a.function;
            node != f.initial()
                && !a.busy_calls.contains_key(&node)
                && f
                    .inbound(node)
                    .iter()
                    .all(|p| p.wires.iter().any(|&w| a.token(w).is_some()))
                && f.outbound(node).iter().all(|&w| a.token(w).is_none())
        });
        if enabled {
            self.ready.insert((act, node));
        } else {
            self.ready.remove(&(act, node));
        }
    }

    fn deadlock(&self) -> RuntimeError {
        let stuck = self.activations.iter().find_map(|(id, a)| {
            let f = &a.function;
            f.nodes().map(|(n, _)| n).find(|&n| {
                f.inbound(n)
                    .iter()
                    .any(|p| p.wires.iter().any(|&w| a.token(w).is_some()))
            })
            .map(|n| (id, n))
        });
        let mut err = RuntimeError::new(RuntimeErrorKind::Deadlock);
        if let Some((act, node)) = stuck {
            err = err.or_site(|| self.site(act, node));
        } else {
            let main = self.program.main();
            err.site = Some(Site {
                function: main.name().to_string(),
                node: main.final_node(),
                label: "final".into(),
            });
        }
        err
    }

    fn site(&self, act: ActivationId, node: NodeId) -> Site {
        let function = self
            .activations
            .get(act)
            .map_or_else(|| Arc::clone(self.program.main()), |a| Arc::clone(&a.function));
        Site {
            function: function.name().to_string(),
            node,
            label: function
                .node(node)
                .map_or_else(|| format!("{node:?}"), |n| n.display_name()),
        }
    }

    fn function(&self, act: ActivationId) -> Fired<Arc<Function>> {
        self.activations
            .get(act)
            .map(|a| Arc::clone(&a.function))
            .ok_or_else(|| RuntimeError::operand(format!("activation {act} is gone")))
    }

    fn specifier(&self, name: &str) -> Fired<&'a Specifier> {
        self.catalog
            .specifier(name)
            .map_err(|e| RuntimeError::operand(e.to_string()))
    }

    /// Read `main`'s outputs back out before the pool is released.
    fn host_outputs(&self, values: &PortValues) -> Fired<BTreeMap<String, HostValue>> {
        let main = self.program.main();
        let mut out = BTreeMap::new();
        for (port, ty) in main.outputs().iter() {
            let value = values
                .get(port)
                .ok_or_else(|| RuntimeError::operand(format!("main output '{port}' is empty")))?;
            let quantum = self.catalog.ty(ty).is_ok_and(|t| t.is_quantum());
            let host = match value {
                Value::Word(w) => HostValue::Classical(w),
                Value::Handle(r) if quantum => HostValue::Quantum(self.resources.quantum_state(r)?),
                Value::Handle(r) => HostValue::Reference(r),
            };
            out.insert(port.to_string(), host);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceLimits;
    use qpr_ir::{BIT, FunctionBuilder, Library, QUBIT};
    use std::sync::mpsc;

    fn catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::standard().unwrap();
        let ref_bit = catalog.register_allocator(BIT).unwrap();
        catalog.register_copy(&ref_bit).unwrap();
        catalog
            .register_decision("pick", Signature::single("n", BIT), 2, |v| {
                Ok(v.word("n")? as usize)
            })
            .unwrap();
        catalog
            .register_pure(
                "pair",
                Signature::new().with("x", BIT).with("y", BIT),
                Signature::single("e", BIT),
                |v| Ok(PortValues::new().with("e", v.word("x")? ^ v.word("y")?)),
            )
            .unwrap();
        catalog
            .register_pure(
                "join",
                Signature::new().with("a", "unit").with("b", "unit"),
                Signature::unit(),
                |_| Ok(PortValues::new().with("unit", Value::UNIT)),
            )
            .unwrap();
        catalog
            .register_pure(
                "bad",
                Signature::single("x", BIT),
                Signature::single("e", BIT),
                |_| Ok(PortValues::new().with("e", 5u64)),
            )
            .unwrap();
        Arc::new(catalog)
    }

    fn program(functions: Vec<Function>) -> Program {
        Program::build(Library::build(functions).unwrap()).unwrap()
    }

    fn engine() -> Engine {
        Engine::new(catalog(), EngineConfig::default())
    }

    fn no_inputs() -> BTreeMap<String, HostValue> {
        BTreeMap::new()
    }

    /// alloc -> x -> measure -> free, writing the outcome.
    fn flip_and_write() -> Function {
        let mut f =
            FunctionBuilder::new(catalog(), "main", Signature::new(), Signature::new()).unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let alloc = f.add_node("alloc_qubit").unwrap();
        let x = f.add_node("x").unwrap();
        let m = f.add_node("measure").unwrap();
        let free = f.add_node("free_qubit").unwrap();
        let write = f.add_node("write_bit").unwrap();
        let join = f.add_node("join").unwrap();
        f.add_wire(init, "unit", alloc, ports::UNIT).unwrap();
        f.add_wire(alloc, ports::VALUE, x, ports::QUBIT).unwrap();
        f.add_wire(x, ports::QUBIT, m, ports::QUBIT).unwrap();
        f.add_wire(m, ports::QUBIT, free, ports::VALUE).unwrap();
        f.add_wire(m, ports::OUTCOME, write, ports::VALUE).unwrap();
        f.add_wire(free, ports::UNIT, join, "a").unwrap();
        f.add_wire(write, ports::UNIT, join, "b").unwrap();
        f.add_wire(join, ports::UNIT, fin, "unit").unwrap();
        f.seal().unwrap()
    }

    fn bit_identity(name: &str) -> Function {
        let mut f = FunctionBuilder::new(
            catalog(),
            name,
            Signature::single("b", BIT),
            Signature::single("b", BIT),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        f.add_wire(init, "b", fin, "b").unwrap();
        f.seal().unwrap()
    }

    /// `name(b) = callee(b)`
    fn bit_caller(name: &str, callee: &str) -> Function {
        let mut f = FunctionBuilder::new(
            catalog(),
            name,
            Signature::single("b", BIT),
            Signature::single("b", BIT),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let call = f
            .add_call(callee, Signature::single("b", BIT), Signature::single("b", BIT))
            .unwrap();
        f.add_wire(init, "b", call, "b").unwrap();
        f.add_wire(call, "b", fin, "b").unwrap();
        f.seal().unwrap()
    }

    #[test]
    fn test_measure_flipped_qubit() {
        let report = engine().run(&program(vec![flip_and_write()]), &no_inputs()).unwrap();
        assert!(report.is_success());
        assert_eq!(report.tape_strings(), vec!["1"]);
        assert_eq!(report.stats.allocations, 1);
        assert_eq!(report.stats.released_at_exit, 0);
        assert_eq!(report.stats.peak_live_resources, 1);
        assert!(report.outputs.contains_key("unit"));
    }

    #[test]
    fn test_quantum_exhaustion_has_site() {
        let config = EngineConfig::default().with_limits(ResourceLimits {
            max_quantum: 0,
            ..ResourceLimits::default()
        });
        let engine = Engine::new(catalog(), config);
        let report = engine.run(&program(vec![flip_and_write()]), &no_inputs()).unwrap();
        let err = report.error().unwrap();
        assert_eq!(
            err.kind,
            RuntimeErrorKind::ResourceExhausted {
                kind: ResourceKind::Quantum
            }
        );
        let site = err.site.as_ref().unwrap();
        assert_eq!(site.function, "main");
        assert_eq!(site.label, "alloc_qubit");
        assert!(report.tape.is_empty());
    }

    #[test]
    fn test_double_free_through_alias() {
        let mut f =
            FunctionBuilder::new(catalog(), "main", Signature::new(), Signature::new()).unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let alloc = f.add_node("alloc_bit").unwrap();
        let copy = f.add_node("copy_ref_bit").unwrap();
        let free_a = f.add_node("free_bit").unwrap();
        let free_b = f.add_node("free_bit").unwrap();
        let join = f.add_node("join").unwrap();
        f.add_wire(init, "unit", alloc, ports::UNIT).unwrap();
        f.add_wire(alloc, ports::VALUE, copy, ports::VALUE).unwrap();
        f.add_wire(copy, ports::COPY_A, free_a, ports::VALUE).unwrap();
        f.add_wire(copy, ports::COPY_B, free_b, ports::VALUE).unwrap();
        f.add_wire(free_a, ports::UNIT, join, "a").unwrap();
        f.add_wire(free_b, ports::UNIT, join, "b").unwrap();
        f.add_wire(join, ports::UNIT, fin, "unit").unwrap();

        let report = engine().run(&program(vec![f.seal().unwrap()]), &no_inputs()).unwrap();
        let err = report.error().unwrap();
        assert!(matches!(err.kind, RuntimeErrorKind::InvalidReference(_)));
        assert_eq!(err.site.as_ref().unwrap().label, "free_bit");
        assert_eq!(report.stats.released_at_exit, 0);
    }

    #[test]
    fn test_decision_deadlock() {
        let mut f = FunctionBuilder::new(
            catalog(),
            "main",
            Signature::single("n", BIT),
            Signature::single("e", BIT),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let d = f.add_node("pick").unwrap();
        let j = f.add_labeled("pair", "J").unwrap();
        f.add_wire(init, "n", d, "n").unwrap();
        f.add_branch(d, j, [("n", "x")]).unwrap();
        f.add_branch(d, j, [("n", "y")]).unwrap();
        f.add_wire(j, "e", fin, "e").unwrap();
        let p = program(vec![f.seal().unwrap()]);

        let inputs = BTreeMap::from([("n".to_string(), HostValue::Classical(1))]);
        let report = engine().run(&p, &inputs).unwrap();
        let err = report.error().unwrap();
        assert_eq!(err.kind, RuntimeErrorKind::Deadlock);
        assert_eq!(err.site.as_ref().unwrap().label, "J");
        assert_eq!(report.stats.steps, 1);
    }

    #[test]
    fn test_pure_output_outside_type() {
        let mut f = FunctionBuilder::new(
            catalog(),
            "main",
            Signature::single("b", BIT),
            Signature::single("b", BIT),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let bad = f.add_node("bad").unwrap();
        f.add_wire(init, "b", bad, "x").unwrap();
        f.add_wire(bad, "e", fin, "b").unwrap();
        let p = program(vec![f.seal().unwrap()]);

        let inputs = BTreeMap::from([("b".to_string(), HostValue::Classical(0))]);
        let report = engine().run(&p, &inputs).unwrap();
        let err = report.error().unwrap();
        assert!(matches!(err.kind, RuntimeErrorKind::InvalidOperand(_)));
        assert!(err.to_string().contains("not a value of bit"));
    }

    #[test]
    fn test_call_returns_through_bijection() {
        let p = program(vec![bit_caller("main", "id"), bit_identity("id")]);
        let inputs = BTreeMap::from([("b".to_string(), HostValue::Classical(1))]);
        let report = engine().run(&p, &inputs).unwrap();
        assert!(report.is_success());
        assert_eq!(report.outputs.get("b"), Some(&HostValue::Classical(1)));
        assert_eq!(report.stats.activations, 2);
        assert_eq!(report.stats.peak_depth, 2);
    }

    #[test]
    fn test_unbounded_recursion_hits_ceiling() {
        let p = program(vec![bit_caller("main", "main")]);
        let config = EngineConfig::default().with_limits(ResourceLimits {
            max_activations: 5,
            ..ResourceLimits::default()
        });
        let inputs = BTreeMap::from([("b".to_string(), HostValue::Classical(0))]);
        let report = Engine::new(catalog(), config).run(&p, &inputs).unwrap();
        assert_eq!(
            report.error().map(|e| &e.kind),
            Some(&RuntimeErrorKind::ResourceExhausted {
                kind: ResourceKind::Activation
            })
        );
        assert_eq!(report.stats.peak_depth, 5);
    }

    #[test]
    fn test_entangling_gate_is_rejected() {
        let mut f = FunctionBuilder::new(
            catalog(),
            "main",
            Signature::new().with("c", QUBIT).with("t", QUBIT),
            Signature::new().with("c", QUBIT).with("t", QUBIT),
        )
        .unwrap();
        let (init, fin) = (f.initial(), f.final_node());
        let cx = f.add_node("cx").unwrap();
        f.add_wire(init, "c", cx, ports::CONTROL).unwrap();
        f.add_wire(init, "t", cx, ports::TARGET).unwrap();
        f.add_wire(cx, ports::CONTROL, fin, "c").unwrap();
        f.add_wire(cx, ports::TARGET, fin, "t").unwrap();
        let p = program(vec![f.seal().unwrap()]);

        let run = |c: &str| {
            let inputs = BTreeMap::from([
                ("c".to_string(), c.parse::<HostValue>().unwrap()),
                ("t".to_string(), "|0>".parse::<HostValue>().unwrap()),
            ]);
            engine().run(&p, &inputs).unwrap()
        };

        let report = run("|1>");
        assert!(report.is_success());
        let HostValue::Quantum(t) = &report.outputs["t"] else {
            panic!("target should be quantum");
        };
        assert_eq!(quantum::basis_value(t), Some(1));
        assert_eq!(report.stats.released_at_exit, 2);

        let report = run("|+>");
        assert!(report.error().unwrap().to_string().contains("entangle"));
    }

    #[test]
    fn test_input_binding_errors() {
        let p = program(vec![bit_identity("main")]);
        let engine = engine();
        assert!(matches!(
            engine.run(&p, &no_inputs()),
            Err(ExecError::MissingInput(port)) if port == "b"
        ));
        let extra = BTreeMap::from([
            ("b".to_string(), HostValue::Classical(0)),
            ("z".to_string(), HostValue::Classical(0)),
        ]);
        assert!(matches!(engine.run(&p, &extra), Err(ExecError::UnexpectedInput(_))));
        let wide = BTreeMap::from([("b".to_string(), HostValue::Classical(2))]);
        assert!(matches!(engine.run(&p, &wide), Err(ExecError::InvalidInput { .. })));
    }

    #[test]
    fn test_streaming_matches_tape() {
        let (tx, rx) = mpsc::channel();
        let report = engine()
            .run_streaming(&program(vec![flip_and_write()]), &no_inputs(), Box::new(tx))
            .unwrap();
        let streamed: Vec<Vec<u8>> = rx.try_iter().collect();
        assert_eq!(streamed, report.tape);
    }
}
