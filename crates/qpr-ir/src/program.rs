//! Libraries of functions and whole programs.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::function::Function;
use crate::node::PortMap;
use crate::types::Signature;

/// Name of the entry function.
pub const MAIN: &str = "main";

/// Opaque reference to a library function, resolved at call time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FnId(String);

impl FnId {
    /// Create a function id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The function name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FnId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FnId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for FnId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A set of uniquely named functions whose calls all resolve.
#[derive(Debug, Clone)]
pub struct Library {
    functions: BTreeMap<FnId, Arc<Function>>,
}

impl Library {
    /// Build a library.
    ///
    /// Fails on repeated names, on calls to functions that are not in the
    /// set, and on call bijections that do not match the callee.
    pub fn build(functions: impl IntoIterator<Item = Function>) -> IrResult<Self> {
        let mut map = BTreeMap::new();
        for function in functions {
            let id = FnId::new(function.name());
            if map.contains_key(&id) {
                return Err(IrError::DuplicateName(id.0));
            }
            map.insert(id, Arc::new(function));
        }

        for caller in map.values() {
            for (node, call) in caller.calls() {
                let callee = map.get(&call.callee).ok_or_else(|| IrError::UnknownFunction {
                    caller: caller.name().to_string(),
                    callee: call.callee.to_string(),
                })?;
                let Some(site) = caller.node(node) else {
                    continue;
                };
                let context = format!("call {} in {}", call.callee, caller.name());
                check_bijection(
                    caller.name(),
                    &format!("{context}: input map"),
                    &call.input_map,
                    &site.inputs,
                    callee.inputs(),
                )?;
                check_bijection(
                    caller.name(),
                    &format!("{context}: output map"),
                    &call.output_map,
                    callee.outputs(),
                    &site.outputs,
                )?;
            }
        }

        debug!("Built library with {} functions", map.len());
        Ok(Self { functions: map })
    }

    /// Look up a function.
    pub fn get(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.get(name)
    }

    /// Check if a function exists.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Iterate functions in name order.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.functions.values()
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// `map` must send every port of `from` to a distinct port of `to` of the
/// same type, covering `to` entirely.
fn check_bijection(
    function: &str,
    context: &str,
    map: &PortMap,
    from: &Signature,
    to: &Signature,
) -> IrResult<()> {
    if map.len() != from.len() || from.len() != to.len() {
        return Err(IrError::malformed(
            function,
            format!(
                "{context} has {} entries for {} source and {} target ports",
                map.len(),
                from.len(),
                to.len()
            ),
        ));
    }
    let mut hit = BTreeSet::new();
    for (src, src_ty) in from.iter() {
        let dst = map.get(src).ok_or_else(|| {
            IrError::malformed(function, format!("{context} does not map port '{src}'"))
        })?;
        let dst_ty = to.get(dst).ok_or_else(|| {
            IrError::malformed(function, format!("{context} targets unknown port '{dst}'"))
        })?;
        if src_ty != dst_ty {
            return Err(IrError::mismatch(
                format!("{context}: {src} -> {dst}"),
                dst_ty,
                src_ty,
            ));
        }
        if !hit.insert(dst.as_str()) {
            return Err(IrError::NonInjectiveMapping(dst.clone()));
        }
    }
    Ok(())
}

/// A library with a `main` function.
#[derive(Debug, Clone)]
pub struct Program {
    library: Library,
    main: Arc<Function>,
}

impl Program {
    /// Build a program. Fails with `MissingMain` if there is no `main`.
    pub fn build(library: Library) -> IrResult<Self> {
        let main = library.get(MAIN).cloned().ok_or(IrError::MissingMain)?;
        Ok(Self { library, main })
    }

    /// The entry function.
    pub fn main(&self) -> &Arc<Function> {
        &self.main
    }

    /// The library.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Look up a function by id.
    pub fn function(&self, id: &FnId) -> Option<&Arc<Function>> {
        self.library.get(id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::function::FunctionBuilder;
    use crate::types::{BIT, QUBIT};

    fn passthrough(catalog: &Arc<Catalog>, name: &str, port: &str, ty: &str) -> Function {
        let mut f = FunctionBuilder::new(
            Arc::clone(catalog),
            name,
            Signature::single(port, ty),
            Signature::single(port, ty),
        )
        .unwrap();
        let (i, o) = (f.initial(), f.final_node());
        f.add_wire(i, port, o, port).unwrap();
        f.seal().unwrap()
    }

    /// `main(q) = callee(q)` with the call's port `q` mapped to `map_to`.
    fn caller(catalog: &Arc<Catalog>, callee: &str, map_to: &str) -> Function {
        let mut f = FunctionBuilder::new(
            Arc::clone(catalog),
            MAIN,
            Signature::single("q", QUBIT),
            Signature::single("q", QUBIT),
        )
        .unwrap();
        let call = f
            .add_call_mapped(
                callee,
                Signature::single("q", QUBIT),
                Signature::single("q", QUBIT),
                [("q".to_string(), map_to.to_string())].into_iter().collect(),
                [(map_to.to_string(), "q".to_string())].into_iter().collect(),
            )
            .unwrap();
        let (i, o) = (f.initial(), f.final_node());
        f.add_wire(i, "q", call, "q").unwrap();
        f.add_wire(call, "q", o, "q").unwrap();
        f.seal().unwrap()
    }

    #[test]
    fn test_program_with_renamed_call() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let lib = Library::build([
            passthrough(&catalog, "id", "x", QUBIT),
            caller(&catalog, "id", "x"),
        ])
        .unwrap();
        let program = Program::build(lib).unwrap();
        assert_eq!(program.main().name(), MAIN);
        assert!(program.function(&FnId::new("id")).is_some());
        assert_eq!(program.library().len(), 2);
    }

    #[test]
    fn test_duplicate_name() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let err = Library::build([
            passthrough(&catalog, "a", "q", QUBIT),
            passthrough(&catalog, "a", "q", QUBIT),
        ])
        .unwrap_err();
        assert_eq!(err, IrError::DuplicateName("a".into()));
    }

    #[test]
    fn test_unknown_callee() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let err = Library::build([caller(&catalog, "missing", "x")]).unwrap_err();
        assert!(matches!(err, IrError::UnknownFunction { .. }));
    }

    #[test]
    fn test_call_map_targets_unknown_port() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let err = Library::build([
            passthrough(&catalog, "id", "x", QUBIT),
            caller(&catalog, "id", "y"),
        ])
        .unwrap_err();
        assert!(matches!(err, IrError::MalformedFunction { .. }));
    }

    #[test]
    fn test_call_map_type_mismatch() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let err = Library::build([
            passthrough(&catalog, "id", "x", BIT),
            caller(&catalog, "id", "x"),
        ])
        .unwrap_err();
        assert!(matches!(err, IrError::TypeMismatch { .. }));
    }

    #[test]
    fn test_missing_main() {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let lib = Library::build([passthrough(&catalog, "id", "q", QUBIT)]).unwrap();
        assert!(lib.contains("id"));
        assert!(lib.get("nope").is_none());
        assert_eq!(Program::build(lib).unwrap_err(), IrError::MissingMain);
    }
}
