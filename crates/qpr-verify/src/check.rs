//! Check trait for well-formedness checks.

use qpr_ir::{Function, NodeId};

use crate::config::ValidatorConfig;
use crate::guard::GuardAnalysis;
use crate::hazard::{Hazard, HazardKind};

/// Everything a check may read about one function.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// The function under inspection.
    pub function: &'a Function,
    /// Guards computed for it.
    pub analysis: &'a GuardAnalysis,
    /// Analysis bounds.
    pub config: &'a ValidatorConfig,
}

impl CheckContext<'_> {
    /// Build a hazard located in this function.
    pub fn hazard(
        &self,
        node: NodeId,
        port: &str,
        kind: HazardKind,
        detail: impl Into<String>,
    ) -> Hazard {
        let label = self
            .function
            .node(node)
            .map(|n| n.display_name())
            .unwrap_or_default();
        Hazard {
            function: self.function.name().to_string(),
            node,
            label,
            port: port.to_string(),
            kind,
            detail: detail.into(),
        }
    }

    /// `label.port` of a wire's source, for hazard details.
    pub fn producer(&self, wire: qpr_ir::WireId) -> String {
        let Some((src, _)) = self.function.endpoints(wire) else {
            return "?".into();
        };
        let name = self
            .function
            .node(src)
            .map(|n| n.display_name())
            .unwrap_or_default();
        let port = self
            .function
            .wire(wire)
            .map(|w| w.source_port.as_str())
            .unwrap_or_default();
        format!("{name}.{port}")
    }
}

/// A static check over one sealed function.
///
/// Checks only read; they report by pushing onto `hazards`.
pub trait Check: Send + Sync {
    /// Get the name of this check.
    fn name(&self) -> &str;

    /// Run the check.
    fn run(&self, ctx: &CheckContext<'_>, hazards: &mut Vec<Hazard>);

    /// Check if this check applies to the function.
    fn should_run(&self, _function: &Function) -> bool {
        true
    }
}
