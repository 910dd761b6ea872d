//! Race detection at join ports.

use tracing::debug;

use crate::check::{Check, CheckContext};
use crate::hazard::{Hazard, HazardKind};

/// Flags input ports with two producers that can fire in the same run.
///
/// A port fed by several wires consumes one token per firing; if two of its
/// producers are not separated by different branches of a common D-node the
/// value consumed depends on scheduling order.
pub struct RaceCheck;

impl Check for RaceCheck {
    fn name(&self) -> &'static str {
        "race"
    }

    fn run(&self, ctx: &CheckContext<'_>, hazards: &mut Vec<Hazard>) {
        let limit = ctx.config.max_terms;
        for (id, _) in ctx.function.nodes() {
            for port in ctx.function.inbound(id) {
                if port.wires.len() < 2 {
                    continue;
                }

                let mut race = None;
                let mut unresolved = None;
                'pairs: for (i, &a) in port.wires.iter().enumerate() {
                    for &b in &port.wires[i + 1..] {
                        let both = ctx
                            .analysis
                            .wire_guard(a)
                            .and(ctx.analysis.wire_guard(b), limit);
                        match both.is_satisfiable() {
                            Some(true) => {
                                race = Some((a, b));
                                break 'pairs;
                            }
                            None => unresolved = unresolved.or(Some((a, b))),
                            Some(false) => {}
                        }
                    }
                }

                if let Some((a, b)) = race {
                    debug!("Race at {}.{}", id.index(), port.port);
                    hazards.push(ctx.hazard(
                        id,
                        &port.port,
                        HazardKind::Race,
                        format!(
                            "{} and {} can both fire",
                            ctx.producer(a),
                            ctx.producer(b)
                        ),
                    ));
                } else if let Some((a, b)) = unresolved {
                    hazards.push(ctx.hazard(
                        id,
                        &port.port,
                        HazardKind::Unresolved,
                        format!(
                            "cannot decide whether {} and {} are exclusive",
                            ctx.producer(a),
                            ctx.producer(b)
                        ),
                    ));
                }
            }
        }
    }
}
