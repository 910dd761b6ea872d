//! Hang detection at join nodes.

use tracing::debug;

use crate::check::{Check, CheckContext};
use crate::guard::{Guard, find_gap};
use crate::hazard::{Hazard, HazardKind};

/// Flags input ports that can stay empty while their node still has to fire.
///
/// A node has to fire when it lies on every path to the final node, or when
/// another of its ports has already received a token (otherwise that token
/// is stranded and the function can never finish cleanly). The check
/// searches for a choice of D-node branches under which the port is needed
/// but none of its producers fire.
pub struct HangCheck;

impl Check for HangCheck {
    fn name(&self) -> &'static str {
        "hang"
    }

    fn run(&self, ctx: &CheckContext<'_>, hazards: &mut Vec<Hazard>) {
        let limit = ctx.config.max_terms;
        for (id, _) in ctx.function.nodes() {
            let ports = ctx.function.inbound(id);
            let required = ctx.analysis.is_required(id);
            if ports.is_empty() || (ports.len() < 2 && !required) {
                continue;
            }

            let live: Vec<Guard> = ports.iter().map(|p| ctx.analysis.port_guard(p)).collect();
            for (i, port) in ports.iter().enumerate() {
                let need = if required {
                    Guard::always()
                } else {
                    live.iter()
                        .enumerate()
                        .filter(|&(j, _)| j != i)
                        .fold(Guard::never(), |acc, (_, g)| acc.or(g, limit))
                };

                match find_gap(ctx.analysis, &need, &live[i], ctx.config.max_assignments) {
                    Some(Some(choice)) => {
                        let choice = choice
                            .iter()
                            .map(|(d, b)| {
                                let name = ctx
                                    .function
                                    .node(*d)
                                    .map(|n| n.display_name())
                                    .unwrap_or_default();
                                format!("{name}={b}")
                            })
                            .collect::<Vec<_>>()
                            .join(", ");
                        debug!("Hang at {}.{} under [{choice}]", id.index(), port.port);
                        hazards.push(ctx.hazard(
                            id,
                            &port.port,
                            HazardKind::Hang,
                            format!("no producer fires under branches [{choice}]"),
                        ));
                    }
                    Some(None) => {}
                    None => hazards.push(ctx.hazard(
                        id,
                        &port.port,
                        HazardKind::Unresolved,
                        "cannot decide whether the port is always fed",
                    )),
                }
            }
        }
    }
}
