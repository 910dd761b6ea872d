//! Choice of the next node to fire among everything enabled.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use qpr_ir::NodeId;

use crate::activation::ActivationId;

/// A node instance: the activation it lives in and the node.
pub(crate) type Ready = (ActivationId, NodeId);

/// How the engine picks from the enabled set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Oldest activation first, then lowest node id.
    #[default]
    InOrder,
    /// Newest activation first, then highest node id.
    ReverseOrder,
    /// Uniformly at random, from a seeded generator.
    Random {
        /// Generator seed.
        seed: u64,
    },
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::InOrder => write!(f, "in-order"),
            SchedulePolicy::ReverseOrder => write!(f, "reverse"),
            SchedulePolicy::Random { seed } => write!(f, "random:{seed}"),
        }
    }
}

impl FromStr for SchedulePolicy {
    type Err = String;

    /// Parse `in-order`, `reverse` or `random[:seed]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-order" | "in_order" | "inorder" => Ok(SchedulePolicy::InOrder),
            "reverse" | "reverse-order" | "reverse_order" => Ok(SchedulePolicy::ReverseOrder),
            "random" => Ok(SchedulePolicy::Random { seed: 0 }),
            other => match other.strip_prefix("random:") {
                Some(seed) => seed
                    .parse()
                    .map(|seed| SchedulePolicy::Random { seed })
                    .map_err(|_| format!("invalid random seed '{seed}'")),
                None => Err(format!(
                    "unknown schedule '{s}' (expected in-order, reverse or random[:seed])"
                )),
            },
        }
    }
}

/// Picks one element of the ready set per step.
#[derive(Debug)]
pub(crate) struct Scheduler {
    policy: SchedulePolicy,
    rng: Option<SmallRng>,
}

impl Scheduler {
    pub(crate) fn new(policy: SchedulePolicy) -> Self {
        let rng = match policy {
            SchedulePolicy::Random { seed } => Some(SmallRng::seed_from_u64(seed)),
            _ => None,
        };
        Self { policy, rng }
    }

    pub(crate) fn pick(&mut self, ready: &BTreeSet<Ready>) -> Option<Ready> {
        match self.policy {
            SchedulePolicy::InOrder => ready.first().copied(),
            SchedulePolicy::ReverseOrder => ready.last().copied(),
            SchedulePolicy::Random { .. } => {
                if ready.is_empty() {
                    return None;
                }
                let idx = self.rng.as_mut().map_or(0, |rng| rng.gen_range(0..ready.len()));
                ready.iter().nth(idx).copied()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> BTreeSet<Ready> {
        [(0, NodeId::new(3)), (1, NodeId::new(1)), (0, NodeId::new(5))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("in-order".parse::<SchedulePolicy>(), Ok(SchedulePolicy::InOrder));
        assert_eq!("Reverse".parse::<SchedulePolicy>(), Ok(SchedulePolicy::ReverseOrder));
        assert_eq!(
            "random:42".parse::<SchedulePolicy>(),
            Ok(SchedulePolicy::Random { seed: 42 })
        );
        assert!("random:x".parse::<SchedulePolicy>().is_err());
        assert!("fifo".parse::<SchedulePolicy>().is_err());
    }

    #[test]
    fn test_display_roundtrips() {
        for policy in [
            SchedulePolicy::InOrder,
            SchedulePolicy::ReverseOrder,
            SchedulePolicy::Random { seed: 7 },
        ] {
            assert_eq!(policy.to_string().parse::<SchedulePolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_in_order_and_reverse() {
        let set = ready();
        let mut s = Scheduler::new(SchedulePolicy::InOrder);
        assert_eq!(s.pick(&set), Some((0, NodeId::new(3))));
        let mut s = Scheduler::new(SchedulePolicy::ReverseOrder);
        assert_eq!(s.pick(&set), Some((1, NodeId::new(1))));
        assert_eq!(s.pick(&BTreeSet::new()), None);
    }

    #[test]
    fn test_random_is_seeded() {
        let set = ready();
        let picks = |seed| {
            let mut s = Scheduler::new(SchedulePolicy::Random { seed });
            (0..16).map(|_| s.pick(&set)).collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
        assert!(picks(9).iter().all(|p| p.is_some_and(|p| set.contains(&p))));
    }
}
