//! Property-based tests for the engine and the resource pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use qpr_exec::{
    Engine, EngineConfig, HostValue, ResourceError, ResourceLimits, ResourceManager,
    SchedulePolicy,
};
use qpr_ir::{BIT, Catalog, QUBIT, ResourceRef};

fn schedule() -> impl Strategy<Value = SchedulePolicy> {
    prop_oneof![
        Just(SchedulePolicy::InOrder),
        Just(SchedulePolicy::ReverseOrder),
        any::<u64>().prop_map(|seed| SchedulePolicy::Random { seed }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Collatz has no races, so every schedule writes the same tape.
    #[test]
    fn collatz_is_schedule_independent(n in 0u32..5_000, policy in schedule(), seed in any::<u64>()) {
        let catalog = Arc::new(qpr_demos::catalog().unwrap());
        let program = qpr_demos::demo("collatz").unwrap().build(Arc::clone(&catalog)).unwrap();
        let config = EngineConfig::default().with_schedule(policy).with_seed(seed);
        let inputs = BTreeMap::from([("n".to_string(), HostValue::Classical(u64::from(n)))]);

        let report = Engine::new(catalog, config).run(&program, &inputs).unwrap();
        prop_assert!(report.is_success(), "{}", report.status);
        prop_assert_eq!(report.tape, qpr_demos::programs::collatz::expected_tape(n));
        prop_assert_eq!(report.stats.released_at_exit, 0);
    }
}

#[derive(Debug, Clone)]
enum PoolOp {
    Alloc { quantum: bool },
    Free(usize),
    FreeStale(usize),
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        any::<bool>().prop_map(|quantum| PoolOp::Alloc { quantum }),
        any::<usize>().prop_map(PoolOp::Free),
        any::<usize>().prop_map(PoolOp::FreeStale),
    ]
}

proptest! {
    /// Live counts track a simple model, capacities hold per kind, and
    /// freed handles stay invalid after their slot is reused.
    #[test]
    fn pool_accounting(ops in prop::collection::vec(pool_op(), 1..200)) {
        let limits = ResourceLimits {
            max_classical: 4,
            max_quantum: 3,
            max_activations: 1,
        };
        let rm = ResourceManager::new(Arc::new(Catalog::standard().unwrap()), limits);
        let mut live: Vec<(ResourceRef, bool)> = Vec::new();
        let mut freed: Vec<ResourceRef> = Vec::new();

        for op in ops {
            match op {
                PoolOp::Alloc { quantum } => {
                    let held = live.iter().filter(|(_, q)| *q == quantum).count();
                    let result = rm.allocate(if quantum { QUBIT } else { BIT });
                    let capacity = if quantum { 3 } else { 4 };
                    if held < capacity {
                        let r = result.unwrap();
                        prop_assert!(!live.iter().any(|(l, _)| *l == r));
                        live.push((r, quantum));
                    } else {
                        let is_exhausted = matches!(result, Err(ResourceError::Exhausted { .. }));
                        prop_assert!(is_exhausted);
                    }
                }
                PoolOp::Free(i) if !live.is_empty() => {
                    let (r, _) = live.swap_remove(i % live.len());
                    prop_assert!(rm.deallocate(r).is_ok());
                    freed.push(r);
                }
                PoolOp::FreeStale(i) if !freed.is_empty() => {
                    let r = freed[i % freed.len()];
                    let is_invalid = matches!(rm.deallocate(r), Err(ResourceError::InvalidReference(_)));
                    prop_assert!(is_invalid);
                }
                _ => {}
            }
            let stats = rm.stats();
            prop_assert_eq!(stats.live_quantum, live.iter().filter(|(_, q)| *q).count());
            prop_assert_eq!(stats.live_classical, live.iter().filter(|(_, q)| !*q).count());
            prop_assert_eq!(rm.live(), live.len());
        }
        prop_assert_eq!(rm.release_all(), live.len());
        prop_assert_eq!(rm.live(), 0);
    }
}
