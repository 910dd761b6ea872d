//! Integration tests for the demo suite.
//!
//! Every demo builds against the shared catalog, the validator sorts them
//! into clean and hazardous programs, and the sample inputs bind.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use qpr_demos::{catalog, demo, demos};
use qpr_exec::{Engine, EngineConfig, HostValue};
use qpr_ir::Catalog;
use qpr_verify::{HazardKind, Validator};

fn shared() -> Arc<Catalog> {
    Arc::new(catalog().unwrap())
}

/// Test that every demo builds and has a unique name.
#[test]
fn test_all_demos_build() {
    let catalog = shared();
    let mut names = std::collections::BTreeSet::new();
    for d in demos() {
        assert!(names.insert(d.name), "duplicate demo {}", d.name);
        let program = d.build(Arc::clone(&catalog)).unwrap();
        assert_eq!(program.main().name(), "main");
    }
    assert_eq!(names.len(), 5);
}

/// Test lookup by name.
#[test]
fn test_demo_lookup() {
    assert_eq!(demo("collatz").unwrap().inputs, &[("n", "6")]);
    assert!(demo("missing").is_none());
}

/// Test that the validator flags exactly the hazard demos.
#[test]
fn test_validator_verdicts() {
    let catalog = shared();
    let validator = Validator::default();
    let verdict = |name: &str| validator.validate(&demo(name).unwrap().build(Arc::clone(&catalog)).unwrap());

    assert!(verdict("collatz").is_ok());
    assert!(verdict("write2").is_ok());
    assert!(verdict("register").is_ok());

    let hang = verdict("hang");
    assert!(hang.has(HazardKind::Hang));
    assert!(!hang.has(HazardKind::Race));

    let race = verdict("race");
    assert!(race.has(HazardKind::Race));
    assert_eq!(race.hazards().len(), 1);
}

/// Test that every demo's sample inputs are accepted by the engine.
#[test]
fn test_sample_inputs_bind() {
    let catalog = shared();
    let engine = Engine::new(Arc::clone(&catalog), EngineConfig::default());
    for d in demos() {
        let program = d.build(Arc::clone(&catalog)).unwrap();
        let inputs: BTreeMap<String, HostValue> = d
            .inputs
            .iter()
            .map(|(k, v)| (k.to_string(), HostValue::from_str(v).unwrap()))
            .collect();
        let report = engine.run(&program, &inputs).unwrap();
        let expect_success = d.name != "hang";
        assert_eq!(report.is_success(), expect_success, "{}: {}", d.name, report.status);
    }
}
