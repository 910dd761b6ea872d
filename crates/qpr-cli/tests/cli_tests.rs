//! End-to-end tests of the `qpr` binary.

use std::io::Write;
use std::process::{Command, Output};

fn qpr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qpr"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("QPR_SCHEDULE")
        .env_remove("QPR_SEED")
        .env_remove("QPR_MAX_CLASSICAL")
        .env_remove("QPR_MAX_QUANTUM")
        .env_remove("QPR_MAX_ACTIVATIONS")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_list_names_every_demo() {
    let out = qpr(&["list"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for name in ["collatz", "write2", "register", "hang", "race"] {
        assert!(text.contains(name), "{name} missing from:\n{text}");
    }
}

#[test]
fn test_run_collatz_json() {
    let out = qpr(&["run", "collatz", "--input", "n=6", "--json"]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["status"], "success");
    assert_eq!(report["tape"].as_array().unwrap().len(), 9);
    assert_eq!(report["stats"]["released_at_exit"], 0);
}

#[test]
fn test_run_collatz_prints_tape() {
    let out = qpr(&["run", "collatz", "-i", "n=6", "--schedule", "reverse"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("01010000Done"));
}

#[test]
fn test_run_hang_fails() {
    let out = qpr(&["run", "hang"]);
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Deadlock"), "{err}");
}

#[test]
fn test_run_rejects_bad_input() {
    let out = qpr(&["run", "collatz", "-i", "n"]);
    assert_eq!(out.status.code(), Some(1));
    let out = qpr(&["run", "collatz", "-i", "m=3"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_run_with_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "limits:\n  max_activations: 3").unwrap();
    let path = file.path().to_str().unwrap();
    let out = qpr(&["run", "collatz", "-i", "n=27", "--config", path, "--json"]);
    assert_eq!(out.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["stats"]["peak_depth"], 3);
}

#[test]
fn test_validate() {
    let out = qpr(&["validate", "collatz"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("no hazards"));

    let out = qpr(&["validate", "race"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("race"));

    let out = qpr(&["validate", "hang", "--strict"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_validate_json() {
    let out = qpr(&["validate", "race", "--json"]);
    assert!(out.status.success());
    let verdict: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(verdict["Warnings"].as_array().unwrap().len(), 1);
}

#[test]
fn test_unknown_program() {
    let out = qpr(&["validate", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown program"));
}

#[test]
fn test_dot_renders_main() {
    let out = qpr(&["dot", "collatz"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.starts_with("digraph {"), "{text}");
    assert!(text.contains("\"call f\""));
    assert_eq!(text.matches("style=dashed").count(), 2);
}

#[test]
fn test_dot_named_function() {
    let out = qpr(&["dot", "register", "--function", "bump"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("load_u32"));

    let out = qpr(&["dot", "collatz", "-f", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("no function 'nope'"), "{err}");
}
