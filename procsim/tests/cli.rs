//! CLI tests for the `procsim` binary.
//!
//! Spawns the binary against region files in a temp directory and verifies
//! exit codes and JSON output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use procsim::core::region::Region;
use procsim::exit_codes;
use procsim::io::config::{SimulatorConfig, load_config};
use procsim::test_support::{choice, loop_region, sequential, task};
use serde_json::Value;

fn write_region(dir: &Path, region: &Region) -> PathBuf {
    let path = dir.join("region.json");
    fs::write(&path, serde_json::to_string_pretty(region).expect("serialize")).expect("write");
    path
}

fn procsim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_procsim"))
}

#[test]
fn validate_accepts_valid_region() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(
        temp.path(),
        &sequential("s", task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0])),
    );
    let status = procsim()
        .arg("validate")
        .arg(&path)
        .status()
        .expect("procsim validate");
    assert_eq!(status.code(), Some(exit_codes::OK));
}

#[test]
fn validate_rejects_mismatched_impacts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(
        temp.path(),
        &sequential("s", task("a", 1.0, &[1.0]), task("b", 1.0, &[1.0, 2.0])),
    );
    let output = procsim()
        .arg("validate")
        .arg(&path)
        .output()
        .expect("procsim validate");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid region"), "{stderr}");
}

#[test]
fn compile_writes_net_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(temp.path(), &task("1", 2.0, &[1.0]));
    let out = temp.path().join("net.json");
    let status = procsim()
        .args(["compile", "--name", "single"])
        .arg(&path)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("procsim compile");
    assert_eq!(status.code(), Some(exit_codes::OK));

    let net: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read")).expect("json");
    assert_eq!(net["name"], "single");
    assert_eq!(net["places"].as_array().map(Vec::len), Some(2));
    assert_eq!(net["transitions"].as_array().map(Vec::len), Some(1));
    assert_eq!(net["arcs"].as_array().map(Vec::len), Some(2));
}

#[test]
fn simulate_prints_tree_and_exits_ok_when_complete() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(
        temp.path(),
        &choice(
            "c",
            vec![task("a", 1.0, &[1.0]), task("b", 2.0, &[5.0])],
            None,
        ),
    );
    let output = procsim()
        .arg("simulate")
        .arg(&path)
        .args(["--seed", "1"])
        .output()
        .expect("procsim simulate");
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let tree: Value = serde_json::from_slice(&output.stdout).expect("tree json");
    assert_eq!(tree["root"]["name"], "Root");
    let child = &tree["root"]["children"][0];
    assert_eq!(child["snapshot"]["impacts"][0], 1.0);
    assert_eq!(child["snapshot"]["region_status"]["b"], "will_not_be_executed");
}

/// A step limit below what the loop needs reports an incomplete run.
#[test]
fn simulate_step_limit_exits_incomplete() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(
        temp.path(),
        &loop_region("l", task("a", 1.0, &[1.0]), 0.5, 3),
    );
    let config = temp.path().join("procsim.toml");
    fs::write(&config, "seed = 4\nmax_steps = 1\n").expect("write config");
    let status = procsim()
        .arg("simulate")
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(temp.path().join("tree.json"))
        .status()
        .expect("procsim simulate");
    assert_eq!(status.code(), Some(exit_codes::INCOMPLETE));
}

#[test]
fn simulate_rejects_unknown_choice() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_region(temp.path(), &task("a", 1.0, &[1.0]));
    let output = procsim()
        .arg("simulate")
        .arg(&path)
        .args(["--choices", "t42"])
        .output()
        .expect("procsim simulate");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("t42"));
}

/// `init-config` writes loadable defaults and refuses to overwrite without --force.
#[test]
fn init_config_writes_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("sim.toml");
    let status = procsim()
        .arg("init-config")
        .arg(&path)
        .status()
        .expect("procsim init-config");
    assert_eq!(status.code(), Some(exit_codes::OK));
    let loaded = load_config(&path).expect("load config");
    assert_eq!(loaded, SimulatorConfig::default());

    let output = procsim()
        .arg("init-config")
        .arg(&path)
        .output()
        .expect("procsim init-config");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

    fs::write(&path, "seed = 9\n").expect("write config");
    let status = procsim()
        .args(["init-config", "--force"])
        .arg(&path)
        .status()
        .expect("procsim init-config --force");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("reload"), SimulatorConfig::default());
}
