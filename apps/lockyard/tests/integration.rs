//! Integration tests for lockyard CLI

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn lockyard(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lockyard"))
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--registry")
        .arg(dir.join("resources.json"))
        .args(args)
        .env_remove("LOCKYARD_REGISTRY")
        .env_remove("LOCKYARD_REGISTRY_PATH")
        .env_remove("LOCKYARD_FAIR_SELECTION")
        .env_remove("LOCKYARD_AUTO_CREATE")
        .env_remove("LOCKYARD_QUEUE_PRECEDENCE")
        .output()
        .expect("Failed to execute lockyard")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_lockyard"))
        .arg("--version")
        .output()
        .expect("Failed to execute lockyard");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lockyard"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_lockyard"))
        .arg("--help")
        .output()
        .expect("Failed to execute lockyard");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("lockable resources"));
    assert!(stdout.contains("reserve"));
    assert!(stdout.contains("plan"));
}

#[test]
fn test_reserve_requires_names() {
    let dir = TempDir::new().unwrap();
    let output = lockyard(dir.path(), &["reserve", "--by", "alice"]);
    assert!(!output.status.success());
}

#[test]
fn test_create_and_list() {
    let dir = TempDir::new().unwrap();
    let created = lockyard(dir.path(), &["create", "gpu-1", "-c", "gpu linux"]);
    assert!(created.status.success());
    assert!(dir.path().join("resources.json").exists());

    let listed = json(&lockyard(dir.path(), &["--json", "list"]));
    assert_eq!(listed["kind"], "resources");
    assert_eq!(listed["resources"][0]["name"], "gpu-1");
}

#[test]
fn test_reservation_blocks_lock() {
    let dir = TempDir::new().unwrap();
    assert!(lockyard(dir.path(), &["create", "db"]).status.success());
    assert!(lockyard(dir.path(), &["reserve", "db", "--by", "alice"])
        .status
        .success());

    let blocked = lockyard(dir.path(), &["lock", "--requester", "job#1", "-r", "db"]);
    assert!(!blocked.status.success());
    let stderr = String::from_utf8_lossy(&blocked.stderr);
    assert!(stderr.contains("lock.unsatisfiable"), "{stderr}");

    let reset = json(&lockyard(dir.path(), &["--json", "reset", "db"]));
    assert_eq!(reset["resources"][0], "db");

    let granted = json(&lockyard(
        dir.path(),
        &["--json", "lock", "--requester", "job#1", "-r", "db", "--variable", "DB"],
    ));
    assert_eq!(granted["grant"]["resources"][0], "db");

    let released = json(&lockyard(
        dir.path(),
        &["--json", "unlock", "--requester", "job#1", "db"],
    ));
    assert_eq!(released["resources"][0], "db");
}

#[test]
fn test_plan_and_match() {
    let dir = TempDir::new().unwrap();
    for (name, tags) in [("x", "L1,L2"), ("y", "L1"), ("z", "L2")] {
        assert!(lockyard(dir.path(), &["create", name, "-c", tags])
            .status
            .success());
    }

    let plan = json(&lockyard(
        dir.path(),
        &["--json", "plan", "-c", "L1", "-c", "L2"],
    ));
    assert_eq!(plan["resources"], serde_json::json!(["x", "z"]));

    assert!(lockyard(dir.path(), &["fair", "on"]).status.success());
    let config = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(config.contains("fair_selection = true"));

    let fair = json(&lockyard(
        dir.path(),
        &["--json", "plan", "-c", "L1", "-c", "L2"],
    ));
    assert_eq!(fair["resources"], serde_json::json!(["y", "z"]));

    let matched = json(&lockyard(
        dir.path(),
        &["--json", "match", "$LAYER", "-e", "LAYER=L2"],
    ));
    assert_eq!(matched["free"], 2);
}
