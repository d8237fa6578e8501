//! CLI integration tests running the animtree-rs binary against the demo scenes

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn animtree() -> Command {
    Command::cargo_bin("animtree-rs").unwrap()
}

fn simulate_json(scene: &str, frames: usize) -> Vec<Value> {
    let output = animtree()
        .arg("simulate")
        .arg(demo(scene))
        .args(["--frames", &frames.to_string(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reports: Value = serde_json::from_slice(&output.stdout).unwrap();
    reports.as_array().unwrap().clone()
}

fn vec3(value: &Value) -> [f64; 3] {
    let items = value.as_array().unwrap();
    [
        items[0].as_f64().unwrap(),
        items[1].as_f64().unwrap(),
        items[2].as_f64().unwrap(),
    ]
}

#[test]
fn test_inspect_shows_hierarchy() {
    animtree()
        .arg("inspect")
        .arg(demo("locomotion.yaml"))
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Root bone: root"))
        .stdout(predicate::str::contains("upper_body"))
        .stdout(predicate::str::contains("locomotion"))
        .stdout(predicate::str::contains("-> move"))
        .stdout(predicate::str::contains("idle *"));
}

#[test]
fn test_inspect_lists_bones() {
    animtree()
        .arg("inspect")
        .arg(demo("locomotion.yaml"))
        .args(["--no-color", "--bones", "--depth", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bones: 4"))
        .stdout(predicate::str::contains("hips:"))
        .stdout(predicate::str::contains("-> move").not());
}

#[test]
fn test_simulate_locomotion_json() {
    let reports = simulate_json("locomotion.yaml", 40);
    assert_eq!(reports.len(), 40);

    let events = reports[5]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].as_str().unwrap().starts_with("travel locomotion -> move"));

    let mut total_z = 0.0;
    for report in &reports {
        assert!(report["error"].is_null());
        // root motion is taken out of the root bone, so it stays in place
        let root = vec3(&report["root_translation"]);
        assert!(root.iter().all(|c| c.abs() < 1.0e-3), "frame {}: {root:?}", report["frame"]);
        total_z += vec3(&report["motion"])[2];
    }
    assert!(total_z > 1.0, "moved only {total_z}");

    let last = &reports[39]["machines"][0];
    assert_eq!(last["name"], "locomotion");
    assert_eq!(last["active"], "move");
}

#[test]
fn test_simulate_switch_json() {
    let reports = simulate_json("switch.json", 6);
    assert_eq!(reports[2]["events"][0], "switch look -> input 1");
    assert!(reports.iter().all(|r| r["error"].is_null()));
    // no root bone configured
    assert!(reports[0]["root_translation"].is_null());
}

#[test]
fn test_simulate_reports_transition_cycle() {
    animtree()
        .arg("simulate")
        .arg(demo("cycle.yaml"))
        .args(["--frames", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transition cycle detected"))
        .stdout(predicate::str::contains("3 frame(s) failed"));
}

#[test]
fn test_simulate_rejects_negative_frame_time() {
    animtree()
        .arg("simulate")
        .arg(demo("switch.json"))
        .args(["--dt=-0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-negative"));
}

#[test]
fn test_missing_scene() {
    animtree()
        .args(["inspect", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scene"));
}

#[test]
fn test_unsupported_scene_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("scene.toml");
    fs::write(&path, "root = \"idle\"\n").unwrap();

    animtree()
        .arg("inspect")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported scene format"));
}

#[test]
fn test_build_errors_name_the_scene() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.yaml");
    fs::write(
        &path,
        "skeleton:\n  bones:\n    - name: root\nnodes:\n  - name: a\n    type: clip\n    clip: missing\nroot: a\n",
    )
    .unwrap();

    animtree()
        .arg("inspect")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to build scene"));
}

#[test]
fn test_completions() {
    animtree()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("animtree-rs"));
}
