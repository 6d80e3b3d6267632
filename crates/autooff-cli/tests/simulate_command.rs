use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn get_autooff_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("autooff")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/resume_page.json")
}

fn simulate(store: &TempDir) -> Command {
    let mut cmd = Command::new(get_autooff_bin());
    cmd.arg("--store")
        .arg(store.path().join("storage.json"))
        .arg("simulate")
        .arg(fixture())
        .arg("--instant");
    cmd
}

#[test]
fn test_simulate_help() {
    let mut cmd = Command::new(get_autooff_bin());
    cmd.arg("simulate").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("JSON fixture"))
        .stdout(predicate::str::contains("--instant"))
        .stdout(predicate::str::contains("--max-passes"));
}

#[test]
fn test_simulate_switches_everything_off() {
    let store = TempDir::new().unwrap();

    simulate(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-OFF complete! 8 items switched off"))
        .stdout(predicate::str::contains("skills: 2/2 changed"))
        .stdout(predicate::str::contains("position-type: 1/1 changed"))
        .stdout(predicate::str::contains("software-tools: 1/1 changed"))
        .stdout(predicate::str::contains("Performance:"))
        .stdout(predicate::str::contains("changed=8"))
        .stdout(predicate::str::contains("failed=0"));
}

#[test]
fn test_simulate_json_report() {
    let store = TempDir::new().unwrap();

    let output = simulate(&store).arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["cancelled"], false);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 8);
    assert!(outcomes.iter().all(|o| o["after"] == "off" && o["ok"] == true));
    assert!(
        outcomes
            .iter()
            .all(|o| o["label"] != "Contract" && o["label"] != "COBOL")
    );
}

#[test]
fn test_simulate_respects_excluded_sections() {
    let store = TempDir::new().unwrap();
    let storage = store.path().join("storage.json");

    Command::new(get_autooff_bin())
        .arg("--store")
        .arg(&storage)
        .args(["settings", "exclude", "skills"])
        .assert()
        .success();

    simulate(&store)
        .arg("--format")
        .arg("table")
        .assert()
        .success()
        .stdout(predicate::str::contains("Section,Label,Before,After,Changed,Method,Ok"))
        .stdout(predicate::str::contains("skills,").not())
        .stdout(predicate::str::contains("projects,Alpha,on,off,true,click,true"));
}

#[test]
fn test_simulate_updates_usage_counters() {
    let store = TempDir::new().unwrap();
    simulate(&store).assert().success();

    let output = Command::new(get_autooff_bin())
        .arg("--store")
        .arg(store.path().join("storage.json"))
        .args(["status", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["stats"]["usage_count"], 1);
    assert_eq!(status["stats"]["total_operations"], 1);
    assert_eq!(status["stats"]["checkboxes_processed"], 8);
    assert_eq!(status["stats"]["last_performance"]["checkboxes_processed"], 8);
}

#[test]
fn test_simulate_missing_fixture() {
    let store = TempDir::new().unwrap();

    Command::new(get_autooff_bin())
        .arg("--store")
        .arg(store.path().join("storage.json"))
        .args(["simulate", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load page fixture"));
}
