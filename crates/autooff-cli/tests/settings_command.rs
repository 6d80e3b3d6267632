use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn get_autooff_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("autooff")
}

fn autooff(storage: &Path) -> Command {
    let mut cmd = Command::new(get_autooff_bin());
    cmd.arg("--store").arg(storage);
    cmd
}

fn settings_json(storage: &Path) -> Value {
    let output = autooff(storage)
        .args(["settings", "show", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_settings_help() {
    let mut cmd = Command::new(get_autooff_bin());
    cmd.arg("settings").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("preserve"))
        .stdout(predicate::str::contains("exclude"))
        .stdout(predicate::str::contains("add-section"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_settings_show_defaults() {
    let dir = TempDir::new().unwrap();
    let storage = dir.path().join("storage.json");

    autooff(&storage)
        .args(["settings", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-OFF Settings"))
        .stdout(predicate::str::contains("Preserved:          (none)"))
        .stdout(predicate::str::contains("software-tools"));

    let settings = settings_json(&storage);
    assert_eq!(settings["auto_save"], true);
    assert_eq!(settings["theme"], "auto");
    assert_eq!(settings["language"], "en");
}

#[test]
fn test_settings_changes_are_persisted() {
    let dir = TempDir::new().unwrap();
    let storage = dir.path().join("storage.json");

    autooff(&storage)
        .args(["settings", "preserve", "skill-rust", "skill-go"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Preserving 2 more element(s)"));
    autooff(&storage)
        .args(["settings", "exclude", "projects"])
        .assert()
        .success();
    autooff(&storage)
        .args(["settings", "add-section", "volunteering"])
        .assert()
        .success();
    autooff(&storage)
        .args(["settings", "unpreserve", "skill-go"])
        .assert()
        .success();

    let settings = settings_json(&storage);
    assert_eq!(settings["preserve_selected"], serde_json::json!(["skill-rust"]));
    assert_eq!(settings["exclude_sections"], serde_json::json!(["projects"]));
    assert_eq!(settings["custom_sections"], serde_json::json!(["volunteering"]));

    autooff(&storage)
        .args(["settings", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings reset to defaults"));
    let settings = settings_json(&storage);
    assert_eq!(settings["preserve_selected"], serde_json::json!([]));
}

#[test]
fn test_settings_preserve_requires_ids() {
    let dir = TempDir::new().unwrap();

    autooff(&dir.path().join("storage.json"))
        .args(["settings", "preserve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_store_from_environment() {
    let dir = TempDir::new().unwrap();
    let storage = dir.path().join("env-storage.json");

    Command::new(get_autooff_bin())
        .env("AUTOOFF_STORE", &storage)
        .args(["settings", "exclude", "skills"])
        .assert()
        .success();

    assert!(storage.exists());
    let content: Value = serde_json::from_str(&std::fs::read_to_string(&storage).unwrap()).unwrap();
    assert_eq!(content["settings"]["exclude_sections"], serde_json::json!(["skills"]));
}

#[test]
fn test_unreadable_settings_are_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let storage = dir.path().join("storage.json");
    let original = r#"{"license_key":"TEAL_PREMIUM_2025","settings":{"theme":5}}"#;
    std::fs::write(&storage, original).unwrap();

    autooff(&storage)
        .args(["settings", "exclude", "skills"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read stored settings"));

    assert_eq!(std::fs::read_to_string(&storage).unwrap(), original);
}
